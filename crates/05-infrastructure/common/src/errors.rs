//! 错误类型定义

use std::error::Error as StdError;
use thiserror::Error;

/// 装箱的错误源类型
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// 单次顶层创建过程中最多记录的被抑制错误数量
pub const DEFAULT_SUPPRESSED_EXCEPTIONS_LIMIT: usize = 100;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError {
        #[source]
        source: BoxError,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },

    #[error("配置键不存在: {key}")]
    KeyNotFound { key: String },
}

/// Bean 工厂错误类型
///
/// 引擎内部产生的所有错误都归入此枚举。用户回调（构造器、init 方法等）
/// 返回的错误在边界处被包装为 [`BeanError::Creation`]，其原始错误保存在
/// `source` 中。
#[derive(Error, Debug)]
pub enum BeanError {
    #[error("没有名为 '{name}' 的 bean 定义")]
    NoSuchBeanDefinition { name: String },

    #[error("没有类型为 [{required_type}] 的可用 bean: {message}")]
    NoSuchBeanOfType {
        required_type: String,
        message: String,
    },

    #[error("类型 [{required_type}] 没有唯一的 bean: 期望单个匹配, 但找到 {}: {}", .candidates.len(), .candidates.join(", "))]
    NoUniqueBean {
        required_type: String,
        candidates: Vec<String>,
        message: Option<String>,
    },

    #[error("bean 定义校验失败 '{name}': {message}")]
    DefinitionValidation { name: String, message: String },

    #[error("bean 定义存储错误 '{name}': {message}")]
    DefinitionStore { name: String, message: String },

    #[error("不允许覆盖 bean 定义 '{name}': 已存在 [{existing}]")]
    DefinitionOverride { name: String, existing: String },

    #[error("bean 定义 '{name}' 是抽象的, 不能实例化")]
    BeanIsAbstract { name: String },

    #[error("创建名为 '{name}' 的 bean 失败: {message}")]
    Creation {
        name: String,
        message: String,
        #[source]
        source: Option<BoxError>,
        related_causes: Vec<BeanError>,
    },

    #[error("创建名为 '{bean}' 的 bean 失败: 通过 {injection_point} 表达的依赖未满足: {message}")]
    UnsatisfiedDependency {
        bean: String,
        injection_point: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("名为 '{name}' 的 bean 当前正在创建中: {message}")]
    CurrentlyInCreation { name: String, message: String },

    #[error("不允许创建名为 '{name}' 的 bean: {message}")]
    CreationNotAllowed { name: String, message: String },

    #[error("名为 '{name}' 的单例已在其他位置隐式产生")]
    ImplicitlyAppearedSingleton { name: String },

    #[error("名为 '{name}' 的 bean 期望类型为 [{required_type}], 实际类型为 [{actual_type}]")]
    BeanNotOfRequiredType {
        name: String,
        required_type: String,
        actual_type: String,
    },

    #[error("无法将值 '{value}' 转换为类型 [{required_type}]: {message}")]
    Conversion {
        value: String,
        required_type: String,
        message: String,
    },

    #[error("类 [{class}] 的属性 '{property}' 无效: {message}")]
    InvalidProperty {
        class: String,
        property: String,
        message: String,
    },

    #[error("作用域 '{scope}' 当前未激活")]
    ScopeNotActive { scope: String },

    #[error("非法状态: {message}")]
    IllegalState { message: String },
}

impl BeanError {
    /// 创建 bean 创建失败错误
    pub fn creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Creation {
            name: name.into(),
            message: message.into(),
            source: None,
            related_causes: Vec::new(),
        }
    }

    /// 创建带原因的 bean 创建失败错误
    pub fn creation_caused_by(
        name: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Creation {
            name: name.into(),
            message: message.into(),
            source: Some(source.into()),
            related_causes: Vec::new(),
        }
    }

    /// 创建“当前正在创建”错误
    pub fn currently_in_creation(name: impl Into<String>) -> Self {
        Self::CurrentlyInCreation {
            name: name.into(),
            message: "请求的 bean 当前正在创建中: 是否存在无法解析的循环引用?".to_string(),
        }
    }

    /// 创建非法状态错误
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    /// 创建依赖未满足错误
    pub fn unsatisfied(
        bean: impl Into<String>,
        injection_point: impl Into<String>,
        cause: BeanError,
    ) -> Self {
        Self::UnsatisfiedDependency {
            bean: bean.into(),
            injection_point: injection_point.into(),
            message: cause.to_string(),
            source: Some(Box::new(cause)),
        }
    }

    /// 错误所关联的 bean 名称（如果有）
    pub fn bean_name(&self) -> Option<&str> {
        match self {
            Self::NoSuchBeanDefinition { name }
            | Self::DefinitionValidation { name, .. }
            | Self::DefinitionStore { name, .. }
            | Self::DefinitionOverride { name, .. }
            | Self::BeanIsAbstract { name }
            | Self::Creation { name, .. }
            | Self::CurrentlyInCreation { name, .. }
            | Self::CreationNotAllowed { name, .. }
            | Self::ImplicitlyAppearedSingleton { name }
            | Self::BeanNotOfRequiredType { name, .. } => Some(name),
            Self::UnsatisfiedDependency { bean, .. } => Some(bean),
            _ => None,
        }
    }

    /// 是否为创建阶段的已分类错误，这类错误在管道中原样透传
    pub fn is_pass_through(&self) -> bool {
        matches!(
            self,
            Self::Creation { .. }
                | Self::UnsatisfiedDependency { .. }
                | Self::CurrentlyInCreation { .. }
                | Self::CreationNotAllowed { .. }
                | Self::ImplicitlyAppearedSingleton { .. }
        )
    }

    /// 附加被抑制的相关错误（仅对 Creation 生效），数量受 `limit` 限制
    pub fn with_related_causes(mut self, causes: Vec<BeanError>, limit: usize) -> Self {
        if let Self::Creation { related_causes, .. } = &mut self {
            let room = limit.saturating_sub(related_causes.len());
            related_causes.extend(causes.into_iter().take(room));
        }
        self
    }

    /// 被抑制的相关错误
    pub fn related_causes(&self) -> &[BeanError] {
        match self {
            Self::Creation { related_causes, .. } => related_causes,
            _ => &[],
        }
    }

    /// 沿 source 链遍历所有嵌套的 `BeanError`（包括自身）
    pub fn causes(&self) -> impl Iterator<Item = &BeanError> {
        let mut next: Option<&BeanError> = Some(self);
        std::iter::from_fn(move || {
            let current = next?;
            next = current.nested();
            Some(current)
        })
    }

    /// 最深层的 `BeanError`
    pub fn root_cause(&self) -> &BeanError {
        self.causes().last().unwrap_or(self)
    }

    /// 链上是否存在满足条件的错误
    pub fn any_cause(&self, predicate: impl Fn(&BeanError) -> bool) -> bool {
        self.causes().any(predicate)
    }

    fn nested(&self) -> Option<&BeanError> {
        let mut source = StdError::source(self);
        while let Some(err) = source {
            if let Some(bean_error) = err.downcast_ref::<BeanError>() {
                return Some(bean_error);
            }
            source = err.source();
        }
        None
    }
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
/// bean 工厂操作的结果
pub type BeanResult<T> = Result<T, BeanError>;
