//! bean 工厂配置
//!
//! 默认从 `config/beans.*`（可选）加载，再叠加 `BEANS_` 前缀的环境变量，
//! 例如 `BEANS_ALLOW_CIRCULAR_REFERENCES=false`。

use infrastructure_common::{ConfigError, ConfigResult, DEFAULT_SUPPRESSED_EXCEPTIONS_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error};

/// 早期引用与最终实例不一致时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrappedReferencePolicy {
    /// 任何已拿到原始早期引用的 bean 都会导致错误
    Strict,
    /// 忽略只为类型检查而创建过的依赖方
    #[default]
    IgnoreTypeCheckOnly,
    /// 不检查，允许依赖方持有原始实例
    Tolerate,
}

/// bean 工厂配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeanFactoryConfig {
    /// 是否允许同名定义覆盖
    pub allow_bean_definition_overriding: bool,
    /// 是否允许通过早期引用解决单例循环引用
    pub allow_circular_references: bool,
    /// 早期引用被包装时的处理策略
    pub wrapped_reference_policy: WrappedReferencePolicy,
    /// 构造器歧义（同参数个数、同权重）时是否取第一个
    pub lenient_constructor_resolution: bool,
    /// 是否缓存合并定义与类型匹配结果
    pub cache_bean_metadata: bool,
    /// 单次创建过程最多保留的被抑制错误数
    pub suppressed_exceptions_limit: usize,
}

impl Default for BeanFactoryConfig {
    fn default() -> Self {
        Self {
            allow_bean_definition_overriding: true,
            allow_circular_references: true,
            wrapped_reference_policy: WrappedReferencePolicy::default(),
            lenient_constructor_resolution: true,
            cache_bean_metadata: true,
            suppressed_exceptions_limit: DEFAULT_SUPPRESSED_EXCEPTIONS_LIMIT,
        }
    }
}

impl BeanFactoryConfig {
    /// 从默认位置加载
    pub fn load() -> ConfigResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/beans").required(false))
            .add_source(
                config::Environment::with_prefix("BEANS")
                    .prefix_separator("_")
                    .try_parsing(true),
            );
        Self::build(builder)
    }

    /// 从指定文件加载，环境变量仍然生效
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let builder = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("BEANS")
                    .prefix_separator("_")
                    .try_parsing(true),
            );
        Self::build(builder)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> ConfigResult<Self> {
        let settings = builder.build().map_err(|e| {
            error!("bean 工厂配置构建失败: {}", e);
            ConfigError::ParseError { source: Box::new(e) }
        })?;
        let loaded: Self = settings.try_deserialize().map_err(|e| {
            error!("bean 工厂配置绑定失败: {}", e);
            ConfigError::ParseError { source: Box::new(e) }
        })?;
        loaded.validate()?;
        debug!("bean 工厂配置加载成功: {:?}", loaded);
        Ok(loaded)
    }

    /// 校验配置取值
    pub fn validate(&self) -> ConfigResult<()> {
        if self.suppressed_exceptions_limit == 0 {
            return Err(ConfigError::ValidationError {
                message: "suppressed_exceptions_limit 必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    /// 设置是否允许覆盖定义
    pub fn with_allow_bean_definition_overriding(mut self, allow: bool) -> Self {
        self.allow_bean_definition_overriding = allow;
        self
    }

    /// 设置是否允许循环引用
    pub fn with_allow_circular_references(mut self, allow: bool) -> Self {
        self.allow_circular_references = allow;
        self
    }

    /// 设置早期引用被包装时的处理策略
    pub fn with_wrapped_reference_policy(mut self, policy: WrappedReferencePolicy) -> Self {
        self.wrapped_reference_policy = policy;
        self
    }

    /// 设置构造器歧义时是否宽松处理
    pub fn with_lenient_constructor_resolution(mut self, lenient: bool) -> Self {
        self.lenient_constructor_resolution = lenient;
        self
    }

    /// 设置是否缓存合并定义
    pub fn with_cache_bean_metadata(mut self, cache: bool) -> Self {
        self.cache_bean_metadata = cache;
        self
    }
}
