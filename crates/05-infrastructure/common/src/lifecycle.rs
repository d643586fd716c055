//! 组件生命周期回调

/// 标准作用域名称：单例
pub const SCOPE_SINGLETON: &str = "singleton";

/// 标准作用域名称：原型
pub const SCOPE_PROTOTYPE: &str = "prototype";

/// 默认作用域（空字符串视为单例）
pub const SCOPE_DEFAULT: &str = "";

/// 属性填充完成后需要执行初始化逻辑的组件
pub trait InitializingBean: Send + Sync {
    /// 所有属性设置完成后调用
    fn after_properties_set(&self) -> anyhow::Result<()>;
}

/// 销毁时需要释放资源的组件
pub trait DisposableBean: Send + Sync {
    /// 容器销毁组件时调用
    fn destroy(&self) -> anyhow::Result<()>;
}

/// 需要知道自身 bean 名称的组件
pub trait BeanNameAware: Send + Sync {
    /// 注入 bean 名称
    fn set_bean_name(&self, name: &str);
}

/// 所有非懒加载单例创建完成后需要回调的组件
pub trait SmartInitializingSingleton: Send + Sync {
    /// 预实例化阶段结束时调用
    fn after_singletons_instantiated(&self) -> anyhow::Result<()>;
}

/// 组件生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// 已请求，尚未开始
    #[default]
    Requested,
    /// 类已解析
    ClassResolved,
    /// 已实例化
    Instantiated,
    /// 属性已填充
    Populated,
    /// 已初始化
    Initialized,
    /// 可用
    Ready,
    /// 已销毁
    Destroyed,
}
