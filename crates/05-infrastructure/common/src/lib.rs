//! # Infrastructure Common
//!
//! 这个 crate 提供了 bean 工厂各层共享的基础类型。
//!
//! ## 核心内容
//!
//! - [`BeanError`] - 引擎错误分类
//! - [`TypeKey`] - 按类型匹配的类型标识
//! - [`Precedence`] - 后置处理器与候选 bean 的排序约定
//! - [`InitializingBean`] / [`DisposableBean`] - 生命周期回调
//!
//! ## 设计原则
//!
//! - 引擎错误使用 `thiserror` 分类，用户回调错误使用 `anyhow`
//! - 没有全局状态，所有注册表都通过引用传递

pub mod errors;
pub mod lifecycle;
pub mod metadata;
pub mod ordering;

pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
pub use ordering::*;

/// bean 实例的类型擦除表示
pub type BeanObject = std::sync::Arc<dyn std::any::Any + Send + Sync>;
