//! # Dependency Injection Abstractions
//!
//! bean 工厂的抽象层，定义元数据模型和扩展接口。
//!
//! ## 核心接口
//!
//! - [`BeanDefinition`] / [`RootBeanDefinition`] - bean 定义与合并定义
//! - [`ClassDescriptor`] / [`ClassBuilder`] - 显式声明的类型能力
//! - [`BeanFactory`] 及其扩展 - 获取、枚举、配置、自动装配
//! - [`BeanPostProcessor`] / [`BeanFactoryPostProcessor`] - 扩展点
//! - [`Scope`] / [`InstantiationStrategy`] / [`TypeConverter`] - 可插拔协作者

pub mod class;
pub mod definition;
pub mod descriptor;
pub mod factory;
pub mod instantiation;
pub mod merged;
pub mod processor;
pub mod registry;
pub mod resolver;
pub mod scope;

pub use class::*;
pub use definition::*;
pub use descriptor::*;
pub use factory::*;
pub use instantiation::*;
pub use merged::*;
pub use processor::*;
pub use registry::*;
pub use resolver::*;
pub use scope::*;
