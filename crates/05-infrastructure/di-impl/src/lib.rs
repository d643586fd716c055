//! # bean 工厂实现
//!
//! 提供 [`DefaultListableBeanFactory`] 及其协作者：
//!
//! - [`DefaultSingletonBeanRegistry`] - 三级单例缓存、依赖关系与销毁顺序
//! - [`DefaultBeanDefinitionRegistry`] - 定义、别名与合并定义缓存
//! - [`SimpleTypeConverter`] / [`BeanWrapper`] - 字符串转换与属性写入
//! - [`SimpleInstantiationStrategy`] / [`MethodInjectingInstantiationStrategy`] - 实例化策略
//! - [`PlaceholderConfigurer`] / [`ContextScope`] / [`ListenerBeanDetector`] - 内置扩展
//! - [`BeanFactoryConfig`] - 从配置文件和环境变量加载的工厂配置
//!
//! ```ignore
//! let classes = Arc::new(DefaultClassRegistry::new());
//! let factory = DefaultListableBeanFactory::new(classes);
//! factory.register_bean_definition("svc", BeanDefinition::for_class(svc_class))?;
//! factory.refresh(&[])?;
//! let svc = factory.get_typed::<Service>("svc")?;
//! factory.shutdown();
//! ```

pub mod class_registry;
pub mod config;
pub mod converter;
pub mod definition_registry;
pub mod factory;
pub mod instantiation;
pub mod placeholder;
pub mod post_processors;
pub mod scope;
pub mod singleton_registry;
pub mod wrapper;

mod autowire;
mod constructor_resolver;
mod creation;
mod disposable;
mod value_resolver;

pub use class_registry::DefaultClassRegistry;
pub use config::{BeanFactoryConfig, WrappedReferencePolicy};
pub use converter::SimpleTypeConverter;
pub use definition_registry::DefaultBeanDefinitionRegistry;
pub use factory::DefaultListableBeanFactory;
pub use instantiation::{MethodInjectingInstantiationStrategy, SimpleInstantiationStrategy};
pub use placeholder::{PlaceholderConfigurer, PlaceholderResolver};
pub use post_processors::{invoke_bean_factory_post_processors, register_bean_post_processors, ListenerBeanDetector};
pub use scope::ContextScope;
pub use singleton_registry::{DefaultSingletonBeanRegistry, SingletonFactory};
pub use wrapper::BeanWrapper;
