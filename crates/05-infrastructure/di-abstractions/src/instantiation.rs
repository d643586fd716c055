//! 实例化策略

use crate::class::{Args, ConstructorDescriptor, FactoryMethodDescriptor};
use crate::factory::BeanFactory;
use crate::merged::RootBeanDefinition;
use infrastructure_common::{BeanObject, BeanResult};
use std::sync::Arc;

/// 实例化策略
///
/// `owner` 是发起创建的工厂，方法注入需要用它在之后的调用中取得 bean。
pub trait InstantiationStrategy: Send + Sync {
    /// 使用无参构造器实例化
    fn instantiate(
        &self,
        definition: &RootBeanDefinition,
        name: &str,
        owner: &Arc<dyn BeanFactory>,
    ) -> BeanResult<BeanObject>;

    /// 使用指定构造器实例化
    fn instantiate_with_constructor(
        &self,
        definition: &RootBeanDefinition,
        name: &str,
        owner: &Arc<dyn BeanFactory>,
        constructor: &ConstructorDescriptor,
        args: &Args,
    ) -> BeanResult<BeanObject>;

    /// 使用工厂方法实例化
    fn instantiate_with_factory_method(
        &self,
        definition: &RootBeanDefinition,
        name: &str,
        owner: &Arc<dyn BeanFactory>,
        factory_bean: Option<&BeanObject>,
        method: &FactoryMethodDescriptor,
        args: &Args,
    ) -> BeanResult<BeanObject>;
}
