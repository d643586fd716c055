//! 实例化策略
//!
//! [`SimpleInstantiationStrategy`] 直接调用构造器或工厂方法；
//! [`MethodInjectingInstantiationStrategy`] 在此基础上为查找方法绑定对象获取函数。

use di_abstractions::{
    Args, BeanFactory, ConstructorDescriptor, FactoryMethodDescriptor, InstantiationStrategy,
    MethodOverride, ObjectLookup, RootBeanDefinition,
};
use infrastructure_common::{BeanError, BeanObject, BeanResult};
use std::sync::Arc;
use tracing::trace;

/// 不支持方法注入的实例化策略
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleInstantiationStrategy;

impl SimpleInstantiationStrategy {
    fn reject_method_overrides(definition: &RootBeanDefinition, name: &str) -> BeanResult<()> {
        if definition.has_method_overrides() {
            return Err(BeanError::DefinitionValidation {
                name: name.to_string(),
                message: "当前实例化策略不支持方法注入".to_string(),
            });
        }
        Ok(())
    }

    fn construct(
        definition: &RootBeanDefinition,
        name: &str,
        constructor: &ConstructorDescriptor,
        args: &Args,
    ) -> BeanResult<BeanObject> {
        let class_name = definition
            .resolved_class()
            .map(|c| c.name().to_string())
            .unwrap_or_default();
        constructor.invoke(args).map_err(|e| {
            BeanError::creation_caused_by(name, format!("类 [{}] 的构造器调用失败", class_name), e)
        })
    }

    fn default_construct(definition: &RootBeanDefinition, name: &str) -> BeanResult<BeanObject> {
        let class = definition.resolved_class().ok_or_else(|| BeanError::DefinitionStore {
            name: name.to_string(),
            message: "定义没有可实例化的类".to_string(),
        })?;
        let (_, constructor) = class.default_constructor().ok_or_else(|| {
            BeanError::creation(name, format!("类 [{}] 没有无参构造器", class.name()))
        })?;
        Self::construct(definition, name, constructor, &Args::default())
    }
}

impl InstantiationStrategy for SimpleInstantiationStrategy {
    fn instantiate(
        &self,
        definition: &RootBeanDefinition,
        name: &str,
        _owner: &Arc<dyn BeanFactory>,
    ) -> BeanResult<BeanObject> {
        Self::reject_method_overrides(definition, name)?;
        Self::default_construct(definition, name)
    }

    fn instantiate_with_constructor(
        &self,
        definition: &RootBeanDefinition,
        name: &str,
        _owner: &Arc<dyn BeanFactory>,
        constructor: &ConstructorDescriptor,
        args: &Args,
    ) -> BeanResult<BeanObject> {
        Self::reject_method_overrides(definition, name)?;
        Self::construct(definition, name, constructor, args)
    }

    fn instantiate_with_factory_method(
        &self,
        _definition: &RootBeanDefinition,
        name: &str,
        _owner: &Arc<dyn BeanFactory>,
        factory_bean: Option<&BeanObject>,
        method: &FactoryMethodDescriptor,
        args: &Args,
    ) -> BeanResult<BeanObject> {
        method.invoke(factory_bean, args).map_err(|e| {
            BeanError::creation_caused_by(name, format!("工厂方法 '{}' 调用失败", method.name), e)
        })
    }
}

/// 支持查找方法注入的实例化策略（默认）
#[derive(Debug, Default, Clone, Copy)]
pub struct MethodInjectingInstantiationStrategy;

impl MethodInjectingInstantiationStrategy {
    fn bind_lookup_methods(
        definition: &RootBeanDefinition,
        name: &str,
        instance: &BeanObject,
        owner: &Arc<dyn BeanFactory>,
    ) -> BeanResult<()> {
        let class = definition.resolved_class().ok_or_else(|| BeanError::DefinitionStore {
            name: name.to_string(),
            message: "方法注入需要已解析的类".to_string(),
        })?;

        for method_override in &definition.definition().method_overrides {
            let MethodOverride::Lookup { method, bean } = method_override;
            let descriptor = class.lookup_method(method).ok_or_else(|| BeanError::DefinitionValidation {
                name: name.to_string(),
                message: format!("类 [{}] 上不存在名为 '{}' 的查找方法", class.name(), method),
            })?;

            let factory = Arc::downgrade(owner);
            let target = bean.clone();
            let return_type = descriptor.return_type;
            let lookup: ObjectLookup = Arc::new(move || {
                let factory = factory
                    .upgrade()
                    .ok_or_else(|| BeanError::illegal_state("bean 工厂已经释放"))?;
                match &target {
                    Some(bean) => factory.get_bean_of_type(bean, return_type),
                    None => factory.resolve_bean(return_type),
                }
            });
            descriptor.bind(instance, lookup).map_err(|e| {
                BeanError::creation_caused_by(name, format!("绑定查找方法 '{}' 失败", method), e)
            })?;
            trace!("为 bean '{}' 绑定查找方法 '{}'", name, method);
        }
        Ok(())
    }
}

impl InstantiationStrategy for MethodInjectingInstantiationStrategy {
    fn instantiate(
        &self,
        definition: &RootBeanDefinition,
        name: &str,
        owner: &Arc<dyn BeanFactory>,
    ) -> BeanResult<BeanObject> {
        let instance = SimpleInstantiationStrategy::default_construct(definition, name)?;
        Self::bind_lookup_methods(definition, name, &instance, owner)?;
        Ok(instance)
    }

    fn instantiate_with_constructor(
        &self,
        definition: &RootBeanDefinition,
        name: &str,
        owner: &Arc<dyn BeanFactory>,
        constructor: &ConstructorDescriptor,
        args: &Args,
    ) -> BeanResult<BeanObject> {
        let instance = SimpleInstantiationStrategy::construct(definition, name, constructor, args)?;
        Self::bind_lookup_methods(definition, name, &instance, owner)?;
        Ok(instance)
    }

    fn instantiate_with_factory_method(
        &self,
        definition: &RootBeanDefinition,
        name: &str,
        owner: &Arc<dyn BeanFactory>,
        factory_bean: Option<&BeanObject>,
        method: &FactoryMethodDescriptor,
        args: &Args,
    ) -> BeanResult<BeanObject> {
        SimpleInstantiationStrategy.instantiate_with_factory_method(
            definition,
            name,
            owner,
            factory_bean,
            method,
            args,
        )
    }
}
