//! 后置处理器扩展点
//!
//! 实例级处理器只有一个基础 trait [`BeanPostProcessor`]，其余能力
//! （实例化感知、早期引用、合并定义、销毁感知）通过 `as_*` 查询方法暴露，
//! 工厂按能力分组缓存。元数据级处理器 [`BeanFactoryPostProcessor`] 在任何实例
//! 创建之前运行。

use crate::class::ClassDescriptor;
use crate::definition::PropertyValues;
use crate::factory::ConfigurableListableBeanFactory;
use crate::merged::RootBeanDefinition;
use crate::registry::BeanDefinitionRegistry;
use infrastructure_common::{BeanObject, BeanResult, Precedence};
use std::sync::Arc;

/// 实例后置处理器
pub trait BeanPostProcessor: Send + Sync {
    /// 初始化回调之前调用，返回值替换当前实例
    fn post_process_before_initialization(&self, bean: BeanObject, _name: &str) -> BeanResult<BeanObject> {
        Ok(bean)
    }

    /// 初始化回调之后调用，可返回代理
    fn post_process_after_initialization(&self, bean: BeanObject, _name: &str) -> BeanResult<BeanObject> {
        Ok(bean)
    }

    /// 执行顺序
    fn precedence(&self) -> Precedence {
        Precedence::Unordered
    }

    /// 结构性处理器总是排在最后
    fn is_internal(&self) -> bool {
        false
    }

    /// 实例化感知能力
    fn as_instantiation_aware(&self) -> Option<&dyn InstantiationAwareBeanPostProcessor> {
        None
    }

    /// 智能实例化感知能力
    fn as_smart_instantiation_aware(&self) -> Option<&dyn SmartInstantiationAwareBeanPostProcessor> {
        None
    }

    /// 合并定义后置处理能力
    fn as_merged_definition(&self) -> Option<&dyn MergedBeanDefinitionPostProcessor> {
        None
    }

    /// 销毁感知能力
    fn as_destruction_aware(&self) -> Option<&dyn DestructionAwareBeanPostProcessor> {
        None
    }
}

/// 实例化感知处理器
pub trait InstantiationAwareBeanPostProcessor: Send + Sync {
    /// 实例化之前调用；返回 `Some` 时跳过默认创建流程
    fn post_process_before_instantiation(
        &self,
        _class: &Arc<ClassDescriptor>,
        _name: &str,
    ) -> BeanResult<Option<BeanObject>> {
        Ok(None)
    }

    /// 实例化之后、属性填充之前调用；返回 `false` 时跳过属性填充
    fn post_process_after_instantiation(&self, _bean: &BeanObject, _name: &str) -> BeanResult<bool> {
        Ok(true)
    }

    /// 在属性值应用之前修改属性值
    fn post_process_properties(
        &self,
        values: PropertyValues,
        _bean: &BeanObject,
        _name: &str,
    ) -> BeanResult<PropertyValues> {
        Ok(values)
    }
}

/// 可以预测类型、选择构造器、提供早期引用的处理器
pub trait SmartInstantiationAwareBeanPostProcessor: Send + Sync {
    /// 预测最终的 bean 类型
    fn predict_bean_type(
        &self,
        _class: Option<&Arc<ClassDescriptor>>,
        _name: &str,
    ) -> BeanResult<Option<Arc<ClassDescriptor>>> {
        Ok(None)
    }

    /// 候选构造器（类描述符中的下标）
    fn determine_candidate_constructors(
        &self,
        _class: &Arc<ClassDescriptor>,
        _name: &str,
    ) -> BeanResult<Option<Vec<usize>>> {
        Ok(None)
    }

    /// 循环引用时暴露给其他 bean 的早期引用
    fn get_early_bean_reference(&self, bean: BeanObject, _name: &str) -> BeanResult<BeanObject> {
        Ok(bean)
    }
}

/// 合并定义处理器
pub trait MergedBeanDefinitionPostProcessor: Send + Sync {
    /// 每个合并定义只调用一次
    fn post_process_merged_bean_definition(
        &self,
        definition: &RootBeanDefinition,
        class: &Arc<ClassDescriptor>,
        name: &str,
    ) -> BeanResult<()>;

    /// 定义被重置时通知
    fn reset_bean_definition(&self, _name: &str) {}
}

/// 销毁感知处理器
pub trait DestructionAwareBeanPostProcessor: Send + Sync {
    /// 销毁前回调
    fn post_process_before_destruction(&self, bean: &BeanObject, name: &str) -> BeanResult<()>;

    /// 该实例是否需要销毁回调
    fn requires_destruction(&self, _bean: &BeanObject) -> bool {
        true
    }
}

/// 元数据后置处理器
pub trait BeanFactoryPostProcessor: Send + Sync {
    /// 修改 bean 定义或工厂配置
    fn post_process_bean_factory(&self, factory: &dyn ConfigurableListableBeanFactory) -> BeanResult<()>;

    /// 执行顺序
    fn precedence(&self) -> Precedence {
        Precedence::Unordered
    }
}

/// 可以注册更多定义的元数据后置处理器
pub trait BeanDefinitionRegistryPostProcessor: BeanFactoryPostProcessor {
    /// 在普通工厂后置处理器之前注册额外的定义
    fn post_process_bean_definition_registry(&self, registry: &dyn BeanDefinitionRegistry) -> BeanResult<()>;
}

/// 手动传入的元数据后置处理器
#[derive(Clone)]
pub enum FactoryPostProcessor {
    Registry(Arc<dyn BeanDefinitionRegistryPostProcessor>),
    Regular(Arc<dyn BeanFactoryPostProcessor>),
}
