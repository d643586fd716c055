//! bean 工厂抽象接口
//!
//! 接口按能力拆分：基础查找 [`BeanFactory`]、批量查找 [`ListableBeanFactory`]、
//! 层级 [`HierarchicalBeanFactory`]、配置 [`ConfigurableBeanFactory`]、
//! 自动装配 [`AutowireCapableBeanFactory`]，最终汇总为
//! [`ConfigurableListableBeanFactory`]。

use crate::class::{downcast_bean, downcast_view, ClassDescriptor};
use crate::definition::{AutowireMode, BeanDefinition};
use crate::descriptor::DependencyDescriptor;
use crate::merged::RootBeanDefinition;
use crate::processor::BeanPostProcessor;
use crate::registry::{BeanDefinitionRegistry, SingletonBeanRegistry};
use crate::resolver::{StringValueResolver, TypeConverter};
use crate::scope::Scope;
use infrastructure_common::{BeanError, BeanObject, BeanResult, TypeKey};
use std::sync::Arc;

/// bean 工厂
pub trait BeanFactory: Send + Sync {
    /// 按名称（或别名）获取 bean
    fn get_bean(&self, name: &str) -> BeanResult<BeanObject>;

    /// 按名称获取并转换为指定类型
    fn get_bean_of_type(&self, name: &str, required_type: TypeKey) -> BeanResult<BeanObject>;

    /// 使用显式参数创建（仅对原型或尚未创建的单例有意义）
    fn get_bean_with_args(&self, name: &str, args: Vec<BeanObject>) -> BeanResult<BeanObject>;

    /// 按类型获取唯一的 bean
    fn resolve_bean(&self, required_type: TypeKey) -> BeanResult<BeanObject>;

    /// 工厂或父工厂中是否存在该名称的 bean
    fn contains_bean(&self, name: &str) -> bool;

    /// 是否为单例
    fn is_singleton(&self, name: &str) -> BeanResult<bool>;

    /// 是否为原型
    fn is_prototype(&self, name: &str) -> BeanResult<bool>;

    /// bean 能否作为指定类型使用
    fn is_type_match(&self, name: &str, type_to_match: TypeKey) -> BeanResult<bool>;

    /// 预测 bean 的类型，不触发创建
    fn get_type(&self, name: &str) -> BeanResult<Option<TypeKey>>;
}

/// 带类型的便捷获取方法
pub trait BeanFactoryExt: BeanFactory {
    /// 按名称获取具体类型的 bean
    fn get_typed<T: Send + Sync + 'static>(&self, name: &str) -> BeanResult<Arc<T>> {
        let object = self.get_bean_of_type(name, TypeKey::of::<T>())?;
        downcast_bean::<T>(&object).ok_or_else(|| not_of_type(name, TypeKey::of::<T>()))
    }

    /// 按名称获取 trait 视图
    fn get_view<V: ?Sized + Send + Sync + 'static>(&self, name: &str) -> BeanResult<Arc<V>> {
        let object = self.get_bean_of_type(name, TypeKey::of::<V>())?;
        downcast_view::<V>(&object).ok_or_else(|| not_of_type(name, TypeKey::of::<V>()))
    }

    /// 按类型解析唯一的 bean
    fn resolve_typed<T: Send + Sync + 'static>(&self) -> BeanResult<Arc<T>> {
        let object = self.resolve_bean(TypeKey::of::<T>())?;
        downcast_bean::<T>(&object).ok_or_else(|| not_of_type("", TypeKey::of::<T>()))
    }

    /// 按 trait 视图解析唯一的 bean
    fn resolve_view<V: ?Sized + Send + Sync + 'static>(&self) -> BeanResult<Arc<V>> {
        let object = self.resolve_bean(TypeKey::of::<V>())?;
        downcast_view::<V>(&object).ok_or_else(|| not_of_type("", TypeKey::of::<V>()))
    }
}

impl<F: BeanFactory + ?Sized> BeanFactoryExt for F {}

fn not_of_type(name: &str, key: TypeKey) -> BeanError {
    BeanError::BeanNotOfRequiredType {
        name: name.to_string(),
        required_type: key.name.to_string(),
        actual_type: "unknown".to_string(),
    }
}

/// 可枚举的 bean 工厂
pub trait ListableBeanFactory: BeanFactory {
    /// 匹配类型的 bean 名称，按定义注册顺序
    fn bean_names_for_type(
        &self,
        type_key: TypeKey,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> Vec<String>;

    /// 匹配类型的所有 bean（会触发创建）
    fn beans_of_type(&self, type_key: TypeKey) -> BeanResult<Vec<(String, BeanObject)>>;
}

/// 有父工厂的 bean 工厂
pub trait HierarchicalBeanFactory: BeanFactory {
    /// 父工厂
    fn parent_bean_factory(&self) -> Option<Arc<dyn BeanFactory>>;

    /// 只在本工厂中查找，忽略父工厂
    fn contains_local_bean(&self, name: &str) -> bool;
}

/// 可配置的 bean 工厂
pub trait ConfigurableBeanFactory: HierarchicalBeanFactory + SingletonBeanRegistry {
    /// 设置父工厂，只能设置一次
    fn set_parent_bean_factory(&self, parent: Arc<dyn BeanFactory>) -> BeanResult<()>;

    /// 添加后置处理器，已存在的同一实例会被移动到新的位置
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>);

    /// 已注册的 bean 后置处理器数量
    fn bean_post_processor_count(&self) -> usize;

    /// 注册自定义作用域，不能替换单例和原型
    fn register_scope(&self, name: &str, scope: Arc<dyn Scope>) -> BeanResult<()>;

    /// 按名称取得已注册的作用域
    fn registered_scope(&self, name: &str) -> Option<Arc<dyn Scope>>;

    /// 已注册的自定义作用域名称
    fn registered_scope_names(&self) -> Vec<String>;

    /// 添加内嵌值解析器
    fn add_embedded_value_resolver(&self, resolver: Arc<dyn StringValueResolver>);

    /// 是否有内嵌值解析器
    fn has_embedded_value_resolver(&self) -> bool;

    /// 用全部内嵌值解析器依次解析字符串
    fn resolve_embedded_value(&self, value: &str) -> BeanResult<String>;

    /// 替换类型转换器
    fn set_type_converter(&self, converter: Arc<dyn TypeConverter>);

    /// 当前类型转换器
    fn type_converter(&self) -> Arc<dyn TypeConverter>;

    /// 将名称排除或纳入“正在创建”检查
    fn set_currently_in_creation(&self, name: &str, in_creation: bool);

    /// bean 是否正在创建
    fn is_currently_in_creation(&self, name: &str) -> bool;

    /// 登记 `dependent` 依赖 `name`
    fn register_dependent_bean(&self, name: &str, dependent: &str);

    /// 依赖该 bean 的 bean
    fn dependent_beans(&self, name: &str) -> Vec<String>;

    /// 该 bean 依赖的 bean
    fn dependencies_for_bean(&self, name: &str) -> Vec<String>;

    /// 取得合并后的定义
    fn get_merged_bean_definition(&self, name: &str) -> BeanResult<Arc<RootBeanDefinition>>;

    /// 按定义销毁给定实例（通常是原型）
    fn destroy_bean(&self, name: &str, object: BeanObject);

    /// 从自定义作用域中移除并销毁
    fn destroy_scoped_bean(&self, name: &str) -> BeanResult<()>;

    /// 销毁全部单例
    fn destroy_singletons(&self);
}

/// 支持自动装配的 bean 工厂
pub trait AutowireCapableBeanFactory: BeanFactory {
    /// 按类完整创建一个新实例（原型语义，构造器自动装配）
    fn create_bean(&self, class: Arc<ClassDescriptor>) -> BeanResult<BeanObject>;

    /// 对已有实例按名称或类型自动装配属性
    fn autowire_bean_properties(&self, existing: &BeanObject, mode: AutowireMode) -> BeanResult<()>;

    /// 对已有实例执行感知回调、初始化回调和后置处理器
    fn initialize_existing_bean(&self, existing: BeanObject, name: &str) -> BeanResult<BeanObject>;

    /// 对实例依次执行初始化前回调
    fn apply_bean_post_processors_before_initialization(
        &self,
        existing: BeanObject,
        name: &str,
    ) -> BeanResult<BeanObject>;

    /// 对实例依次执行初始化后回调
    fn apply_bean_post_processors_after_initialization(
        &self,
        existing: BeanObject,
        name: &str,
    ) -> BeanResult<BeanObject>;

    /// 解析依赖；`autowired_names` 收集被注入的 bean 名称
    fn resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
        requesting_bean: Option<&str>,
        autowired_names: &mut Vec<String>,
    ) -> BeanResult<Option<BeanObject>>;
}

/// 完整的可配置、可枚举 bean 工厂
pub trait ConfigurableListableBeanFactory:
    ListableBeanFactory + AutowireCapableBeanFactory + ConfigurableBeanFactory + BeanDefinitionRegistry
{
    /// 自动装配属性时忽略此类型
    fn ignore_dependency_type(&self, type_key: TypeKey);

    /// 注册一个不是 bean 的可注入对象
    fn register_resolvable_dependency(&self, type_key: TypeKey, object: BeanObject);

    /// bean 能否作为该依赖的候选
    fn is_autowire_candidate(&self, name: &str, descriptor: &DependencyDescriptor) -> BeanResult<bool>;

    /// 写时复制地修改已注册定义
    fn update_bean_definition(
        &self,
        name: &str,
        mutator: &mut dyn FnMut(&mut BeanDefinition) -> BeanResult<()>,
    ) -> BeanResult<()>;

    /// 冻结定义，之后可以缓存元数据
    fn freeze_configuration(&self);

    /// 定义是否已冻结
    fn is_configuration_frozen(&self) -> bool;

    /// 丢弃尚未创建的 bean 的合并定义
    fn clear_metadata_cache(&self);

    /// 创建所有非懒加载单例
    fn pre_instantiate_singletons(&self) -> BeanResult<()>;
}
