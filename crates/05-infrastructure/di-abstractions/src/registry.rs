//! 注册表抽象接口

use crate::class::ClassDescriptor;
use crate::definition::BeanDefinition;
use infrastructure_common::{BeanObject, BeanResult, TypeKey};
use std::any::TypeId;
use std::sync::Arc;

/// 单例注册表
pub trait SingletonBeanRegistry: Send + Sync {
    /// 手动注册一个已经完全初始化的单例
    fn register_singleton(&self, name: &str, object: BeanObject) -> BeanResult<()>;

    /// 获取单例，允许返回循环引用中的早期引用
    fn get_singleton(&self, name: &str) -> BeanResult<Option<BeanObject>>;

    /// 是否存在完全初始化的单例
    fn contains_singleton(&self, name: &str) -> bool;

    /// 按注册顺序返回单例名称
    fn singleton_names(&self) -> Vec<String>;

    /// 已注册单例的数量
    fn singleton_count(&self) -> usize;
}

/// 别名注册表
pub trait AliasRegistry: Send + Sync {
    /// 为名称注册别名
    fn register_alias(&self, name: &str, alias: &str) -> BeanResult<()>;

    /// 移除别名
    fn remove_alias(&self, alias: &str) -> BeanResult<()>;

    /// 是否为别名
    fn is_alias(&self, name: &str) -> bool;

    /// 指向该名称的所有别名（包括链式别名）
    fn get_aliases(&self, name: &str) -> Vec<String>;

    /// 解析别名链，返回规范名称
    fn canonical_name(&self, name: &str) -> String;
}

/// bean 定义注册表
pub trait BeanDefinitionRegistry: AliasRegistry {
    /// 注册 bean 定义
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeanResult<()>;

    /// 移除 bean 定义
    fn remove_bean_definition(&self, name: &str) -> BeanResult<()>;

    /// 返回定义的副本
    fn get_bean_definition(&self, name: &str) -> BeanResult<BeanDefinition>;

    /// 是否存在该名称的定义
    fn contains_bean_definition(&self, name: &str) -> bool;

    /// 按注册顺序返回定义名称
    fn bean_definition_names(&self) -> Vec<String>;

    /// 定义数量
    fn bean_definition_count(&self) -> usize;

    /// 名称是否已被定义或别名占用
    fn is_bean_name_in_use(&self, name: &str) -> bool {
        self.contains_bean_definition(name) || self.is_alias(name)
    }
}

/// 类注册表（类名 → 类描述符）
pub trait ClassRegistry: Send + Sync {
    /// 注册类描述符
    fn register_class(&self, class: Arc<ClassDescriptor>);

    /// 按类名取得类描述符
    fn resolve_class(&self, name: &str) -> Option<Arc<ClassDescriptor>>;

    /// 按实例的 `TypeId` 查找描述符
    fn descriptor_for_instance(&self, type_id: TypeId) -> Option<Arc<ClassDescriptor>>;

    /// 全部已注册的类名
    fn class_names(&self) -> Vec<String>;

    /// 把对象转换为指定类型的视图
    fn adapt(&self, object: &BeanObject, key: TypeKey) -> Option<BeanObject> {
        if (**object).type_id() == key.id {
            return Some(object.clone());
        }
        self.descriptor_for_instance((**object).type_id())
            .and_then(|class| class.cast(object, key))
    }
}
