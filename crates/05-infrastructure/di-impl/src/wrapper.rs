//! 创建期间包装原始实例，按属性名读写

use di_abstractions::{ClassDescriptor, PropertyDescriptor};
use infrastructure_common::{BeanError, BeanObject, BeanResult};
use std::sync::Arc;

/// 原始实例及其类描述符
#[derive(Clone)]
pub struct BeanWrapper {
    instance: BeanObject,
    class: Option<Arc<ClassDescriptor>>,
}

impl BeanWrapper {
    /// 包装实例及其类描述符
    pub fn new(instance: BeanObject, class: Option<Arc<ClassDescriptor>>) -> Self {
        Self { instance, class }
    }

    /// 被包装的实例
    pub fn instance(&self) -> &BeanObject {
        &self.instance
    }

    /// 实例的类描述符
    pub fn class(&self) -> Option<&Arc<ClassDescriptor>> {
        self.class.as_ref()
    }

    /// 类名，未知类时为占位名称
    pub fn class_name(&self) -> &str {
        self.class.as_ref().map_or("<未知类型>", |c| c.name())
    }

    /// 按名称查找属性
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.class.as_ref().and_then(|c| c.property(name))
    }

    /// 属性是否可写
    pub fn is_writable_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    /// 属性是否可读
    pub fn is_readable_property(&self, name: &str) -> bool {
        self.property(name).is_some_and(PropertyDescriptor::is_readable)
    }

    /// 写入属性值
    pub fn set_property_value(&self, name: &str, value: BeanObject) -> BeanResult<()> {
        let property = self.property(name).ok_or_else(|| self.invalid(name, "属性不可写或没有 setter"))?;
        property
            .set(&self.instance, value)
            .map_err(|e| self.invalid(name, &format!("{:#}", e)))
    }

    /// 读取属性值
    pub fn get_property_value(&self, name: &str) -> BeanResult<Option<BeanObject>> {
        let property = self.property(name).ok_or_else(|| self.invalid(name, "属性不存在"))?;
        if !property.is_readable() {
            return Err(self.invalid(name, "属性没有 getter"));
        }
        Ok(property.get(&self.instance))
    }

    fn invalid(&self, property: &str, message: &str) -> BeanError {
        BeanError::InvalidProperty {
            class: self.class_name().to_string(),
            property: property.to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Debug for BeanWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanWrapper")
            .field("class", &self.class_name())
            .finish()
    }
}
