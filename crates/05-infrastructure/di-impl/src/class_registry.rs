//! 默认类注册表

use dashmap::DashMap;
use di_abstractions::{ClassDescriptor, ClassRegistry};
use parking_lot::RwLock;
use std::any::TypeId;
use std::sync::Arc;
use tracing::debug;

/// 按类名和实例类型索引的类注册表
#[derive(Default)]
pub struct DefaultClassRegistry {
    by_name: DashMap<String, Arc<ClassDescriptor>>,
    by_instance: DashMap<TypeId, Arc<ClassDescriptor>>,
    names: RwLock<Vec<String>>,
}

impl DefaultClassRegistry {
    /// 创建空的类注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 批量注册
    pub fn with_classes(classes: impl IntoIterator<Item = Arc<ClassDescriptor>>) -> Self {
        let registry = Self::new();
        for class in classes {
            registry.register_class(class);
        }
        registry
    }
}

impl ClassRegistry for DefaultClassRegistry {
    fn register_class(&self, class: Arc<ClassDescriptor>) {
        debug!("注册类: {}", class.name());
        let name = class.name().to_string();
        if self.by_name.insert(name.clone(), class.clone()).is_none() {
            self.names.write().push(name);
        }
        self.by_instance.insert(class.instance_type(), class);
    }

    fn resolve_class(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        self.by_name.get(name).map(|entry| entry.value().clone())
    }

    fn descriptor_for_instance(&self, type_id: TypeId) -> Option<Arc<ClassDescriptor>> {
        self.by_instance.get(&type_id).map(|entry| entry.value().clone())
    }

    fn class_names(&self) -> Vec<String> {
        self.names.read().clone()
    }
}
