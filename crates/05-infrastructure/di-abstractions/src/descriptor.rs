//! 依赖描述符

use crate::class::{InjectionKind, ParamDescriptor, PropertyDescriptor};
use infrastructure_common::TypeKey;
use std::fmt;

/// 注入点
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionPoint {
    Property {
        class: String,
        property: String,
    },
    ConstructorParameter {
        class: String,
        constructor: usize,
        index: usize,
    },
    FactoryMethodParameter {
        method: String,
        index: usize,
    },
    Standalone,
}

impl fmt::Display for InjectionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property { class, property } => write!(f, "类 [{}] 的属性 '{}'", class, property),
            Self::ConstructorParameter {
                class,
                constructor,
                index,
            } => write!(f, "类 [{}] 构造器 #{} 的参数 {}", class, constructor, index),
            Self::FactoryMethodParameter { method, index } => {
                write!(f, "工厂方法 '{}' 的参数 {}", method, index)
            }
            Self::Standalone => f.write_str("独立依赖"),
        }
    }
}

/// 依赖描述符
#[derive(Debug, Clone)]
pub struct DependencyDescriptor {
    /// 注入点
    pub injection_point: InjectionPoint,
    /// 属性名或参数名，用于按名称兜底匹配
    pub dependency_name: Option<String>,
    /// 依赖的类型
    pub type_key: TypeKey,
    /// 没有候选时是否报错
    pub required: bool,
    /// 是否允许为了类型匹配而初始化候选
    pub eager: bool,
    /// 是否注入全部候选
    pub multiple: bool,
    /// 限定符
    pub qualifier: Option<String>,
}

impl DependencyDescriptor {
    /// 独立的必需依赖
    pub fn new(type_key: TypeKey) -> Self {
        Self {
            injection_point: InjectionPoint::Standalone,
            dependency_name: None,
            type_key,
            required: true,
            eager: true,
            multiple: false,
            qualifier: None,
        }
    }

    /// 按类型构造独立依赖
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>())
    }

    /// 属性注入点
    pub fn for_property(class: &str, property: &PropertyDescriptor) -> Self {
        Self {
            injection_point: InjectionPoint::Property {
                class: class.to_string(),
                property: property.name.clone(),
            },
            dependency_name: Some(property.name.clone()),
            type_key: property.type_key,
            required: property.required,
            eager: true,
            multiple: property.kind == InjectionKind::Multiple,
            qualifier: None,
        }
    }

    /// 构造器或工厂方法参数注入点
    pub fn for_parameter(injection_point: InjectionPoint, param: &ParamDescriptor) -> Self {
        Self {
            injection_point,
            dependency_name: param.name.clone(),
            type_key: param.type_key,
            required: param.required,
            eager: true,
            multiple: param.kind == InjectionKind::Multiple,
            qualifier: param.qualifier.clone(),
        }
    }

    /// 设置是否必需
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// 设置是否允许提前初始化候选
    pub fn with_eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }

    /// 设置是否注入全部候选
    pub fn with_multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    /// 设置限定符
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// 设置用于按名称兜底匹配的名称
    pub fn with_dependency_name(mut self, name: impl Into<String>) -> Self {
        self.dependency_name = Some(name.into());
        self
    }
}
