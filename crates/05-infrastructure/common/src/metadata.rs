//! 元数据定义
//!
//! 提供按类型匹配 bean 所需的类型标识

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// 类型键
///
/// 由 `TypeId` 和类型名称组成，是按类型匹配的基本单位。既可以表示具体类型，
/// 也可以表示 `dyn Trait` 这样的 trait 对象类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    /// 类型ID
    pub id: TypeId,
    /// 类型名称
    pub name: &'static str,
    /// 视图对象 `Arc<T>` 的类型ID；运行时擦除得到的键没有视图类型
    pub view_id: Option<TypeId>,
}

impl TypeKey {
    /// 从类型获取类型键
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            view_id: Some(TypeId::of::<Arc<T>>()),
        }
    }

    /// 只知道运行时 `TypeId` 的类型键
    pub fn erased(id: TypeId, name: &'static str) -> Self {
        Self { id, name, view_id: None }
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }

    /// 检查对象的具体类型是否正好是此类型
    pub fn is_instance(&self, object: &(dyn Any + Send + Sync)) -> bool {
        object.type_id() == self.id
    }

    /// 检查对象是否已经是此类型的视图（`Arc<T>`）
    pub fn is_view(&self, object: &(dyn Any + Send + Sync)) -> bool {
        self.view_id == Some(object.type_id())
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 去掉模块路径的类型名称，泛型参数保持原样
pub fn short_type_name(name: &str) -> &str {
    let head = name.split('<').next().unwrap_or(name);
    match head.rfind("::") {
        Some(idx) => &name[idx + 2..],
        None => name,
    }
}
