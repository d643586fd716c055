//! 顺序约定
//!
//! 后置处理器和多值注入都需要稳定的排序规则：
//! 优先排序 (PriorityOrdered) → 普通排序 (Ordered) → 无序（保持注册顺序）。

use std::cmp::Ordering;

/// 最高优先级
pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;

/// 最低优先级
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// 排序声明
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precedence {
    /// 最强的显式排序，值越小越靠前
    PriorityOrdered(i32),
    /// 普通显式排序，值越小越靠前
    Ordered(i32),
    /// 未声明排序，按注册顺序
    #[default]
    Unordered,
}

impl Precedence {
    /// 排序层级
    pub fn tier(&self) -> u8 {
        match self {
            Self::PriorityOrdered(_) => 0,
            Self::Ordered(_) => 1,
            Self::Unordered => 2,
        }
    }

    /// 层级内的排序值
    pub fn order(&self) -> i32 {
        match self {
            Self::PriorityOrdered(order) | Self::Ordered(order) => *order,
            Self::Unordered => LOWEST_PRECEDENCE,
        }
    }

    /// 比较两个排序声明
    pub fn compare(&self, other: &Self) -> Ordering {
        self.tier()
            .cmp(&other.tier())
            .then_with(|| self.order().cmp(&other.order()))
    }
}

/// 可排序对象
pub trait Ordered {
    /// 排序声明
    fn precedence(&self) -> Precedence {
        Precedence::Unordered
    }
}

/// 稳定排序：相同排序声明的元素保持原有顺序
pub fn sort_by_precedence<T>(items: &mut [T], precedence: impl Fn(&T) -> Precedence) {
    items.sort_by(|a, b| precedence(a).compare(&precedence(b)));
}

/// 按优先级值稳定排序（值越小越靠前，未声明的排在最后）
pub fn sort_by_priority<T>(items: &mut [T], priority: impl Fn(&T) -> Option<i32>) {
    items.sort_by(|a, b| match (priority(a), priority(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
