//! 自定义作用域

use infrastructure_common::{BeanObject, BeanResult};

/// 销毁回调
pub type DestructionCallback = Box<dyn FnOnce() + Send>;

/// 自定义作用域
///
/// 单例和原型之外的作用域（例如请求、会话、批处理上下文）通过此接口接入。
/// 作用域未激活时 [`Scope::get`] 返回 `ScopeNotActive`。
pub trait Scope: Send + Sync {
    /// 取得作用域中的对象，不存在时用 `object_factory` 创建
    fn get(
        &self,
        name: &str,
        object_factory: &mut dyn FnMut() -> BeanResult<BeanObject>,
    ) -> BeanResult<BeanObject>;

    /// 从作用域中移除对象
    fn remove(&self, name: &str) -> Option<BeanObject>;

    /// 对象随作用域结束而销毁时执行的回调
    fn register_destruction_callback(&self, name: &str, callback: DestructionCallback);

    /// 当前上下文的标识
    fn conversation_id(&self) -> Option<String> {
        None
    }

    /// 工厂关闭时调用
    fn close(&self) {}
}
