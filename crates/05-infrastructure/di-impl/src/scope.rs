//! 显式开始/结束的上下文作用域
//!
//! 典型用途是请求、批处理任务之类的短生命周期上下文：调用 [`ContextScope::begin`]
//! 开始，[`ContextScope::end`] 结束并按注册的逆序执行销毁回调。

use chrono::{DateTime, Utc};
use di_abstractions::{DestructionCallback, Scope};
use infrastructure_common::{BeanError, BeanObject, BeanResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info, warn};
use uuid::Uuid;

struct ActiveContext {
    id: Uuid,
    started_at: DateTime<Utc>,
    objects: HashMap<String, BeanObject>,
    callbacks: Vec<(String, DestructionCallback)>,
}

/// 上下文作用域
pub struct ContextScope {
    name: String,
    active: Mutex<Option<ActiveContext>>,
}

impl ContextScope {
    /// 创建未激活的作用域
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: Mutex::new(None),
        }
    }

    /// 作用域名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 开始一个新的上下文，返回上下文 id
    pub fn begin(&self) -> BeanResult<Uuid> {
        let mut active = self.active.lock();
        if let Some(context) = active.as_ref() {
            return Err(BeanError::illegal_state(format!(
                "作用域 '{}' 已有活动上下文 {}",
                self.name, context.id
            )));
        }
        let context = ActiveContext {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            objects: HashMap::new(),
            callbacks: Vec::new(),
        };
        let id = context.id;
        info!("作用域 '{}' 开始上下文 {}", self.name, id);
        *active = Some(context);
        Ok(id)
    }

    /// 结束当前上下文，没有活动上下文时什么也不做
    pub fn end(&self) {
        let Some(context) = self.active.lock().take() else {
            return;
        };
        let elapsed = Utc::now() - context.started_at;
        info!(
            "作用域 '{}' 结束上下文 {} (持续 {} ms, {} 个对象)",
            self.name,
            context.id,
            elapsed.num_milliseconds(),
            context.objects.len()
        );
        for (name, callback) in context.callbacks.into_iter().rev() {
            debug!("执行作用域对象 '{}' 的销毁回调", name);
            if catch_unwind(AssertUnwindSafe(callback)).is_err() {
                warn!("作用域对象 '{}' 的销毁回调发生 panic", name);
            }
        }
    }

    /// 当前是否有活动上下文
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// 当前上下文的开始时间
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.active.lock().as_ref().map(|c| c.started_at)
    }

    fn not_active(&self) -> BeanError {
        BeanError::ScopeNotActive {
            scope: self.name.clone(),
        }
    }
}

impl Scope for ContextScope {
    fn get(
        &self,
        name: &str,
        object_factory: &mut dyn FnMut() -> BeanResult<BeanObject>,
    ) -> BeanResult<BeanObject> {
        let id = {
            let active = self.active.lock();
            let context = active.as_ref().ok_or_else(|| self.not_active())?;
            if let Some(object) = context.objects.get(name) {
                return Ok(object.clone());
            }
            context.id
        };

        // 创建过程可能再次进入本作用域，不能持有锁
        let object = object_factory()?;

        let mut active = self.active.lock();
        match active.as_mut() {
            Some(context) if context.id == id => Ok(context
                .objects
                .entry(name.to_string())
                .or_insert(object)
                .clone()),
            _ => Err(self.not_active()),
        }
    }

    fn remove(&self, name: &str) -> Option<BeanObject> {
        let mut active = self.active.lock();
        let context = active.as_mut()?;
        context.callbacks.retain(|(n, _)| n != name);
        context.objects.remove(name)
    }

    fn register_destruction_callback(&self, name: &str, callback: DestructionCallback) {
        match self.active.lock().as_mut() {
            Some(context) => context.callbacks.push((name.to_string(), callback)),
            None => warn!("作用域 '{}' 未激活, 忽略对象 '{}' 的销毁回调", self.name, name),
        }
    }

    fn conversation_id(&self) -> Option<String> {
        self.active.lock().as_ref().map(|c| c.id.to_string())
    }

    fn close(&self) {
        self.end();
    }
}
