//! 销毁回调适配器
//!
//! 把销毁感知处理器、`DisposableBean` 能力和自定义 destroy 方法合并为一个
//! [`DisposableBean`]，由单例注册表或作用域在销毁时调用。

use di_abstractions::{BeanPostProcessor, ClassDescriptor, MethodDescriptor, RootBeanDefinition};
use infrastructure_common::{BeanError, BeanObject, BeanResult, DisposableBean};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// `DisposableBean` 回调对应的方法名
const DISPOSABLE_DESTROY_METHOD: &str = "destroy";

/// 单个 bean 的销毁回调
pub(crate) struct DisposableBeanAdapter {
    /// bean 名称
    name: String,
    /// 被销毁的实例
    bean: BeanObject,
    /// 实例的类描述符
    class: Option<Arc<ClassDescriptor>>,
    /// 是否调用 `DisposableBean::destroy`
    invoke_disposable: bool,
    /// 需要依次调用的自定义 destroy 方法
    destroy_methods: Vec<MethodDescriptor>,
    /// 需要执行销毁前回调的处理器
    processors: Vec<Arc<dyn BeanPostProcessor>>,
}

impl DisposableBeanAdapter {
    /// 收集实例的全部销毁回调
    ///
    /// 已由 `DisposableBean` 或外部管理的方法不会重复调用；`enforce_destroy_method`
    /// 为真时找不到方法会报错。
    pub(crate) fn new(
        name: &str,
        bean: BeanObject,
        class: Option<Arc<ClassDescriptor>>,
        definition: Option<&RootBeanDefinition>,
        processors: &[Arc<dyn BeanPostProcessor>],
    ) -> BeanResult<Self> {
        let invoke_disposable = class.as_ref().is_some_and(|c| c.is_disposable_bean())
            && !definition.is_some_and(|d| d.is_externally_managed_destroy_method(DISPOSABLE_DESTROY_METHOD));

        let mut destroy_methods = Vec::new();
        if let Some(definition) = definition {
            let def = definition.definition();
            for method_name in &def.destroy_method_names {
                if invoke_disposable && method_name == DISPOSABLE_DESTROY_METHOD {
                    continue;
                }
                if definition.is_externally_managed_destroy_method(method_name) {
                    continue;
                }
                match class.as_ref().and_then(|c| c.method(method_name)) {
                    Some(method) => destroy_methods.push(method.clone()),
                    None if def.enforce_destroy_method => {
                        return Err(BeanError::DefinitionValidation {
                            name: name.to_string(),
                            message: format!("找不到名为 '{}' 的 destroy 方法", method_name),
                        });
                    }
                    None => debug!("bean '{}' 上没有名为 '{}' 的 destroy 方法, 跳过", name, method_name),
                }
            }
        }

        let processors = processors
            .iter()
            .filter(|p| {
                p.as_destruction_aware()
                    .is_some_and(|d| d.requires_destruction(&bean))
            })
            .cloned()
            .collect();

        Ok(Self {
            name: name.to_string(),
            bean,
            class,
            invoke_disposable,
            destroy_methods,
            processors,
        })
    }

    /// 是否有任何需要执行的回调，没有时不必登记
    pub(crate) fn has_destruction_work(&self) -> bool {
        self.invoke_disposable || !self.destroy_methods.is_empty() || !self.processors.is_empty()
    }
}

impl DisposableBean for DisposableBeanAdapter {
    /// 依次执行处理器回调、`DisposableBean::destroy` 和自定义方法，单个回调失败只记录日志
    fn destroy(&self) -> anyhow::Result<()> {
        for processor in &self.processors {
            if let Some(aware) = processor.as_destruction_aware() {
                if let Err(e) = aware.post_process_before_destruction(&self.bean, &self.name) {
                    warn!("销毁前处理 bean '{}' 失败: {}", self.name, e);
                }
            }
        }

        if self.invoke_disposable {
            if let Some(class) = &self.class {
                trace!("调用 bean '{}' 的 destroy()", self.name);
                if let Err(e) = class.destroy(&self.bean) {
                    warn!("调用 bean '{}' 的 destroy() 失败: {:#}", self.name, e);
                }
            }
        }

        for method in &self.destroy_methods {
            trace!("调用 bean '{}' 的自定义 destroy 方法 '{}'", self.name, method.name);
            if let Err(e) = method.invoke(&self.bean) {
                warn!("调用 bean '{}' 的 destroy 方法 '{}' 失败: {:#}", self.name, method.name, e);
            }
        }
        Ok(())
    }
}
