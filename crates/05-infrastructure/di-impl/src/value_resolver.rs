//! 定义值解析
//!
//! 把定义中的 [`BeanValue`] 解析为运行期对象：引用交给工厂获取，内部 bean 就地创建，
//! 字符串字面量先经过内嵌值解析器再按目标类型转换。

use crate::factory::DefaultListableBeanFactory;
use di_abstractions::{
    BeanClassRef, BeanDefinition, BeanFactory, BeanList, BeanValue, ConfigurableBeanFactory,
    InjectionKind, RootBeanDefinition,
};
use infrastructure_common::{BeanError, BeanObject, BeanResult, TypeKey};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::trace;

/// 解析后、类型转换前的值
#[derive(Clone)]
pub(crate) enum ResolvedValue {
    Object(BeanObject),
    Text(String),
    List(Vec<ResolvedValue>),
    Null,
}

pub(crate) struct BeanDefinitionValueResolver<'a> {
    factory: &'a DefaultListableBeanFactory,
    bean_name: &'a str,
    definition: &'a RootBeanDefinition,
}

impl<'a> BeanDefinitionValueResolver<'a> {
    pub(crate) fn new(
        factory: &'a DefaultListableBeanFactory,
        bean_name: &'a str,
        definition: &'a RootBeanDefinition,
    ) -> Self {
        Self {
            factory,
            bean_name,
            definition,
        }
    }

    /// `arg_name` 只用于错误信息
    pub(crate) fn resolve(&self, arg_name: &str, value: &BeanValue) -> BeanResult<ResolvedValue> {
        match value {
            BeanValue::Reference(reference) => {
                let bean = self.factory.get_bean(reference).map_err(|e| {
                    BeanError::creation_caused_by(
                        self.bean_name,
                        format!("设置{}时无法解析对 bean '{}' 的引用", arg_name, reference),
                        e,
                    )
                })?;
                self.factory.register_dependent(reference, self.bean_name);
                Ok(ResolvedValue::Object(bean))
            }
            BeanValue::Inner { name, definition } => {
                self.resolve_inner_bean(arg_name, name.as_deref(), definition)
            }
            BeanValue::Literal(text) => {
                let resolved = self.factory.resolve_embedded_value(text).map_err(|e| {
                    BeanError::creation_caused_by(
                        self.bean_name,
                        format!("解析{}中的占位符失败", arg_name),
                        e,
                    )
                })?;
                Ok(ResolvedValue::Text(resolved))
            }
            BeanValue::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.resolve(&format!("{}[{}]", arg_name, i), item))
                .collect::<BeanResult<Vec<_>>>()
                .map(ResolvedValue::List),
            BeanValue::Object(object) => Ok(ResolvedValue::Object(object.clone())),
            BeanValue::Null => Ok(ResolvedValue::Null),
        }
    }

    fn resolve_inner_bean(
        &self,
        arg_name: &str,
        inner_name: Option<&str>,
        definition: &BeanDefinition,
    ) -> BeanResult<ResolvedValue> {
        let actual_name = match inner_name {
            Some(name) => name.to_string(),
            None => format!(
                "(inner bean)#{}",
                self.factory.inner_bean_counter.fetch_add(1, Ordering::Relaxed)
            ),
        };
        let wrap = |e: BeanError| {
            BeanError::creation_caused_by(
                self.bean_name,
                format!("无法为{}创建内部 bean '{}'", arg_name, actual_name),
                e,
            )
        };

        if let Some(BeanClassRef::Resolved(class)) = &definition.bean_class {
            self.factory.ensure_class_registered(class);
        }
        let merged = self
            .factory
            .definitions
            .merged_inner(&actual_name, definition, self.definition, self.factory.classes.as_ref())
            .map_err(wrap)?;
        for dependency in &merged.definition().depends_on {
            self.factory.register_dependent(dependency, &actual_name);
            self.factory.get_bean(dependency).map_err(wrap)?;
        }

        trace!("为 bean '{}' 创建内部 bean '{}'", self.bean_name, actual_name);
        let inner = self
            .factory
            .create_bean_from_definition(&actual_name, &merged, None)
            .map_err(wrap)?;
        if merged.is_singleton() {
            self.factory
                .singletons
                .register_contained_bean(&actual_name, self.bean_name);
        }
        Ok(ResolvedValue::Object(inner))
    }

    /// 按目标类型转换；`Null` 转换为 `None`
    pub(crate) fn convert(
        &self,
        value: ResolvedValue,
        target: TypeKey,
        kind: InjectionKind,
    ) -> BeanResult<Option<BeanObject>> {
        match (value, kind) {
            (ResolvedValue::Null, _) => Ok(None),
            (ResolvedValue::Object(object), InjectionKind::Multiple) => {
                if object.is::<BeanList>() {
                    return Ok(Some(object));
                }
                let element = self.convert_single(ResolvedValue::Object(object), target)?;
                Ok(Some(Arc::new(BeanList(element.into_iter().collect()))))
            }
            (ResolvedValue::Text(text), InjectionKind::Multiple) => {
                let mut elements = Vec::new();
                for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    elements.extend(self.convert_single(ResolvedValue::Text(part.to_string()), target)?);
                }
                Ok(Some(Arc::new(BeanList(elements))))
            }
            (ResolvedValue::List(items), InjectionKind::Multiple) => {
                let mut elements = Vec::with_capacity(items.len());
                for item in items {
                    elements.extend(self.convert_single(item, target)?);
                }
                Ok(Some(Arc::new(BeanList(elements))))
            }
            (ResolvedValue::List(_), _) => Err(BeanError::Conversion {
                value: "<list>".to_string(),
                required_type: target.name.to_string(),
                message: "列表值只能注入多值参数或属性".to_string(),
            }),
            (value, _) => self.convert_single(value, target),
        }
    }

    fn convert_single(&self, value: ResolvedValue, target: TypeKey) -> BeanResult<Option<BeanObject>> {
        match value {
            ResolvedValue::Null => Ok(None),
            ResolvedValue::Text(text) => self.factory.type_converter().convert(&text, target).map(Some),
            ResolvedValue::Object(object) => {
                if let Some(adapted) = self.factory.adapt_object(&object, target, None) {
                    return Ok(Some(adapted));
                }
                if let Some(text) = object.downcast_ref::<String>() {
                    return self.factory.type_converter().convert(text, target).map(Some);
                }
                Err(BeanError::BeanNotOfRequiredType {
                    name: self.bean_name.to_string(),
                    required_type: target.name.to_string(),
                    actual_type: self.factory.type_name_of(&object),
                })
            }
            ResolvedValue::List(_) => Err(BeanError::Conversion {
                value: "<list>".to_string(),
                required_type: target.name.to_string(),
                message: "不支持嵌套列表".to_string(),
            }),
        }
    }

    /// 值能否直接注入目标类型（用于匹配未指定下标的构造器参数）
    pub(crate) fn is_assignable(&self, value: &ResolvedValue, target: TypeKey, kind: InjectionKind) -> bool {
        match (value, kind) {
            (ResolvedValue::Null, _) => true,
            (ResolvedValue::List(_), kind) => kind == InjectionKind::Multiple,
            (ResolvedValue::Text(_), _) => self.factory.type_converter().can_convert(target),
            (ResolvedValue::Object(object), InjectionKind::Multiple) => {
                object.is::<BeanList>() || self.factory.adapt_object(object, target, None).is_some()
            }
            (ResolvedValue::Object(object), _) => {
                self.factory.adapt_object(object, target, None).is_some()
                    || (object.is::<String>() && self.factory.type_converter().can_convert(target))
            }
        }
    }
}
