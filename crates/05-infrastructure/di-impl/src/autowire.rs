//! 类型匹配与依赖解析

use crate::factory::DefaultListableBeanFactory;
use di_abstractions::{
    view_object, AutowireCapableBeanFactory, BeanFactory, BeanList, CandidateInfo,
    ClassDescriptor, ConfigurableListableBeanFactory, DependencyDescriptor, ListableBeanFactory,
    RootBeanDefinition,
};
use infrastructure_common::{sort_by_priority, BeanError, BeanObject, BeanResult, TypeKey};
use std::sync::Arc;
use tracing::{debug, trace};

/// 自动装配候选
enum Candidate {
    /// 已经完全初始化的实例
    Instance(BeanObject),
    /// 只知道类型，选中后才获取
    Pending,
    /// 注册的可注入对象（不是 bean）
    Resolvable(BeanObject),
}

impl DefaultListableBeanFactory {
    /// 定义本身声明的目标类型：工厂方法返回类型或 bean 类
    pub(crate) fn target_type(&self, name: &str, definition: &RootBeanDefinition) -> Option<Arc<ClassDescriptor>> {
        let def = definition.definition();
        if def.factory_method_name.is_none() {
            return definition.resolved_class();
        }
        if let Some(key) = definition.factory_method_return_type() {
            return Some(self.descriptor_for_key(key));
        }

        let method_name = def.factory_method_name.as_deref()?;
        let (factory_class, is_static) = match &def.factory_bean_name {
            Some(factory_bean) if factory_bean != name => {
                let factory_name = self.definitions.canonical_name(factory_bean);
                let class = match self.singletons.get_singleton(&factory_name, false) {
                    Ok(Some(instance)) => self.class_of(&instance, None),
                    _ => self
                        .merged(&factory_name)
                        .ok()
                        .and_then(|d| self.target_type(&factory_name, &d)),
                };
                (class?, false)
            }
            Some(_) => return None,
            None => (definition.resolved_class()?, true),
        };

        let mut return_types = factory_class
            .factory_methods()
            .iter()
            .filter(|m| m.name == method_name && m.is_static == is_static)
            .map(|m| m.return_type);
        let first = return_types.next()?;
        if return_types.all(|key| key == first) {
            Some(self.descriptor_for_key(first))
        } else {
            None
        }
    }

    /// 预测 bean 的类型，不触发创建
    pub(crate) fn predict_bean_type(&self, name: &str, definition: &RootBeanDefinition) -> Option<Arc<ClassDescriptor>> {
        let target = self.target_type(name, definition);
        if !definition.is_synthetic() {
            for processor in &self.post_processors.snapshot().smart {
                let Some(smart) = processor.as_smart_instantiation_aware() else {
                    continue;
                };
                match smart.predict_bean_type(target.as_ref(), name) {
                    Ok(Some(predicted)) => return Some(predicted),
                    Ok(None) => {}
                    Err(e) => debug!("预测 bean '{}' 的类型失败: {}", name, e),
                }
            }
        }
        target
    }

    fn descriptor_for_key(&self, key: TypeKey) -> Arc<ClassDescriptor> {
        self.classes
            .descriptor_for_instance(key.id)
            .unwrap_or_else(|| Arc::new(ClassDescriptor::opaque(key)))
    }

    /// 名称对应的 bean 是否匹配类型
    pub(crate) fn type_matches(
        &self,
        name: &str,
        definition: Option<&RootBeanDefinition>,
        key: TypeKey,
        allow_eager_init: bool,
    ) -> bool {
        if let Ok(Some(instance)) = self.singletons.get_singleton(name, false) {
            return self.adapt_object(&instance, key, definition).is_some();
        }
        let Some(definition) = definition else {
            return false;
        };
        if let Some(class) = self.predict_bean_type(name, definition) {
            return class.is_assignable_to(key);
        }

        // 只有实例提供者的单例只能通过创建确定类型
        if allow_eager_init
            && definition.is_singleton()
            && !definition.is_abstract()
            && definition.definition().instance_supplier.is_some()
        {
            return match self.do_get_bean(name, None, None, true) {
                Ok(instance) => self.adapt_object(&instance, key, Some(definition)).is_some(),
                Err(e) => {
                    debug!("为类型检查创建 bean '{}' 失败: {}", name, e);
                    self.singletons.on_suppressed_exception(e);
                    false
                }
            };
        }
        false
    }

    pub(crate) fn names_for_type(
        &self,
        key: TypeKey,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> Vec<String> {
        let cacheable = allow_eager_init && self.is_configuration_frozen() && self.config().cache_bean_metadata;
        if cacheable {
            if let Some(cached) = self.by_type_cache.get(&(key.id, include_non_singletons)) {
                return cached.value().clone();
            }
        }

        let mut result = Vec::new();
        for name in self.definitions.names() {
            let definition = match self.merged(&name) {
                Ok(definition) => definition,
                Err(e) => {
                    debug!("忽略无法合并的 bean 定义 '{}': {}", name, e);
                    continue;
                }
            };
            if definition.is_abstract() {
                continue;
            }
            if !include_non_singletons && !definition.is_singleton() {
                continue;
            }
            if self.type_matches(&name, Some(&definition), key, allow_eager_init) {
                result.push(name);
            }
        }

        for name in self.singletons.singleton_names() {
            if self.definitions.contains(&name) || result.contains(&name) {
                continue;
            }
            if let Ok(Some(instance)) = self.singletons.get_singleton(&name, false) {
                if self.adapt_object(&instance, key, None).is_some() {
                    result.push(name);
                }
            }
        }

        if cacheable {
            self.by_type_cache
                .insert((key.id, include_non_singletons), result.clone());
        }
        result
    }

    /// 工厂自身可以作为这些类型注入
    fn self_view(&self, key: TypeKey) -> Option<BeanObject> {
        let this = self.self_ref.upgrade()?;
        if key == TypeKey::of::<dyn BeanFactory>() {
            Some(view_object::<dyn BeanFactory>(this))
        } else if key == TypeKey::of::<dyn ListableBeanFactory>() {
            Some(view_object::<dyn ListableBeanFactory>(this))
        } else if key == TypeKey::of::<dyn AutowireCapableBeanFactory>() {
            Some(view_object::<dyn AutowireCapableBeanFactory>(this))
        } else if key == TypeKey::of::<dyn ConfigurableListableBeanFactory>() {
            Some(view_object::<dyn ConfigurableListableBeanFactory>(this))
        } else if key == TypeKey::of::<DefaultListableBeanFactory>() {
            Some(this as BeanObject)
        } else {
            None
        }
    }

    fn is_self_reference(&self, requesting: Option<&str>, candidate: &str) -> bool {
        let Some(requesting) = requesting else {
            return false;
        };
        requesting == candidate
            || (self.definitions.contains(candidate)
                && self
                    .merged(candidate)
                    .is_ok_and(|d| d.definition().factory_bean_name.as_deref() == Some(requesting)))
    }

    pub(crate) fn candidate_check(&self, name: &str, descriptor: &DependencyDescriptor) -> BeanResult<bool> {
        let resolver = self.candidate_resolver.read().clone();
        let aliases = self.definitions.aliases_of(name);
        if self.definitions.contains(name) {
            let merged = self.merged(name)?;
            let info = CandidateInfo {
                name,
                aliases: &aliases,
                definition: Some(merged.definition()),
            };
            return Ok(resolver.is_autowire_candidate(&info, descriptor));
        }
        if self.singletons.contains_singleton(name) {
            let info = CandidateInfo {
                name,
                aliases: &aliases,
                definition: None,
            };
            return Ok(resolver.is_autowire_candidate(&info, descriptor));
        }
        Err(BeanError::NoSuchBeanDefinition {
            name: name.to_string(),
        })
    }

    fn find_autowire_candidates(
        &self,
        requesting: Option<&str>,
        descriptor: &DependencyDescriptor,
    ) -> BeanResult<Vec<(String, Candidate)>> {
        let key = descriptor.type_key;
        let mut result = Vec::new();

        if let Some(object) = self.self_view(key) {
            result.push((format!("({})", key.short_name()), Candidate::Resolvable(object)));
        }
        for (registered, object) in self.resolvable_dependencies.read().iter() {
            if *registered == key {
                result.push((format!("({})", key.short_name()), Candidate::Resolvable(object.clone())));
            } else if let Some(adapted) = self.adapt_object(object, key, None) {
                result.push((format!("({})", registered.short_name()), Candidate::Resolvable(adapted)));
            }
        }

        let names = self.names_for_type(key, true, descriptor.eager);
        for name in &names {
            if self.is_self_reference(requesting, name) || !self.candidate_check(name, descriptor)? {
                continue;
            }
            result.push((name.clone(), self.candidate_entry(name, descriptor)?));
        }

        if result.is_empty() && !descriptor.multiple {
            for name in &names {
                if self.is_self_reference(requesting, name) && self.candidate_check(name, descriptor)? {
                    trace!("回退到自引用候选 '{}'", name);
                    result.push((name.clone(), self.candidate_entry(name, descriptor)?));
                }
            }
        }
        Ok(result)
    }

    fn candidate_entry(&self, name: &str, descriptor: &DependencyDescriptor) -> BeanResult<Candidate> {
        if descriptor.multiple {
            return self
                .get_bean_of_type(name, descriptor.type_key)
                .map(Candidate::Instance);
        }
        if self.singletons.contains_singleton(name) {
            if let Some(instance) = self.singletons.get_singleton(name, false)? {
                return Ok(Candidate::Instance(instance));
            }
        }
        Ok(Candidate::Pending)
    }

    fn candidate_priority(&self, name: &str, candidate: &Candidate) -> Option<i32> {
        let definition = if self.definitions.contains(name) {
            self.merged(name).ok()
        } else {
            None
        };
        if let Some(priority) = definition.as_ref().and_then(|d| d.definition().priority) {
            return Some(priority);
        }
        match candidate {
            Candidate::Instance(instance) => self
                .class_of(instance, definition.as_deref())
                .and_then(|c| c.priority()),
            Candidate::Pending => definition
                .as_ref()
                .and_then(|d| self.predict_bean_type(name, d))
                .and_then(|c| c.priority()),
            Candidate::Resolvable(_) => None,
        }
    }

    fn is_primary(&self, name: &str) -> bool {
        if self.definitions.contains(name) {
            return self.merged(name).is_ok_and(|d| d.definition().primary);
        }
        false
    }

    /// 多个候选时的选择：primary → 优先级 → 可注入对象或名称匹配
    fn determine_autowire_candidate(
        &self,
        candidates: &[(String, Candidate)],
        descriptor: &DependencyDescriptor,
    ) -> BeanResult<Option<usize>> {
        let key = descriptor.type_key;
        let primaries: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, (name, _))| self.is_primary(name))
            .map(|(i, _)| i)
            .collect();
        match primaries.len() {
            0 => {}
            1 => return Ok(Some(primaries[0])),
            _ => {
                return Err(BeanError::NoUniqueBean {
                    required_type: key.name.to_string(),
                    candidates: primaries.iter().map(|i| candidates[*i].0.clone()).collect(),
                    message: Some("候选中存在多个 primary bean".to_string()),
                })
            }
        }

        let priorities: Vec<Option<i32>> = candidates
            .iter()
            .map(|(name, candidate)| self.candidate_priority(name, candidate))
            .collect();
        if priorities.iter().all(Option::is_some) {
            let highest = priorities.iter().flatten().min().copied();
            let winners: Vec<usize> = priorities
                .iter()
                .enumerate()
                .filter(|(_, p)| **p == highest)
                .map(|(i, _)| i)
                .collect();
            if winners.len() > 1 {
                return Err(BeanError::NoUniqueBean {
                    required_type: key.name.to_string(),
                    candidates: winners.iter().map(|i| candidates[*i].0.clone()).collect(),
                    message: Some(format!("多个 bean 具有相同的最高优先级 {:?}", highest)),
                });
            }
            if let Some(winner) = winners.first() {
                return Ok(Some(*winner));
            }
        }

        for (index, (name, candidate)) in candidates.iter().enumerate() {
            if matches!(candidate, Candidate::Resolvable(_)) {
                return Ok(Some(index));
            }
            if let Some(dependency_name) = descriptor.dependency_name.as_deref() {
                if name == dependency_name || self.definitions.aliases_of(name).iter().any(|a| a == dependency_name) {
                    return Ok(Some(index));
                }
            }
        }
        Ok(None)
    }

    fn no_candidate(&self, descriptor: &DependencyDescriptor) -> BeanError {
        BeanError::NoSuchBeanOfType {
            required_type: descriptor.type_key.name.to_string(),
            message: format!(
                "期望至少 1 个可作为自动装配候选的 bean ({})",
                descriptor.injection_point
            ),
        }
    }

    /// 解析依赖；多值依赖返回 [`BeanList`]，可选依赖找不到时返回 `None`
    pub(crate) fn do_resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
        autowired_names: &mut Vec<String>,
    ) -> BeanResult<Option<BeanObject>> {
        let key = descriptor.type_key;
        let candidates = self.find_autowire_candidates(requesting, descriptor)?;

        if descriptor.multiple {
            let mut beans: Vec<(String, Option<i32>, BeanObject)> = Vec::with_capacity(candidates.len());
            for (name, candidate) in &candidates {
                let object = match candidate {
                    Candidate::Instance(object) | Candidate::Resolvable(object) => {
                        self.adapt_object(object, key, None).unwrap_or_else(|| object.clone())
                    }
                    Candidate::Pending => self.get_bean_of_type(name, key)?,
                };
                beans.push((name.clone(), self.candidate_priority(name, candidate), object));
            }
            if beans.is_empty() {
                return if descriptor.required {
                    Err(self.no_candidate(descriptor))
                } else {
                    Ok(None)
                };
            }
            sort_by_priority(&mut beans, |(_, priority, _)| *priority);
            let mut list = Vec::with_capacity(beans.len());
            for (name, _, object) in beans {
                if !name.starts_with('(') {
                    autowired_names.push(name);
                }
                list.push(object);
            }
            return Ok(Some(Arc::new(BeanList(list))));
        }

        if candidates.is_empty() {
            return if descriptor.required {
                Err(self.no_candidate(descriptor))
            } else {
                Ok(None)
            };
        }

        let index = if candidates.len() == 1 {
            0
        } else {
            match self.determine_autowire_candidate(&candidates, descriptor)? {
                Some(index) => index,
                None => {
                    return Err(BeanError::NoUniqueBean {
                        required_type: key.name.to_string(),
                        candidates: candidates.iter().map(|(n, _)| n.clone()).collect(),
                        message: None,
                    })
                }
            }
        };

        let (name, candidate) = &candidates[index];
        let object = match candidate {
            Candidate::Resolvable(object) => return Ok(Some(object.clone())),
            Candidate::Instance(object) => self
                .adapt_object(object, key, None)
                .ok_or_else(|| BeanError::BeanNotOfRequiredType {
                    name: name.clone(),
                    required_type: key.name.to_string(),
                    actual_type: self.type_name_of(object),
                })?,
            Candidate::Pending => self.get_bean_of_type(name, key)?,
        };
        autowired_names.push(name.clone());
        Ok(Some(object))
    }
}
