//! bean 定义注册表与定义合并
//!
//! 定义按注册顺序保存；合并结果按名称缓存，同一名称并发合并时只会产生一个
//! [`RootBeanDefinition`]。

use dashmap::DashMap;
use di_abstractions::{BeanClassRef, BeanDefinition, ClassRegistry, RootBeanDefinition};
use infrastructure_common::{BeanError, BeanResult, SCOPE_SINGLETON};
use parking_lot::{ReentrantMutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// 定义与别名的存储
pub struct DefaultBeanDefinitionRegistry {
    definitions: RwLock<HashMap<String, BeanDefinition>>,
    names: RwLock<Vec<String>>,
    aliases: RwLock<HashMap<String, String>>,
    merged: DashMap<String, Arc<RootBeanDefinition>>,
    merge_lock: ReentrantMutex<()>,
}

impl DefaultBeanDefinitionRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
            names: RwLock::new(Vec::new()),
            aliases: RwLock::new(HashMap::new()),
            merged: DashMap::new(),
            merge_lock: ReentrantMutex::new(()),
        }
    }

    /// 注册定义，返回被覆盖的旧定义
    pub fn register(
        &self,
        name: &str,
        definition: BeanDefinition,
        allow_overriding: bool,
    ) -> BeanResult<Option<BeanDefinition>> {
        if name.is_empty() {
            return Err(BeanError::DefinitionValidation {
                name: name.to_string(),
                message: "bean 名称不能为空".to_string(),
            });
        }
        definition
            .validate()
            .map_err(|message| BeanError::DefinitionValidation {
                name: name.to_string(),
                message,
            })?;

        if let Some(target) = self.aliases.read().get(name).cloned() {
            if !allow_overriding {
                return Err(BeanError::DefinitionOverride {
                    name: name.to_string(),
                    existing: format!("指向 '{}' 的别名", target),
                });
            }
        }
        self.aliases.write().remove(name);

        let mut definitions = self.definitions.write();
        let previous = match definitions.get(name) {
            Some(existing) if !allow_overriding => {
                return Err(BeanError::DefinitionOverride {
                    name: name.to_string(),
                    existing: existing.class_name().unwrap_or("<无类>").to_string(),
                });
            }
            Some(existing) => {
                info!("覆盖 bean 定义 '{}'", name);
                Some(existing.clone())
            }
            None => None,
        };
        definitions.insert(name.to_string(), definition);
        drop(definitions);

        if previous.is_none() {
            self.names.write().push(name.to_string());
        }
        debug!("注册 bean 定义 '{}'", name);
        Ok(previous)
    }

    /// 移除定义，同时清除其合并缓存
    pub fn remove(&self, name: &str) -> BeanResult<BeanDefinition> {
        let removed = self
            .definitions
            .write()
            .remove(name)
            .ok_or_else(|| BeanError::NoSuchBeanDefinition {
                name: name.to_string(),
            })?;
        self.names.write().retain(|n| n != name);
        debug!("移除 bean 定义 '{}'", name);
        Ok(removed)
    }

    /// 取得原始定义
    pub fn get(&self, name: &str) -> BeanResult<BeanDefinition> {
        self.definitions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BeanError::NoSuchBeanDefinition {
                name: name.to_string(),
            })
    }

    /// 写时复制地修改定义
    pub fn update(
        &self,
        name: &str,
        mutator: &mut dyn FnMut(&mut BeanDefinition) -> BeanResult<()>,
    ) -> BeanResult<()> {
        let mut copy = self.get(name)?;
        mutator(&mut copy)?;
        copy.validate()
            .map_err(|message| BeanError::DefinitionValidation {
                name: name.to_string(),
                message,
            })?;
        self.definitions.write().insert(name.to_string(), copy);
        Ok(())
    }

    /// 是否存在该名称的定义
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    /// 按注册顺序返回定义名称
    pub fn names(&self) -> Vec<String> {
        self.names.read().clone()
    }

    /// 定义数量
    pub fn count(&self) -> usize {
        self.names.read().len()
    }

    /// 注册别名，拒绝别名循环
    pub fn register_alias(&self, name: &str, alias: &str, allow_overriding: bool) -> BeanResult<()> {
        if alias == name {
            self.aliases.write().remove(alias);
            return Ok(());
        }
        if self.contains(alias) {
            return Err(BeanError::DefinitionStore {
                name: alias.to_string(),
                message: format!("别名 '{}' 与已有 bean 名称冲突", alias),
            });
        }
        if let Some(existing) = self.aliases.read().get(alias) {
            if existing == name {
                return Ok(());
            }
            if !allow_overriding {
                return Err(BeanError::DefinitionOverride {
                    name: alias.to_string(),
                    existing: format!("指向 '{}' 的别名", existing),
                });
            }
        }
        if self.canonical_name(name) == alias || self.resolves_through(name, alias) {
            return Err(BeanError::DefinitionStore {
                name: alias.to_string(),
                message: format!("不能为 '{}' 注册别名 '{}': 会形成别名循环", name, alias),
            });
        }
        self.aliases
            .write()
            .insert(alias.to_string(), name.to_string());
        trace!("注册别名 '{}' -> '{}'", alias, name);
        Ok(())
    }

    fn resolves_through(&self, name: &str, alias: &str) -> bool {
        let aliases = self.aliases.read();
        let mut current = name;
        let mut seen = HashSet::new();
        while let Some(next) = aliases.get(current) {
            if next == alias {
                return true;
            }
            if !seen.insert(next.clone()) {
                return true;
            }
            current = next.as_str();
        }
        false
    }

    /// 移除别名
    pub fn remove_alias(&self, alias: &str) -> BeanResult<()> {
        self.aliases
            .write()
            .remove(alias)
            .map(|_| ())
            .ok_or_else(|| BeanError::illegal_state(format!("别名 '{}' 未注册", alias)))
    }

    /// 是否为别名
    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.read().contains_key(name)
    }

    /// 指向该名称的所有别名（包括链式别名）
    pub fn aliases_of(&self, name: &str) -> Vec<String> {
        let aliases = self.aliases.read();
        let mut result = Vec::new();
        let mut pending = vec![name.to_string()];
        while let Some(target) = pending.pop() {
            let mut direct: Vec<&String> = aliases
                .iter()
                .filter(|(_, t)| **t == target)
                .map(|(alias, _)| alias)
                .collect();
            direct.sort();
            for alias in direct {
                if !result.contains(alias) && alias != name {
                    result.push(alias.clone());
                    pending.push(alias.clone());
                }
            }
        }
        result
    }

    /// 沿别名链解析出规范名称
    pub fn canonical_name(&self, name: &str) -> String {
        let aliases = self.aliases.read();
        let mut current = name;
        let mut hops = 0;
        while let Some(next) = aliases.get(current) {
            current = next.as_str();
            hops += 1;
            if hops > aliases.len() {
                break;
            }
        }
        current.to_string()
    }

    /// 合并后的定义；`cache` 为 false 时结果不进入缓存
    pub fn merged(
        &self,
        name: &str,
        classes: &dyn ClassRegistry,
        cache: bool,
    ) -> BeanResult<Arc<RootBeanDefinition>> {
        if let Some(root) = self.cached_merged(name) {
            return Ok(root);
        }

        let _guard = self.merge_lock.lock();
        if let Some(root) = self.cached_merged(name) {
            return Ok(root);
        }

        let definition = self.get(name)?;
        let mut flattened = self.flatten(name, definition)?;
        if flattened.scope.is_empty() {
            flattened.scope = SCOPE_SINGLETON.to_string();
        }
        let root = Arc::new(RootBeanDefinition::new(name, flattened));
        Self::resolve_class_of(&root, classes)?;

        if cache {
            self.merged.insert(name.to_string(), root.clone());
        }
        trace!("合并 bean 定义 '{}'", name);
        Ok(root)
    }

    /// 合并内部 bean 定义（不缓存），单例内部 bean 继承非单例外部 bean 的作用域
    pub fn merged_inner(
        &self,
        name: &str,
        definition: &BeanDefinition,
        containing: &RootBeanDefinition,
        classes: &dyn ClassRegistry,
    ) -> BeanResult<Arc<RootBeanDefinition>> {
        let mut flattened = self.flatten(name, definition.clone())?;
        if flattened.scope.is_empty() {
            flattened.scope = SCOPE_SINGLETON.to_string();
        }
        if !containing.is_singleton() && flattened.is_singleton() {
            flattened.scope = containing.scope().to_string();
        }
        let root = Arc::new(RootBeanDefinition::new(name, flattened));
        Self::resolve_class_of(&root, classes)?;
        Ok(root)
    }

    fn cached_merged(&self, name: &str) -> Option<Arc<RootBeanDefinition>> {
        self.merged
            .get(name)
            .map(|entry| entry.value().clone())
            .filter(|root| !root.is_stale())
    }

    fn flatten(&self, name: &str, definition: BeanDefinition) -> BeanResult<BeanDefinition> {
        let mut chain = vec![definition];
        let mut visited = HashSet::from([name.to_string()]);
        while let Some(parent_name) = chain.last().and_then(|d| d.parent_name.clone()) {
            let canonical = self.canonical_name(&parent_name);
            if !visited.insert(canonical.clone()) {
                return Err(BeanError::DefinitionStore {
                    name: name.to_string(),
                    message: format!("父定义 '{}' 形成循环", parent_name),
                });
            }
            let parent = self.get(&canonical).map_err(|_| BeanError::NoSuchBeanDefinition {
                name: parent_name.clone(),
            })?;
            chain.push(parent);
        }

        let mut ancestors = chain.into_iter().rev();
        let mut merged = ancestors
            .next()
            .ok_or_else(|| BeanError::illegal_state("定义链为空"))?;
        for child in ancestors {
            merged.override_from(&child);
        }
        merged.parent_name = None;
        Ok(merged)
    }

    fn resolve_class_of(root: &RootBeanDefinition, classes: &dyn ClassRegistry) -> BeanResult<()> {
        let class = match &root.definition().bean_class {
            Some(BeanClassRef::Resolved(class)) => Some(class.clone()),
            Some(BeanClassRef::Name(class_name)) => classes.resolve_class(class_name),
            None => None,
        };
        if let Some(class) = class {
            root.definition()
                .validate_method_overrides(root.name(), &class)?;
            root.set_resolved_class(class);
        }
        Ok(())
    }

    /// 清除名称及其子定义的合并缓存，返回受影响的名称
    pub fn reset_merged(&self, name: &str) -> Vec<String> {
        let mut affected = vec![name.to_string()];
        let mut index = 0;
        while index < affected.len() {
            let current = affected[index].clone();
            if let Some((_, root)) = self.merged.remove(&current) {
                root.mark_stale();
            }
            let children: Vec<String> = self
                .definitions
                .read()
                .iter()
                .filter(|(child, d)| {
                    d.parent_name
                        .as_deref()
                        .is_some_and(|p| self.canonical_name(p) == current)
                        && !affected.contains(child)
                })
                .map(|(child, _)| child.clone())
                .collect();
            affected.extend(children);
            index += 1;
        }
        affected
    }

    /// 只保留满足条件的合并定义
    pub fn retain_merged(&self, keep: impl Fn(&str) -> bool) {
        self.merged.retain(|name, root| {
            let retained = keep(name);
            if !retained {
                root.mark_stale();
            }
            retained
        });
    }

    /// 清空合并定义缓存
    pub fn clear_merged(&self) {
        self.retain_merged(|_| false);
    }
}

impl Default for DefaultBeanDefinitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_registry::DefaultClassRegistry;
    use di_abstractions::{BeanValue, ClassBuilder};
    use infrastructure_common::SCOPE_PROTOTYPE;

    #[derive(Default)]
    struct Plain;

    fn classes() -> DefaultClassRegistry {
        DefaultClassRegistry::with_classes([ClassBuilder::<Plain>::new().default_constructor().build()])
    }

    #[test]
    fn test_registration_order_and_override() {
        let registry = DefaultBeanDefinitionRegistry::new();
        registry.register("b", BeanDefinition::for_class_name("Plain"), true).unwrap();
        registry.register("a", BeanDefinition::for_class_name("Plain"), true).unwrap();
        let previous = registry
            .register("b", BeanDefinition::for_class_name("Other"), true)
            .unwrap();

        assert!(previous.is_some());
        assert_eq!(registry.names(), vec!["b", "a"]);
        assert_eq!(registry.get("b").unwrap().class_name(), Some("Other"));

        let err = registry
            .register("a", BeanDefinition::new(), false)
            .unwrap_err();
        assert!(matches!(err, BeanError::DefinitionOverride { .. }));
    }

    #[test]
    fn test_alias_chain_and_cycle() {
        let registry = DefaultBeanDefinitionRegistry::new();
        registry.register("dataSource", BeanDefinition::new(), true).unwrap();
        registry.register_alias("dataSource", "ds", true).unwrap();
        registry.register_alias("ds", "db", true).unwrap();

        assert_eq!(registry.canonical_name("db"), "dataSource");
        assert_eq!(registry.aliases_of("dataSource"), vec!["ds", "db"]);
        assert!(registry.register_alias("db", "dataSource", true).is_err());
        assert!(registry.register_alias("ds", "ds", true).is_ok());
        assert!(!registry.is_alias("ds"));
    }

    #[test]
    fn test_alias_cycle_rejected() {
        let registry = DefaultBeanDefinitionRegistry::new();
        registry.register_alias("x", "y", true).unwrap();
        let err = registry.register_alias("y", "x", true).unwrap_err();
        assert!(matches!(err, BeanError::DefinitionStore { .. }));
    }

    #[test]
    fn test_merge_parent_chain() {
        let registry = DefaultBeanDefinitionRegistry::new();
        registry
            .register(
                "template",
                BeanDefinition::for_class_name("Plain")
                    .with_abstract(true)
                    .with_prototype_scope()
                    .with_property("timeout", BeanValue::literal(30)),
                true,
            )
            .unwrap();
        registry
            .register(
                "child",
                BeanDefinition::child("template").with_property("retries", BeanValue::literal(3)),
                true,
            )
            .unwrap();

        let merged = registry.merged("child", &classes(), true).unwrap();
        assert!(!merged.is_abstract());
        assert!(merged.is_prototype());
        assert!(merged.resolved_class().is_some());
        assert_eq!(merged.definition().property_values.len(), 2);

        let again = registry.merged("child", &classes(), true).unwrap();
        assert!(Arc::ptr_eq(&merged, &again));

        let affected = registry.reset_merged("template");
        assert_eq!(affected, vec!["template", "child"]);
        assert!(merged.is_stale());
        let fresh = registry.merged("child", &classes(), true).unwrap();
        assert!(!Arc::ptr_eq(&merged, &fresh));
    }

    #[test]
    fn test_missing_parent_is_not_found() {
        let registry = DefaultBeanDefinitionRegistry::new();
        registry
            .register("orphan", BeanDefinition::child("ghost"), true)
            .unwrap();
        let err = registry.merged("orphan", &classes(), true).unwrap_err();
        assert!(matches!(err, BeanError::NoSuchBeanDefinition { ref name } if name == "ghost"));
    }

    #[test]
    fn test_lookup_override_validated_against_class() {
        let registry = DefaultBeanDefinitionRegistry::new();
        registry
            .register(
                "bad",
                BeanDefinition::for_class_name("Plain").with_lookup_method("create", None),
                true,
            )
            .unwrap();
        let err = registry.merged("bad", &classes(), true).unwrap_err();
        assert!(matches!(err, BeanError::DefinitionValidation { .. }));
    }

    #[test]
    fn test_inner_bean_inherits_prototype_scope() {
        let registry = DefaultBeanDefinitionRegistry::new();
        let outer = RootBeanDefinition::new(
            "outer",
            BeanDefinition::for_class_name("Plain").with_scope(SCOPE_PROTOTYPE),
        );
        let inner = registry
            .merged_inner("inner#1", &BeanDefinition::for_class_name("Plain"), &outer, &classes())
            .unwrap();
        assert!(inner.is_prototype());
    }
}
