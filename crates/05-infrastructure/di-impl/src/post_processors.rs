//! 后置处理器注册与编排
//!
//! 实例后置处理器按 (结构性, 排序层级, 排序值, 注册序号) 排列，并按能力分组缓存；
//! 元数据后置处理器由 [`invoke_bean_factory_post_processors`] 在任何实例创建之前
//! 分阶段执行，直到不再出现新的注册表后置处理器为止。

use di_abstractions::{
    downcast_view, BeanDefinitionRegistry, BeanDefinitionRegistryPostProcessor, BeanFactoryPostProcessor,
    BeanPostProcessor, BeanRole, ClassDescriptor, ClassRegistry, ConfigurableListableBeanFactory,
    DestructionAwareBeanPostProcessor, FactoryPostProcessor, MergedBeanDefinitionPostProcessor,
    RootBeanDefinition,
};
use infrastructure_common::{sort_by_precedence, BeanObject, BeanResult, Precedence, TypeKey};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

struct Registered {
    processor: Arc<dyn BeanPostProcessor>,
    seq: u64,
}

impl Registered {
    fn sort_key(&self) -> (bool, u8, i32, u64) {
        let precedence = self.processor.precedence();
        (
            self.processor.is_internal(),
            precedence.tier(),
            precedence.order(),
            self.seq,
        )
    }
}

/// 按能力分组的处理器快照
#[derive(Default)]
pub(crate) struct PostProcessorCache {
    pub(crate) all: Vec<Arc<dyn BeanPostProcessor>>,
    pub(crate) instantiation_aware: Vec<Arc<dyn BeanPostProcessor>>,
    pub(crate) smart: Vec<Arc<dyn BeanPostProcessor>>,
    pub(crate) merged: Vec<Arc<dyn BeanPostProcessor>>,
    pub(crate) destruction: Vec<Arc<dyn BeanPostProcessor>>,
}

#[derive(Default)]
pub(crate) struct PostProcessorRegistry {
    entries: RwLock<Vec<Registered>>,
    next_seq: AtomicU64,
    cache: RwLock<Option<Arc<PostProcessorCache>>>,
}

fn same_processor(a: &Arc<dyn BeanPostProcessor>, b: &Arc<dyn BeanPostProcessor>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl PostProcessorRegistry {
    /// 添加处理器；同一实例再次添加时移动到新的位置
    pub(crate) fn add(&self, processor: Arc<dyn BeanPostProcessor>) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.write();
        entries.retain(|entry| !same_processor(&entry.processor, &processor));
        entries.push(Registered { processor, seq });
        entries.sort_by_key(Registered::sort_key);
        *self.cache.write() = None;
    }

    pub(crate) fn count(&self) -> usize {
        self.entries.read().len()
    }

    pub(crate) fn snapshot(&self) -> Arc<PostProcessorCache> {
        if let Some(cache) = self.cache.read().as_ref() {
            return cache.clone();
        }
        let entries = self.entries.read();
        let mut cache = PostProcessorCache::default();
        for entry in entries.iter() {
            let processor = &entry.processor;
            if processor.as_instantiation_aware().is_some() {
                cache.instantiation_aware.push(processor.clone());
            }
            if processor.as_smart_instantiation_aware().is_some() {
                cache.smart.push(processor.clone());
            }
            if processor.as_merged_definition().is_some() {
                cache.merged.push(processor.clone());
            }
            if processor.as_destruction_aware().is_some() {
                cache.destruction.push(processor.clone());
            }
            cache.all.push(processor.clone());
        }
        let cache = Arc::new(cache);
        *self.cache.write() = Some(cache.clone());
        cache
    }
}

fn bean_views<V, F>(factory: &F, names: &[String]) -> BeanResult<Vec<(String, Arc<V>)>>
where
    V: ?Sized + Send + Sync + 'static,
    F: ConfigurableListableBeanFactory,
{
    let key = TypeKey::of::<V>();
    let mut views = Vec::with_capacity(names.len());
    for name in names {
        let object = factory.get_bean_of_type(name, key)?;
        if let Some(view) = downcast_view::<V>(&object) {
            views.push((name.clone(), view));
        }
    }
    Ok(views)
}

/// 执行所有元数据后置处理器
///
/// 顺序：手动传入的注册表处理器 → bean 定义的注册表处理器（优先排序、普通排序、
/// 其余循环到不动点）→ 所有注册表处理器的 `post_process_bean_factory` →
/// 手动传入的普通处理器 → bean 定义的普通处理器（按排序声明）。
pub fn invoke_bean_factory_post_processors<F>(factory: &F, manual: &[FactoryPostProcessor]) -> BeanResult<()>
where
    F: ConfigurableListableBeanFactory,
{
    let registry: &dyn BeanDefinitionRegistry = factory;
    let configurable: &dyn ConfigurableListableBeanFactory = factory;
    let mut processed: HashSet<String> = HashSet::new();
    let mut registry_processors: Vec<Arc<dyn BeanDefinitionRegistryPostProcessor>> = Vec::new();
    let mut regular_processors: Vec<Arc<dyn BeanFactoryPostProcessor>> = Vec::new();

    for processor in manual {
        match processor {
            FactoryPostProcessor::Registry(processor) => {
                processor.post_process_bean_definition_registry(registry)?;
                registry_processors.push(processor.clone());
            }
            FactoryPostProcessor::Regular(processor) => regular_processors.push(processor.clone()),
        }
    }

    let registry_key = TypeKey::of::<dyn BeanDefinitionRegistryPostProcessor>();
    for tier in [Some(0_u8), Some(1), None] {
        loop {
            let names: Vec<String> = factory
                .bean_names_for_type(registry_key, true, false)
                .into_iter()
                .filter(|name| !processed.contains(name))
                .collect();
            let mut current = bean_views::<dyn BeanDefinitionRegistryPostProcessor, _>(factory, &names)?;
            current.retain(|(_, p)| tier.map_or(true, |t| p.precedence().tier() == t));
            if current.is_empty() {
                break;
            }
            sort_by_precedence(&mut current, |(_, p)| p.precedence());
            for (name, processor) in current {
                debug!("执行注册表后置处理器 '{}'", name);
                processor.post_process_bean_definition_registry(registry)?;
                processed.insert(name);
                registry_processors.push(processor);
            }
            if tier.is_some() {
                break;
            }
        }
    }

    for processor in &registry_processors {
        processor.post_process_bean_factory(configurable)?;
    }
    for processor in &regular_processors {
        processor.post_process_bean_factory(configurable)?;
    }

    let names: Vec<String> = factory
        .bean_names_for_type(TypeKey::of::<dyn BeanFactoryPostProcessor>(), true, false)
        .into_iter()
        .filter(|name| !processed.contains(name))
        .collect();
    let mut bean_processors = bean_views::<dyn BeanFactoryPostProcessor, _>(factory, &names)?;
    sort_by_precedence(&mut bean_processors, |(_, p)| p.precedence());
    for (name, processor) in &bean_processors {
        debug!("执行元数据后置处理器 '{}'", name);
        processor.post_process_bean_factory(configurable)?;
    }

    info!(
        "元数据后置处理完成: {} 个注册表处理器, {} 个普通处理器",
        registry_processors.len(),
        regular_processors.len() + bean_processors.len()
    );
    factory.clear_metadata_cache();
    Ok(())
}

/// 实例化 bean 定义中的实例后置处理器并注册到工厂
///
/// 结构性处理器在最后重新注册，保证排在链尾。
pub fn register_bean_post_processors<F>(factory: &Arc<F>) -> BeanResult<()>
where
    F: ConfigurableListableBeanFactory + 'static,
{
    let names = factory.bean_names_for_type(TypeKey::of::<dyn BeanPostProcessor>(), true, false);
    let expected = factory.bean_post_processor_count() + 1 + names.len();
    factory.add_bean_post_processor(Arc::new(BeanPostProcessorChecker {
        factory: Arc::downgrade(factory),
        expected,
    }));

    let mut processors = bean_views::<dyn BeanPostProcessor, _>(factory.as_ref(), &names)?;
    sort_by_precedence(&mut processors, |(_, p)| p.precedence());

    let mut internal = Vec::new();
    for (name, processor) in processors {
        trace!("注册实例后置处理器 '{}'", name);
        if processor.is_internal() {
            internal.push(processor.clone());
        }
        factory.add_bean_post_processor(processor);
    }
    for processor in internal {
        factory.add_bean_post_processor(processor);
    }
    info!("注册了 {} 个实例后置处理器", names.len());
    Ok(())
}

/// 记录在后置处理器尚未全部注册时就被创建的 bean
struct BeanPostProcessorChecker<F: ?Sized> {
    factory: Weak<F>,
    expected: usize,
}

impl<F> BeanPostProcessor for BeanPostProcessorChecker<F>
where
    F: ConfigurableListableBeanFactory + 'static,
{
    fn post_process_after_initialization(&self, bean: BeanObject, name: &str) -> BeanResult<BeanObject> {
        let Some(factory) = self.factory.upgrade() else {
            return Ok(bean);
        };
        let infrastructure = factory
            .get_merged_bean_definition(name)
            .is_ok_and(|d| d.definition().role == BeanRole::Infrastructure);
        if !infrastructure && factory.bean_post_processor_count() < self.expected {
            info!(
                "bean '{}' 不适合被所有实例后置处理器处理 (例如: 不适合自动代理), 它在处理器全部注册之前就被创建了",
                name
            );
        }
        Ok(bean)
    }
}

/// 收集暴露视图 `L` 的单例 bean，销毁前再移除
pub struct ListenerBeanDetector<L: ?Sized> {
    classes: Arc<dyn ClassRegistry>,
    singleton_names: Mutex<HashMap<String, bool>>,
    listeners: Mutex<Vec<(String, Arc<L>)>>,
    _marker: PhantomData<fn() -> Arc<L>>,
}

impl<L: ?Sized + Send + Sync + 'static> ListenerBeanDetector<L> {
    /// 创建检测器，类注册表用于把 bean 转换为监听器视图
    pub fn new(classes: Arc<dyn ClassRegistry>) -> Self {
        Self {
            classes,
            singleton_names: Mutex::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
            _marker: PhantomData,
        }
    }

    /// 当前登记的监听器
    pub fn listeners(&self) -> Vec<Arc<L>> {
        self.listeners.lock().iter().map(|(_, l)| l.clone()).collect()
    }

    /// 当前登记的监听器名称
    pub fn listener_names(&self) -> Vec<String> {
        self.listeners.lock().iter().map(|(n, _)| n.clone()).collect()
    }

    fn view_of(&self, bean: &BeanObject) -> Option<Arc<L>> {
        self.classes
            .adapt(bean, TypeKey::of::<L>())
            .and_then(|view| downcast_view::<L>(&view))
    }
}

impl<L: ?Sized + Send + Sync + 'static> BeanPostProcessor for ListenerBeanDetector<L> {
    fn post_process_after_initialization(&self, bean: BeanObject, name: &str) -> BeanResult<BeanObject> {
        let Some(listener) = self.view_of(&bean) else {
            return Ok(bean);
        };
        match self.singleton_names.lock().get(name).copied() {
            Some(true) => {
                trace!("检测到监听器 bean '{}'", name);
                let mut listeners = self.listeners.lock();
                listeners.retain(|(n, _)| n != name);
                listeners.push((name.to_string(), listener));
            }
            Some(false) => {
                warn!("监听器 bean '{}' 不是单例, 不会被注册为监听器", name);
            }
            None => {}
        }
        Ok(bean)
    }

    fn is_internal(&self) -> bool {
        true
    }

    fn as_merged_definition(&self) -> Option<&dyn MergedBeanDefinitionPostProcessor> {
        Some(self)
    }

    fn as_destruction_aware(&self) -> Option<&dyn DestructionAwareBeanPostProcessor> {
        Some(self)
    }
}

impl<L: ?Sized + Send + Sync + 'static> MergedBeanDefinitionPostProcessor for ListenerBeanDetector<L> {
    fn post_process_merged_bean_definition(
        &self,
        definition: &RootBeanDefinition,
        class: &Arc<ClassDescriptor>,
        name: &str,
    ) -> BeanResult<()> {
        if class.is_assignable_to(TypeKey::of::<L>()) {
            self.singleton_names
                .lock()
                .insert(name.to_string(), definition.is_singleton());
        }
        Ok(())
    }

    fn reset_bean_definition(&self, name: &str) {
        self.singleton_names.lock().remove(name);
    }
}

impl<L: ?Sized + Send + Sync + 'static> DestructionAwareBeanPostProcessor for ListenerBeanDetector<L> {
    fn post_process_before_destruction(&self, _bean: &BeanObject, name: &str) -> BeanResult<()> {
        self.listeners.lock().retain(|(n, _)| n != name);
        Ok(())
    }

    fn requires_destruction(&self, bean: &BeanObject) -> bool {
        self.view_of(bean).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named {
        precedence: Precedence,
        internal: bool,
    }

    impl BeanPostProcessor for Named {
        fn precedence(&self) -> Precedence {
            self.precedence
        }

        fn is_internal(&self) -> bool {
            self.internal
        }
    }

    fn named(precedence: Precedence, internal: bool) -> Arc<dyn BeanPostProcessor> {
        Arc::new(Named { precedence, internal })
    }

    #[test]
    fn test_registry_orders_by_precedence_and_internal_last() {
        let registry = PostProcessorRegistry::default();
        let internal = named(Precedence::PriorityOrdered(0), true);
        let plain = named(Precedence::Unordered, false);
        let ordered = named(Precedence::Ordered(5), false);
        let priority = named(Precedence::PriorityOrdered(9), false);

        for p in [&internal, &plain, &ordered, &priority] {
            registry.add(p.clone());
        }
        let all = registry.snapshot().all.clone();
        let expected = [&priority, &ordered, &plain, &internal];
        assert_eq!(all.len(), 4);
        for (actual, expected) in all.iter().zip(expected) {
            assert!(same_processor(actual, expected));
        }
    }

    #[test]
    fn test_re_adding_moves_processor() {
        let registry = PostProcessorRegistry::default();
        let first = named(Precedence::Unordered, false);
        let second = named(Precedence::Unordered, false);
        registry.add(first.clone());
        registry.add(second.clone());
        let _ = registry.snapshot();
        registry.add(first.clone());

        let all = registry.snapshot().all.clone();
        assert_eq!(registry.count(), 2);
        assert!(same_processor(&all[0], &second));
        assert!(same_processor(&all[1], &first));
    }
}
