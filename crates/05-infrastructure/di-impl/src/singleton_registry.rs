//! 单例注册表
//!
//! 三级缓存：完全初始化的单例、早期引用、早期引用工厂。同一名称任意时刻最多出现在
//! 其中一级，晋升只向“完全初始化”方向进行，移除时三级一起清理。
//!
//! 单例创建由一个全局可重入锁串行化；完全初始化的读取走无锁快路径。

use dashmap::DashMap;
use infrastructure_common::{
    BeanError, BeanObject, BeanResult, DisposableBean, DEFAULT_SUPPRESSED_EXCEPTIONS_LIMIT,
};
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, info, trace, warn};

/// 早期引用工厂
pub type SingletonFactory = Box<dyn FnOnce() -> BeanResult<BeanObject> + Send>;

/// 保持插入顺序的名称集合
#[derive(Debug, Default, Clone)]
pub(crate) struct LinkedNames {
    order: Vec<String>,
    members: HashSet<String>,
}

impl LinkedNames {
    pub(crate) fn insert(&mut self, name: &str) -> bool {
        if self.members.insert(name.to_string()) {
            self.order.push(name.to_string());
            true
        } else {
            false
        }
    }

    pub(crate) fn remove(&mut self, name: &str) -> bool {
        if self.members.remove(name) {
            self.order.retain(|n| n != name);
            true
        } else {
            false
        }
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    pub(crate) fn to_vec(&self) -> Vec<String> {
        self.order.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}

type NameGraph = Mutex<HashMap<String, LinkedNames>>;

/// 默认单例注册表
pub struct DefaultSingletonBeanRegistry {
    singleton_objects: DashMap<String, BeanObject>,
    early_singleton_objects: Mutex<HashMap<String, BeanObject>>,
    singleton_factories: Mutex<HashMap<String, SingletonFactory>>,
    registered_singletons: Mutex<LinkedNames>,
    creation_lock: ReentrantMutex<()>,
    singletons_currently_in_creation: Mutex<HashSet<String>>,
    in_creation_check_exclusions: Mutex<HashSet<String>>,
    suppressed_exceptions: Mutex<Option<Vec<BeanError>>>,
    suppressed_exceptions_limit: AtomicUsize,
    singletons_currently_in_destruction: AtomicBool,
    disposable_beans: Mutex<Vec<(String, Box<dyn DisposableBean>)>>,
    contained_bean_map: NameGraph,
    dependent_bean_map: NameGraph,
    dependencies_for_bean_map: NameGraph,
}

impl DefaultSingletonBeanRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            singleton_objects: DashMap::new(),
            early_singleton_objects: Mutex::new(HashMap::new()),
            singleton_factories: Mutex::new(HashMap::new()),
            registered_singletons: Mutex::new(LinkedNames::default()),
            creation_lock: ReentrantMutex::new(()),
            singletons_currently_in_creation: Mutex::new(HashSet::new()),
            in_creation_check_exclusions: Mutex::new(HashSet::new()),
            suppressed_exceptions: Mutex::new(None),
            suppressed_exceptions_limit: AtomicUsize::new(DEFAULT_SUPPRESSED_EXCEPTIONS_LIMIT),
            singletons_currently_in_destruction: AtomicBool::new(false),
            disposable_beans: Mutex::new(Vec::new()),
            contained_bean_map: Mutex::new(HashMap::new()),
            dependent_bean_map: Mutex::new(HashMap::new()),
            dependencies_for_bean_map: Mutex::new(HashMap::new()),
        }
    }

    /// 设置单次创建最多记录的被抑制错误数
    pub fn set_suppressed_exceptions_limit(&self, limit: usize) {
        self.suppressed_exceptions_limit.store(limit, Ordering::Relaxed);
    }

    /// 手动注册单例，名称已被占用时报错
    pub fn register_singleton(&self, name: &str, object: BeanObject) -> BeanResult<()> {
        let _guard = self.creation_lock.lock();
        if let Some(existing) = self.fully_initialized(name) {
            return Err(BeanError::illegal_state(format!(
                "无法在名称 '{}' 下注册对象 [{:?}]: 已绑定对象 [{:?}]",
                name, object, existing
            )));
        }
        self.add_singleton(name, object);
        Ok(())
    }

    /// 加入完全初始化的缓存，并清除另外两级
    pub fn add_singleton(&self, name: &str, object: BeanObject) {
        let _guard = self.creation_lock.lock();
        self.singleton_objects.insert(name.to_string(), object);
        self.singleton_factories.lock().remove(name);
        self.early_singleton_objects.lock().remove(name);
        self.registered_singletons.lock().insert(name);
    }

    /// 注册早期引用工厂（bean 尚未填充属性）
    pub fn add_singleton_factory(&self, name: &str, factory: SingletonFactory) {
        let _guard = self.creation_lock.lock();
        if !self.singleton_objects.contains_key(name) {
            self.singleton_factories.lock().insert(name.to_string(), factory);
            self.early_singleton_objects.lock().remove(name);
            self.registered_singletons.lock().insert(name);
        }
    }

    fn fully_initialized(&self, name: &str) -> Option<BeanObject> {
        self.singleton_objects.get(name).map(|entry| entry.value().clone())
    }

    /// 查找单例；`allow_early_reference` 为 true 时可以调用早期引用工厂
    pub fn get_singleton(&self, name: &str, allow_early_reference: bool) -> BeanResult<Option<BeanObject>> {
        if let Some(object) = self.fully_initialized(name) {
            return Ok(Some(object));
        }
        if !self.is_singleton_currently_in_creation(name) {
            return Ok(None);
        }
        if let Some(object) = self.early_singleton_objects.lock().get(name).cloned() {
            return Ok(Some(object));
        }
        if !allow_early_reference {
            return Ok(None);
        }

        let _guard = self.creation_lock.lock();
        if let Some(object) = self.fully_initialized(name) {
            return Ok(Some(object));
        }
        if let Some(object) = self.early_singleton_objects.lock().get(name).cloned() {
            return Ok(Some(object));
        }
        let factory = self.singleton_factories.lock().remove(name);
        match factory {
            Some(factory) => {
                let object = factory()?;
                trace!("为单例 '{}' 暴露早期引用", name);
                self.early_singleton_objects
                    .lock()
                    .insert(name.to_string(), object.clone());
                Ok(Some(object))
            }
            None => Ok(None),
        }
    }

    /// 获取单例，不存在时在全局锁内用 `factory` 创建
    pub fn get_or_create<F>(&self, name: &str, factory: F) -> BeanResult<BeanObject>
    where
        F: FnOnce() -> BeanResult<BeanObject>,
    {
        if let Some(object) = self.fully_initialized(name) {
            return Ok(object);
        }

        let _guard = self.creation_lock.lock();
        if let Some(object) = self.fully_initialized(name) {
            return Ok(object);
        }
        if self.singletons_currently_in_destruction.load(Ordering::Acquire) {
            return Err(BeanError::CreationNotAllowed {
                name: name.to_string(),
                message: "工厂中的单例正在销毁，此时不允许创建单例".to_string(),
            });
        }

        debug!("创建单例 bean '{}' 的共享实例", name);
        self.before_singleton_creation(name)?;

        let record_suppressed = {
            let mut suppressed = self.suppressed_exceptions.lock();
            if suppressed.is_none() {
                *suppressed = Some(Vec::new());
                true
            } else {
                false
            }
        };

        let outcome = match factory() {
            Ok(object) => Ok((object, true)),
            Err(err) => match self.fully_initialized(name) {
                Some(object) => {
                    debug!("单例 '{}' 在创建失败时已隐式产生，沿用该实例", name);
                    Ok((object, false))
                }
                None if record_suppressed => {
                    let causes = self.suppressed_exceptions.lock().take().unwrap_or_default();
                    let limit = self.suppressed_exceptions_limit.load(Ordering::Relaxed);
                    Err(err.with_related_causes(causes, limit))
                }
                None => Err(err),
            },
        };

        if record_suppressed {
            *self.suppressed_exceptions.lock() = None;
        }
        self.after_singleton_creation(name)?;

        let (object, new_singleton) = outcome?;
        if new_singleton {
            self.add_singleton(name, object.clone());
        }
        Ok(object)
    }

    /// 记录创建过程中被吞掉的错误
    pub fn on_suppressed_exception(&self, err: BeanError) {
        let limit = self.suppressed_exceptions_limit.load(Ordering::Relaxed);
        if let Some(suppressed) = self.suppressed_exceptions.lock().as_mut() {
            if suppressed.len() < limit {
                suppressed.push(err);
            }
        }
    }

    /// 从三级缓存中移除
    pub fn remove_singleton(&self, name: &str) {
        let _guard = self.creation_lock.lock();
        self.singleton_objects.remove(name);
        self.singleton_factories.lock().remove(name);
        self.early_singleton_objects.lock().remove(name);
        self.registered_singletons.lock().remove(name);
    }

    /// 是否存在完全初始化的单例
    pub fn contains_singleton(&self, name: &str) -> bool {
        self.singleton_objects.contains_key(name)
    }

    /// 按注册顺序返回单例名称
    pub fn singleton_names(&self) -> Vec<String> {
        self.registered_singletons.lock().to_vec()
    }

    /// 单例数量
    pub fn singleton_count(&self) -> usize {
        self.registered_singletons.lock().len()
    }

    /// 将名称排除或纳入“正在创建”检查
    pub fn set_currently_in_creation(&self, name: &str, in_creation: bool) {
        let mut exclusions = self.in_creation_check_exclusions.lock();
        if in_creation {
            exclusions.remove(name);
        } else {
            exclusions.insert(name.to_string());
        }
    }

    /// 单例是否正在创建，排除项不计入
    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        !self.in_creation_check_exclusions.lock().contains(name)
            && self.is_actually_in_creation(name)
    }

    fn is_actually_in_creation(&self, name: &str) -> bool {
        self.is_singleton_currently_in_creation(name)
    }

    /// 单例是否正在创建
    pub fn is_singleton_currently_in_creation(&self, name: &str) -> bool {
        self.singletons_currently_in_creation.lock().contains(name)
    }

    fn before_singleton_creation(&self, name: &str) -> BeanResult<()> {
        if self.in_creation_check_exclusions.lock().contains(name) {
            return Ok(());
        }
        if !self.singletons_currently_in_creation.lock().insert(name.to_string()) {
            return Err(BeanError::currently_in_creation(name));
        }
        Ok(())
    }

    fn after_singleton_creation(&self, name: &str) -> BeanResult<()> {
        if self.in_creation_check_exclusions.lock().contains(name) {
            return Ok(());
        }
        if !self.singletons_currently_in_creation.lock().remove(name) {
            return Err(BeanError::illegal_state(format!("单例 '{}' 并不在创建中", name)));
        }
        Ok(())
    }

    /// 注册需要在关闭时销毁的单例
    pub fn register_disposable_bean(&self, name: &str, bean: Box<dyn DisposableBean>) {
        let mut disposables = self.disposable_beans.lock();
        disposables.retain(|(n, _)| n != name);
        disposables.push((name.to_string(), bean));
    }

    /// 记录内部 bean 与外部 bean 的包含关系
    pub fn register_contained_bean(&self, contained: &str, containing: &str) {
        let added = self
            .contained_bean_map
            .lock()
            .entry(containing.to_string())
            .or_default()
            .insert(contained);
        if added {
            self.register_dependent_bean(contained, containing);
        }
    }

    /// 记录 `dependent` 依赖于 `name`
    pub fn register_dependent_bean(&self, name: &str, dependent: &str) {
        let added = self
            .dependent_bean_map
            .lock()
            .entry(name.to_string())
            .or_default()
            .insert(dependent);
        if added {
            self.dependencies_for_bean_map
                .lock()
                .entry(dependent.to_string())
                .or_default()
                .insert(name);
        }
    }

    /// `dependent` 是否（传递地）依赖于 `name`
    pub fn is_dependent(&self, name: &str, dependent: &str) -> bool {
        let map = self.dependent_bean_map.lock().clone();
        let mut visited = HashSet::new();
        Self::is_dependent_in(&map, name, dependent, &mut visited)
    }

    fn is_dependent_in(
        map: &HashMap<String, LinkedNames>,
        name: &str,
        dependent: &str,
        visited: &mut HashSet<String>,
    ) -> bool {
        if !visited.insert(name.to_string()) {
            return false;
        }
        let Some(dependents) = map.get(name) else {
            return false;
        };
        if dependents.contains(dependent) {
            return true;
        }
        dependents
            .to_vec()
            .iter()
            .any(|transitive| Self::is_dependent_in(map, transitive, dependent, visited))
    }

    /// 是否有 bean 依赖它
    pub fn has_dependent_bean(&self, name: &str) -> bool {
        self.dependent_bean_map
            .lock()
            .get(name)
            .is_some_and(|d| !d.is_empty())
    }

    /// 依赖它的 bean
    pub fn dependent_beans(&self, name: &str) -> Vec<String> {
        self.dependent_bean_map
            .lock()
            .get(name)
            .map(LinkedNames::to_vec)
            .unwrap_or_default()
    }

    /// 它依赖的 bean
    pub fn dependencies_for_bean(&self, name: &str) -> Vec<String> {
        self.dependencies_for_bean_map
            .lock()
            .get(name)
            .map(LinkedNames::to_vec)
            .unwrap_or_default()
    }

    /// 是否正在销毁全部单例
    pub fn is_in_destruction(&self) -> bool {
        self.singletons_currently_in_destruction.load(Ordering::Acquire)
    }

    /// 按注册的逆序销毁所有单例
    pub fn destroy_singletons(&self) {
        info!("销毁单例注册表中的所有单例");
        self.singletons_currently_in_destruction
            .store(true, Ordering::Release);

        let names: Vec<String> = self
            .disposable_beans
            .lock()
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        for name in names.iter().rev() {
            self.destroy_singleton(name);
        }

        self.contained_bean_map.lock().clear();
        self.dependent_bean_map.lock().clear();
        self.dependencies_for_bean_map.lock().clear();
        self.clear_singleton_cache();
    }

    fn clear_singleton_cache(&self) {
        let _guard = self.creation_lock.lock();
        self.singleton_objects.clear();
        self.singleton_factories.lock().clear();
        self.early_singleton_objects.lock().clear();
        self.registered_singletons.lock().clear();
        self.singletons_currently_in_destruction
            .store(false, Ordering::Release);
    }

    /// 销毁单个单例：先销毁依赖它的 bean，再销毁自身和它包含的内部 bean
    pub fn destroy_singleton(&self, name: &str) {
        self.remove_singleton(name);
        let disposable = {
            let mut disposables = self.disposable_beans.lock();
            disposables
                .iter()
                .position(|(n, _)| n == name)
                .map(|index| disposables.remove(index).1)
        };
        self.destroy_bean(name, disposable);
    }

    fn destroy_bean(&self, name: &str, bean: Option<Box<dyn DisposableBean>>) {
        let dependents = self.dependent_bean_map.lock().remove(name);
        if let Some(dependents) = dependents {
            trace!("在销毁 bean '{}' 之前先销毁依赖它的 bean: {:?}", name, dependents.to_vec());
            for dependent in dependents.to_vec() {
                self.destroy_singleton(&dependent);
            }
        }

        if let Some(bean) = bean {
            match catch_unwind(AssertUnwindSafe(|| bean.destroy())) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("销毁名为 '{}' 的 bean 失败: {:#}", name, err),
                Err(_) => warn!("销毁名为 '{}' 的 bean 时发生 panic", name),
            }
        }

        let contained = self.contained_bean_map.lock().remove(name);
        if let Some(contained) = contained {
            for contained_name in contained.to_vec() {
                self.destroy_singleton(&contained_name);
            }
        }

        {
            let mut dependent_map = self.dependent_bean_map.lock();
            dependent_map.retain(|_, dependents| {
                dependents.remove(name);
                !dependents.is_empty()
            });
        }
        self.dependencies_for_bean_map.lock().remove(name);
    }
}

impl Default for DefaultSingletonBeanRegistry {
    fn default() -> Self {
        Self::new()
    }
}
