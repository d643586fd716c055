//! 默认的可枚举 bean 工厂
//!
//! [`DefaultListableBeanFactory`] 组合了定义注册表、单例注册表、类注册表和后置处理器链，
//! 实现全部工厂接口。工厂总是以 `Arc` 持有，内部通过弱引用把自己交给感知回调和
//! 早期引用工厂。

use crate::config::{BeanFactoryConfig, WrappedReferencePolicy};
use crate::converter::SimpleTypeConverter;
use crate::definition_registry::DefaultBeanDefinitionRegistry;
use crate::disposable::DisposableBeanAdapter;
use crate::instantiation::MethodInjectingInstantiationStrategy;
use crate::post_processors::{
    invoke_bean_factory_post_processors, register_bean_post_processors, PostProcessorRegistry,
};
use crate::singleton_registry::DefaultSingletonBeanRegistry;
use crate::wrapper::BeanWrapper;
use di_abstractions::{
    AliasRegistry, AutowireCandidateResolver, AutowireCapableBeanFactory, AutowireMode, BeanDefinition,
    BeanClassRef, BeanDefinitionRegistry, BeanFactory, BeanPostProcessor, ClassDescriptor, ClassRegistry,
    ConfigurableBeanFactory, ConfigurableListableBeanFactory, DependencyDescriptor, FactoryPostProcessor,
    HierarchicalBeanFactory,
    InstantiationStrategy, ListableBeanFactory, QualifierAutowireCandidateResolver, RootBeanDefinition, Scope,
    SingletonBeanRegistry, StringValueResolver, TypeConverter,
};
use infrastructure_common::{
    BeanError, BeanObject, BeanResult, DisposableBean, TypeKey, SCOPE_PROTOTYPE, SCOPE_SINGLETON,
};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::ThreadId;
use tracing::{debug, info, trace, warn};

/// 默认 bean 工厂
pub struct DefaultListableBeanFactory {
    pub(crate) self_ref: Weak<Self>,
    config: RwLock<BeanFactoryConfig>,
    pub(crate) classes: Arc<dyn ClassRegistry>,
    pub(crate) singletons: DefaultSingletonBeanRegistry,
    pub(crate) definitions: DefaultBeanDefinitionRegistry,
    pub(crate) post_processors: PostProcessorRegistry,
    scopes: RwLock<Vec<(String, Arc<dyn Scope>)>>,
    embedded_resolvers: RwLock<Vec<Arc<dyn StringValueResolver>>>,
    converter: RwLock<Arc<dyn TypeConverter>>,
    instantiation_strategy: RwLock<Arc<dyn InstantiationStrategy>>,
    pub(crate) candidate_resolver: RwLock<Arc<dyn AutowireCandidateResolver>>,
    pub(crate) resolvable_dependencies: RwLock<Vec<(TypeKey, BeanObject)>>,
    pub(crate) ignored_types: RwLock<HashSet<TypeId>>,
    pub(crate) prototypes_in_creation: DashMap<ThreadId, HashSet<String>>,
    pub(crate) already_created: Mutex<HashSet<String>>,
    pub(crate) parent: RwLock<Option<Arc<dyn BeanFactory>>>,
    pub(crate) closed: AtomicBool,
    pub(crate) inner_bean_counter: AtomicUsize,
    frozen: AtomicBool,
    pub(crate) by_type_cache: DashMap<(TypeId, bool), Vec<String>>,
}

impl DefaultListableBeanFactory {
    /// 使用默认配置创建工厂
    pub fn new(classes: Arc<dyn ClassRegistry>) -> Arc<Self> {
        Self::with_config(classes, BeanFactoryConfig::default())
    }

    /// 使用给定配置创建工厂
    pub fn with_config(classes: Arc<dyn ClassRegistry>, config: BeanFactoryConfig) -> Arc<Self> {
        info!("创建 bean 工厂");
        Arc::new_cyclic(|self_ref| {
            let singletons = DefaultSingletonBeanRegistry::new();
            singletons.set_suppressed_exceptions_limit(config.suppressed_exceptions_limit);
            Self {
                self_ref: self_ref.clone(),
                config: RwLock::new(config),
                classes,
                singletons,
                definitions: DefaultBeanDefinitionRegistry::new(),
                post_processors: PostProcessorRegistry::default(),
                scopes: RwLock::new(Vec::new()),
                embedded_resolvers: RwLock::new(Vec::new()),
                converter: RwLock::new(Arc::new(SimpleTypeConverter::new())),
                instantiation_strategy: RwLock::new(Arc::new(MethodInjectingInstantiationStrategy)),
                candidate_resolver: RwLock::new(Arc::new(QualifierAutowireCandidateResolver)),
                resolvable_dependencies: RwLock::new(Vec::new()),
                ignored_types: RwLock::new(HashSet::new()),
                prototypes_in_creation: DashMap::new(),
                already_created: Mutex::new(HashSet::new()),
                parent: RwLock::new(None),
                closed: AtomicBool::new(false),
                inner_bean_counter: AtomicUsize::new(0),
                frozen: AtomicBool::new(false),
                by_type_cache: DashMap::new(),
            }
        })
    }

    /// 当前配置的副本
    pub fn config(&self) -> BeanFactoryConfig {
        self.config.read().clone()
    }

    /// 设置是否允许覆盖定义
    pub fn set_allow_bean_definition_overriding(&self, allow: bool) {
        self.config.write().allow_bean_definition_overriding = allow;
    }

    /// 设置是否允许循环引用
    pub fn set_allow_circular_references(&self, allow: bool) {
        self.config.write().allow_circular_references = allow;
    }

    /// 设置早期引用被包装时的处理策略
    pub fn set_wrapped_reference_policy(&self, policy: WrappedReferencePolicy) {
        self.config.write().wrapped_reference_policy = policy;
    }

    /// 替换实例化策略
    pub fn set_instantiation_strategy(&self, strategy: Arc<dyn InstantiationStrategy>) {
        *self.instantiation_strategy.write() = strategy;
    }

    pub(crate) fn instantiation_strategy(&self) -> Arc<dyn InstantiationStrategy> {
        self.instantiation_strategy.read().clone()
    }

    /// 替换自动装配候选解析器
    pub fn set_autowire_candidate_resolver(&self, resolver: Arc<dyn AutowireCandidateResolver>) {
        *self.candidate_resolver.write() = resolver;
    }

    /// 类注册表
    pub fn classes(&self) -> &Arc<dyn ClassRegistry> {
        &self.classes
    }

    /// 注册类并手动注册一个单例
    pub fn register_singleton_of_class(
        &self,
        name: &str,
        object: BeanObject,
        class: Arc<ClassDescriptor>,
    ) -> BeanResult<()> {
        self.classes.register_class(class);
        self.register_singleton(name, object)
    }

    /// 工厂是否已经关闭
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 启动流程：元数据后置处理器、注册实例后置处理器、冻结配置、预实例化单例
    ///
    /// 预实例化失败时销毁已经创建的单例后返回错误。
    pub fn refresh(self: &Arc<Self>, factory_post_processors: &[FactoryPostProcessor]) -> BeanResult<()> {
        invoke_bean_factory_post_processors(self.as_ref(), factory_post_processors)?;
        register_bean_post_processors(self)?;
        self.freeze_configuration();
        if let Err(e) = self.pre_instantiate_singletons() {
            warn!("预实例化单例失败, 销毁已创建的单例: {}", e);
            self.singletons.destroy_singletons();
            return Err(e);
        }
        info!("bean 工厂启动完成, 共 {} 个单例", self.singletons.singleton_count());
        Ok(())
    }

    /// 关闭工厂：拒绝新的创建，结束自定义作用域，销毁所有单例
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("关闭 bean 工厂");
        let scopes = self.scopes.read().clone();
        for (name, scope) in scopes {
            debug!("关闭作用域 '{}'", name);
            scope.close();
        }
        self.singletons.destroy_singletons();
        self.by_type_cache.clear();
    }

    pub(crate) fn owner(&self) -> BeanResult<Arc<dyn BeanFactory>> {
        self.self_ref
            .upgrade()
            .map(|factory| factory as Arc<dyn BeanFactory>)
            .ok_or_else(|| BeanError::illegal_state("bean 工厂已经释放"))
    }

    pub(crate) fn merged(&self, name: &str) -> BeanResult<Arc<RootBeanDefinition>> {
        let cache = self.config.read().cache_bean_metadata;
        self.definitions.merged(name, self.classes.as_ref(), cache)
    }

    pub(crate) fn ensure_class_registered(&self, class: &Arc<ClassDescriptor>) {
        if self.classes.descriptor_for_instance(class.instance_type()).is_none() {
            self.classes.register_class(class.clone());
        }
    }

    /// 实例对应的类描述符：优先使用定义中已解析的类
    pub(crate) fn class_of(
        &self,
        object: &BeanObject,
        definition: Option<&RootBeanDefinition>,
    ) -> Option<Arc<ClassDescriptor>> {
        definition
            .and_then(|d| d.resolved_class())
            .filter(|class| class.is_instance(object))
            .or_else(|| self.classes.descriptor_for_instance((**object).type_id()))
    }

    pub(crate) fn adapt_object(
        &self,
        object: &BeanObject,
        key: TypeKey,
        definition: Option<&RootBeanDefinition>,
    ) -> Option<BeanObject> {
        if key.is_instance(&**object) || key.is_view(&**object) {
            return Some(object.clone());
        }
        self.class_of(object, definition)
            .and_then(|class| class.cast(object, key))
    }

    pub(crate) fn type_name_of(&self, object: &BeanObject) -> String {
        self.class_of(object, None)
            .map(|class| class.name().to_string())
            .unwrap_or_else(|| "<未注册的类型>".to_string())
    }

    pub(crate) fn adapt_to(&self, name: &str, object: BeanObject, key: Option<TypeKey>) -> BeanResult<BeanObject> {
        let Some(key) = key else {
            return Ok(object);
        };
        let definition = if self.definitions.contains(name) {
            self.merged(name).ok()
        } else {
            None
        };
        self.adapt_object(&object, key, definition.as_deref())
            .ok_or_else(|| BeanError::BeanNotOfRequiredType {
                name: name.to_string(),
                required_type: key.name.to_string(),
                actual_type: self.type_name_of(&object),
            })
    }

    /// 记录 `dependent` 依赖 `name`（两者都解析别名）
    pub(crate) fn register_dependent(&self, name: &str, dependent: &str) {
        let name = self.definitions.canonical_name(name);
        let dependent = self.definitions.canonical_name(dependent);
        self.singletons.register_dependent_bean(&name, &dependent);
    }

    fn reset_bean_definition(&self, name: &str) {
        let affected = self.definitions.reset_merged(name);
        let processors = self.post_processors.snapshot();
        for bean in affected.iter().map(String::as_str).chain(std::iter::once(name)) {
            self.singletons.destroy_singleton(bean);
            for processor in &processors.merged {
                if let Some(merged) = processor.as_merged_definition() {
                    merged.reset_bean_definition(bean);
                }
            }
        }
        self.by_type_cache.clear();
    }
}

impl BeanFactory for DefaultListableBeanFactory {
    fn get_bean(&self, name: &str) -> BeanResult<BeanObject> {
        self.do_get_bean(name, None, None, false)
    }

    fn get_bean_of_type(&self, name: &str, required_type: TypeKey) -> BeanResult<BeanObject> {
        self.do_get_bean(name, Some(required_type), None, false)
    }

    fn get_bean_with_args(&self, name: &str, args: Vec<BeanObject>) -> BeanResult<BeanObject> {
        self.do_get_bean(name, None, Some(&args), false)
    }

    fn resolve_bean(&self, required_type: TypeKey) -> BeanResult<BeanObject> {
        let descriptor = DependencyDescriptor::new(required_type);
        match self.do_resolve_dependency(&descriptor, None, &mut Vec::new()) {
            Ok(Some(bean)) => Ok(bean),
            Ok(None) => Err(BeanError::NoSuchBeanOfType {
                required_type: required_type.name.to_string(),
                message: "没有匹配的 bean".to_string(),
            }),
            Err(BeanError::NoSuchBeanOfType { required_type: missing, message }) => {
                match self.parent.read().clone() {
                    Some(parent) => parent.resolve_bean(required_type),
                    None => Err(BeanError::NoSuchBeanOfType {
                        required_type: missing,
                        message,
                    }),
                }
            }
            Err(e) => Err(e),
        }
    }

    fn contains_bean(&self, name: &str) -> bool {
        if self.contains_local_bean(name) {
            return true;
        }
        self.parent
            .read()
            .as_ref()
            .is_some_and(|parent| parent.contains_bean(name))
    }

    fn is_singleton(&self, name: &str) -> BeanResult<bool> {
        let bean_name = self.definitions.canonical_name(name);
        if self.definitions.contains(&bean_name) {
            return Ok(self.merged(&bean_name)?.is_singleton());
        }
        if self.singletons.contains_singleton(&bean_name) {
            return Ok(true);
        }
        match self.parent.read().clone() {
            Some(parent) => parent.is_singleton(name),
            None => Err(BeanError::NoSuchBeanDefinition { name: bean_name }),
        }
    }

    fn is_prototype(&self, name: &str) -> BeanResult<bool> {
        let bean_name = self.definitions.canonical_name(name);
        if self.definitions.contains(&bean_name) {
            return Ok(self.merged(&bean_name)?.is_prototype());
        }
        if self.singletons.contains_singleton(&bean_name) {
            return Ok(false);
        }
        match self.parent.read().clone() {
            Some(parent) => parent.is_prototype(name),
            None => Err(BeanError::NoSuchBeanDefinition { name: bean_name }),
        }
    }

    fn is_type_match(&self, name: &str, type_to_match: TypeKey) -> BeanResult<bool> {
        let bean_name = self.definitions.canonical_name(name);
        if self.definitions.contains(&bean_name) {
            let definition = self.merged(&bean_name)?;
            return Ok(self.type_matches(&bean_name, Some(definition.as_ref()), type_to_match, false));
        }
        if self.singletons.contains_singleton(&bean_name) {
            return Ok(self.type_matches(&bean_name, None, type_to_match, false));
        }
        match self.parent.read().clone() {
            Some(parent) => parent.is_type_match(name, type_to_match),
            None => Err(BeanError::NoSuchBeanDefinition { name: bean_name }),
        }
    }

    fn get_type(&self, name: &str) -> BeanResult<Option<TypeKey>> {
        let bean_name = self.definitions.canonical_name(name);
        if let Some(instance) = self.singletons.get_singleton(&bean_name, false)? {
            let definition = self.merged(&bean_name).ok();
            return Ok(Some(
                self.class_of(&instance, definition.as_deref())
                    .map(|class| class.type_key())
                    .unwrap_or(TypeKey::erased((*instance).type_id(), "<unknown>")),
            ));
        }
        if self.definitions.contains(&bean_name) {
            let definition = self.merged(&bean_name)?;
            return Ok(self
                .predict_bean_type(&bean_name, &definition)
                .map(|class| class.type_key()));
        }
        match self.parent.read().clone() {
            Some(parent) => parent.get_type(name),
            None => Err(BeanError::NoSuchBeanDefinition { name: bean_name }),
        }
    }
}

impl ListableBeanFactory for DefaultListableBeanFactory {
    fn bean_names_for_type(
        &self,
        type_key: TypeKey,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> Vec<String> {
        self.names_for_type(type_key, include_non_singletons, allow_eager_init)
    }

    fn beans_of_type(&self, type_key: TypeKey) -> BeanResult<Vec<(String, BeanObject)>> {
        let mut beans = Vec::new();
        for name in self.names_for_type(type_key, true, true) {
            match self.get_bean_of_type(&name, type_key) {
                Ok(bean) => beans.push((name, bean)),
                Err(e)
                    if e.any_cause(|c| {
                        matches!(c, BeanError::CurrentlyInCreation { name: current, .. } if *current == name)
                    }) =>
                {
                    debug!("忽略当前正在创建的 bean '{}': {}", name, e);
                    self.singletons.on_suppressed_exception(e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(beans)
    }
}

impl HierarchicalBeanFactory for DefaultListableBeanFactory {
    fn parent_bean_factory(&self) -> Option<Arc<dyn BeanFactory>> {
        self.parent.read().clone()
    }

    fn contains_local_bean(&self, name: &str) -> bool {
        let bean_name = self.definitions.canonical_name(name);
        self.singletons.contains_singleton(&bean_name) || self.definitions.contains(&bean_name)
    }
}

impl SingletonBeanRegistry for DefaultListableBeanFactory {
    fn register_singleton(&self, name: &str, object: BeanObject) -> BeanResult<()> {
        self.singletons.register_singleton(name, object)?;
        self.by_type_cache.clear();
        Ok(())
    }

    fn get_singleton(&self, name: &str) -> BeanResult<Option<BeanObject>> {
        self.singletons
            .get_singleton(&self.definitions.canonical_name(name), true)
    }

    fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.contains_singleton(name)
    }

    fn singleton_names(&self) -> Vec<String> {
        self.singletons.singleton_names()
    }

    fn singleton_count(&self) -> usize {
        self.singletons.singleton_count()
    }
}

impl ConfigurableBeanFactory for DefaultListableBeanFactory {
    fn set_parent_bean_factory(&self, parent: Arc<dyn BeanFactory>) -> BeanResult<()> {
        let mut current = self.parent.write();
        if let Some(existing) = current.as_ref() {
            if Arc::as_ptr(existing) as *const () != Arc::as_ptr(&parent) as *const () {
                return Err(BeanError::illegal_state("已经关联了另一个父工厂"));
            }
        }
        *current = Some(parent);
        Ok(())
    }

    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        self.post_processors.add(processor);
    }

    fn bean_post_processor_count(&self) -> usize {
        self.post_processors.count()
    }

    fn register_scope(&self, name: &str, scope: Arc<dyn Scope>) -> BeanResult<()> {
        if name == SCOPE_SINGLETON || name == SCOPE_PROTOTYPE {
            return Err(BeanError::illegal_state(format!("不能替换内置作用域 '{}'", name)));
        }
        let mut scopes = self.scopes.write();
        match scopes.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => {
                debug!("替换作用域 '{}'", name);
                entry.1 = scope;
            }
            None => {
                debug!("注册作用域 '{}'", name);
                scopes.push((name.to_string(), scope));
            }
        }
        Ok(())
    }

    fn registered_scope(&self, name: &str) -> Option<Arc<dyn Scope>> {
        self.scopes
            .read()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, scope)| scope.clone())
    }

    fn registered_scope_names(&self) -> Vec<String> {
        self.scopes.read().iter().map(|(n, _)| n.clone()).collect()
    }

    fn add_embedded_value_resolver(&self, resolver: Arc<dyn StringValueResolver>) {
        self.embedded_resolvers.write().push(resolver);
    }

    fn has_embedded_value_resolver(&self) -> bool {
        !self.embedded_resolvers.read().is_empty()
    }

    fn resolve_embedded_value(&self, value: &str) -> BeanResult<String> {
        let resolvers = self.embedded_resolvers.read().clone();
        let mut result = value.to_string();
        for resolver in resolvers {
            result = resolver.resolve_string_value(&result)?;
        }
        Ok(result)
    }

    fn set_type_converter(&self, converter: Arc<dyn TypeConverter>) {
        *self.converter.write() = converter;
    }

    fn type_converter(&self) -> Arc<dyn TypeConverter> {
        self.converter.read().clone()
    }

    fn set_currently_in_creation(&self, name: &str, in_creation: bool) {
        self.singletons.set_currently_in_creation(name, in_creation);
    }

    fn is_currently_in_creation(&self, name: &str) -> bool {
        let bean_name = self.definitions.canonical_name(name);
        self.singletons.is_currently_in_creation(&bean_name) || self.is_prototype_currently_in_creation(&bean_name)
    }

    fn register_dependent_bean(&self, name: &str, dependent: &str) {
        self.register_dependent(name, dependent);
    }

    fn dependent_beans(&self, name: &str) -> Vec<String> {
        self.singletons
            .dependent_beans(&self.definitions.canonical_name(name))
    }

    fn dependencies_for_bean(&self, name: &str) -> Vec<String> {
        self.singletons
            .dependencies_for_bean(&self.definitions.canonical_name(name))
    }

    fn get_merged_bean_definition(&self, name: &str) -> BeanResult<Arc<RootBeanDefinition>> {
        self.merged(&self.definitions.canonical_name(name))
    }

    fn destroy_bean(&self, name: &str, object: BeanObject) {
        let definition = self.merged(&self.definitions.canonical_name(name)).ok();
        let class = self.class_of(&object, definition.as_deref());
        let adapter = DisposableBeanAdapter::new(
            name,
            object,
            class,
            definition.as_deref(),
            &self.post_processors.snapshot().destruction,
        );
        match adapter {
            Ok(adapter) => {
                if let Err(e) = adapter.destroy() {
                    warn!("销毁 bean '{}' 失败: {:#}", name, e);
                }
            }
            Err(e) => warn!("无法销毁 bean '{}': {}", name, e),
        }
    }

    fn destroy_scoped_bean(&self, name: &str) -> BeanResult<()> {
        let bean_name = self.definitions.canonical_name(name);
        let definition = self.merged(&bean_name)?;
        if definition.is_singleton() || definition.is_prototype() {
            return Err(BeanError::illegal_state(format!(
                "bean '{}' 不属于自定义作用域",
                bean_name
            )));
        }
        let scope = self.registered_scope(definition.scope()).ok_or_else(|| {
            BeanError::illegal_state(format!("没有为作用域 '{}' 注册 Scope", definition.scope()))
        })?;
        if let Some(object) = scope.remove(&bean_name) {
            self.destroy_bean(&bean_name, object);
        }
        Ok(())
    }

    fn destroy_singletons(&self) {
        self.singletons.destroy_singletons();
        self.by_type_cache.clear();
    }
}

impl AutowireCapableBeanFactory for DefaultListableBeanFactory {
    fn create_bean(&self, class: Arc<ClassDescriptor>) -> BeanResult<BeanObject> {
        self.ensure_class_registered(&class);
        let name = class.name().to_string();
        let definition = BeanDefinition::for_class(class)
            .with_prototype_scope()
            .with_autowire_mode(AutowireMode::Constructor);
        let root = Arc::new(RootBeanDefinition::new(name.clone(), definition));
        self.create_bean_from_definition(&name, &root, None)
    }

    fn autowire_bean_properties(&self, existing: &BeanObject, mode: AutowireMode) -> BeanResult<()> {
        if mode == AutowireMode::Constructor {
            return Err(BeanError::illegal_state("已有实例不能按构造器自动装配"));
        }
        let class = self.class_of(existing, None).ok_or_else(|| {
            BeanError::illegal_state(format!("类型 [{}] 没有注册类描述符", self.type_name_of(existing)))
        })?;
        let name = class.name().to_string();
        let definition = RootBeanDefinition::new(
            name.clone(),
            BeanDefinition::for_class(class.clone())
                .with_prototype_scope()
                .with_autowire_mode(mode),
        );
        let wrapper = BeanWrapper::new(existing.clone(), Some(class));
        self.populate_bean(&name, &definition, &wrapper)
    }

    fn initialize_existing_bean(&self, existing: BeanObject, name: &str) -> BeanResult<BeanObject> {
        self.initialize_bean(name, existing, None)
    }

    fn apply_bean_post_processors_before_initialization(
        &self,
        existing: BeanObject,
        name: &str,
    ) -> BeanResult<BeanObject> {
        self.apply_before_initialization(existing, name)
    }

    fn apply_bean_post_processors_after_initialization(
        &self,
        existing: BeanObject,
        name: &str,
    ) -> BeanResult<BeanObject> {
        self.apply_after_initialization(existing, name)
    }

    fn resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
        requesting_bean: Option<&str>,
        autowired_names: &mut Vec<String>,
    ) -> BeanResult<Option<BeanObject>> {
        self.do_resolve_dependency(descriptor, requesting_bean, autowired_names)
    }
}

impl AliasRegistry for DefaultListableBeanFactory {
    fn register_alias(&self, name: &str, alias: &str) -> BeanResult<()> {
        let allow = self.config.read().allow_bean_definition_overriding;
        self.definitions.register_alias(name, alias, allow)
    }

    fn remove_alias(&self, alias: &str) -> BeanResult<()> {
        self.definitions.remove_alias(alias)
    }

    fn is_alias(&self, name: &str) -> bool {
        self.definitions.is_alias(name)
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        self.definitions
            .aliases_of(&self.definitions.canonical_name(name))
    }

    fn canonical_name(&self, name: &str) -> String {
        self.definitions.canonical_name(name)
    }
}

impl BeanDefinitionRegistry for DefaultListableBeanFactory {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeanResult<()> {
        if let Some(BeanClassRef::Resolved(class)) = &definition.bean_class {
            self.ensure_class_registered(class);
        }
        let allow = self.config.read().allow_bean_definition_overriding;
        let previous = self.definitions.register(name, definition, allow)?;
        if previous.is_some() || self.singletons.contains_singleton(name) {
            self.reset_bean_definition(name);
        } else {
            self.by_type_cache.clear();
        }
        trace!("注册 bean 定义 '{}'", name);
        Ok(())
    }

    fn remove_bean_definition(&self, name: &str) -> BeanResult<()> {
        self.definitions.remove(name)?;
        self.reset_bean_definition(name);
        Ok(())
    }

    fn get_bean_definition(&self, name: &str) -> BeanResult<BeanDefinition> {
        self.definitions.get(name)
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.definitions.contains(name)
    }

    fn bean_definition_names(&self) -> Vec<String> {
        self.definitions.names()
    }

    fn bean_definition_count(&self) -> usize {
        self.definitions.count()
    }
}

impl ConfigurableListableBeanFactory for DefaultListableBeanFactory {
    fn ignore_dependency_type(&self, type_key: TypeKey) {
        self.ignored_types.write().insert(type_key.id);
    }

    fn register_resolvable_dependency(&self, type_key: TypeKey, object: BeanObject) {
        self.resolvable_dependencies.write().push((type_key, object));
    }

    fn is_autowire_candidate(&self, name: &str, descriptor: &DependencyDescriptor) -> BeanResult<bool> {
        self.candidate_check(&self.definitions.canonical_name(name), descriptor)
    }

    fn update_bean_definition(
        &self,
        name: &str,
        mutator: &mut dyn FnMut(&mut BeanDefinition) -> BeanResult<()>,
    ) -> BeanResult<()> {
        self.definitions.update(name, mutator)?;
        self.definitions.reset_merged(name);
        self.by_type_cache.clear();
        Ok(())
    }

    fn freeze_configuration(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    fn is_configuration_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    fn clear_metadata_cache(&self) {
        let created = self.already_created.lock().clone();
        self.definitions.retain_merged(|name| created.contains(name));
        self.by_type_cache.clear();
    }

    fn pre_instantiate_singletons(&self) -> BeanResult<()> {
        let names = self.definitions.names();
        info!("预实例化 {} 个 bean 定义中的单例", names.len());
        for name in &names {
            let definition = self.merged(name)?;
            if !definition.is_abstract() && definition.is_singleton() && !definition.is_lazy_init() {
                self.get_bean(name)?;
            }
        }

        for name in &names {
            if !self.singletons.contains_singleton(name) {
                continue;
            }
            let Some(instance) = self.singletons.get_singleton(name, false)? else {
                continue;
            };
            let definition = self.merged(name).ok();
            let Some(class) = self.class_of(&instance, definition.as_deref()) else {
                continue;
            };
            if class.is_smart_initializing_singleton() {
                trace!("调用 bean '{}' 的 after_singletons_instantiated()", name);
                class.after_singletons_instantiated(&instance).map_err(|e| {
                    BeanError::creation_caused_by(name.as_str(), "after_singletons_instantiated() 调用失败", e)
                })?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for DefaultListableBeanFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultListableBeanFactory")
            .field("definitions", &self.definitions.names())
            .field("singletons", &self.singletons.singleton_count())
            .field("post_processors", &self.post_processors.count())
            .field("closed", &self.is_closed())
            .finish()
    }
}
