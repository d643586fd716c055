//! bean 创建流程
//!
//! 获取 → 作用域分派 → 实例化 → 合并定义后处理 → 提前暴露 → 属性填充 → 初始化 →
//! 循环引用校验 → 注册销毁回调。

use crate::config::WrappedReferencePolicy;
use crate::constructor_resolver::ConstructorResolver;
use crate::disposable::DisposableBeanAdapter;
use crate::factory::DefaultListableBeanFactory;
use crate::value_resolver::BeanDefinitionValueResolver;
use crate::wrapper::BeanWrapper;
use di_abstractions::{
    AutowireMode, BeanClassRef, BeanFactory, BeanValue, ClassDescriptor, ConfigurableBeanFactory,
    DependencyDescriptor, InjectionPoint, PropertyValues, ResolvedExecutable, RootBeanDefinition,
};
use infrastructure_common::{BeanError, BeanObject, BeanResult, DisposableBean, TypeKey};
use std::any::Any;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use tracing::{debug, trace, warn};

const INITIALIZING_BEAN_METHOD: &str = "after_properties_set";

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<未知 panic>".to_string()
    }
}

fn same_object(a: &BeanObject, b: &BeanObject) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl DefaultListableBeanFactory {
    /// 获取 bean 的统一入口
    pub(crate) fn do_get_bean(
        &self,
        name: &str,
        required_type: Option<TypeKey>,
        args: Option<&[BeanObject]>,
        type_check_only: bool,
    ) -> BeanResult<BeanObject> {
        let bean_name = self.definitions.canonical_name(name);

        if args.is_none() {
            if let Some(shared) = self.singletons.get_singleton(&bean_name, true)? {
                if self.singletons.is_singleton_currently_in_creation(&bean_name) {
                    trace!("返回单例 '{}' 的早期引用, 它尚未完全初始化 (循环引用)", bean_name);
                } else {
                    trace!("返回单例 '{}' 的缓存实例", bean_name);
                }
                return self.adapt_to(&bean_name, shared, required_type);
            }
        }

        if self.is_prototype_currently_in_creation(&bean_name) {
            return Err(BeanError::currently_in_creation(bean_name));
        }

        if !self.definitions.contains(&bean_name) {
            if let Some(parent) = self.parent.read().clone() {
                return match (args, required_type) {
                    (Some(args), _) => parent.get_bean_with_args(name, args.to_vec()),
                    (None, Some(key)) => parent.get_bean_of_type(name, key),
                    (None, None) => parent.get_bean(name),
                };
            }
            return Err(BeanError::NoSuchBeanDefinition { name: bean_name });
        }

        if self.closed.load(Ordering::Acquire) {
            return Err(BeanError::CreationNotAllowed {
                name: bean_name,
                message: "bean 工厂已经关闭".to_string(),
            });
        }

        if !type_check_only {
            self.already_created.lock().insert(bean_name.clone());
        }

        match self.create_for_scope(&bean_name, args) {
            Ok(bean) => self.adapt_to(&bean_name, bean, required_type),
            Err(e) => {
                if !type_check_only {
                    self.already_created.lock().remove(&bean_name);
                }
                Err(e)
            }
        }
    }

    fn create_for_scope(&self, bean_name: &str, args: Option<&[BeanObject]>) -> BeanResult<BeanObject> {
        let definition = self.merged(bean_name)?;
        if definition.is_abstract() {
            return Err(BeanError::BeanIsAbstract {
                name: bean_name.to_string(),
            });
        }
        if args.is_some() && definition.is_singleton() && self.singletons.contains_singleton(bean_name) {
            return Err(BeanError::CreationNotAllowed {
                name: bean_name.to_string(),
                message: "单例已经创建, 不能再使用显式参数".to_string(),
            });
        }

        for dependency in &definition.definition().depends_on {
            if self.singletons.is_dependent(bean_name, dependency) {
                return Err(BeanError::creation(
                    bean_name,
                    format!("'{}' 与 '{}' 之间存在循环 depends-on 关系", bean_name, dependency),
                ));
            }
            self.register_dependent(dependency, bean_name);
            if let Err(e) = self.get_bean(dependency) {
                return Err(BeanError::creation_caused_by(
                    bean_name,
                    format!("depends-on 的 bean '{}' 缺失或创建失败", dependency),
                    e,
                ));
            }
        }

        if definition.is_singleton() {
            self.singletons.get_or_create(bean_name, || {
                self.create_bean_from_definition(bean_name, &definition, args)
                    .map_err(|e| {
                        // 清除可能已暴露的早期引用
                        self.singletons.destroy_singleton(bean_name);
                        e
                    })
            })
        } else if definition.is_prototype() {
            self.before_prototype_creation(bean_name);
            let result = self.create_bean_from_definition(bean_name, &definition, args);
            self.after_prototype_creation(bean_name);
            result
        } else {
            let scope_name = definition.scope().to_string();
            let scope = self.registered_scope(&scope_name).ok_or_else(|| {
                BeanError::illegal_state(format!("没有为作用域 '{}' 注册 Scope", scope_name))
            })?;
            let mut object_factory = || {
                self.before_prototype_creation(bean_name);
                let result = self.create_bean_from_definition(bean_name, &definition, args);
                self.after_prototype_creation(bean_name);
                result
            };
            scope.get(bean_name, &mut object_factory).map_err(|e| match e {
                BeanError::ScopeNotActive { .. } => BeanError::creation_caused_by(
                    bean_name,
                    format!(
                        "作用域 '{}' 对当前线程不可用; 如果要在单例中引用它, 考虑改用查找方法",
                        scope_name
                    ),
                    e,
                ),
                other => other,
            })
        }
    }

    fn before_prototype_creation(&self, name: &str) {
        self.prototypes_in_creation
            .entry(thread::current().id())
            .or_default()
            .insert(name.to_string());
    }

    fn after_prototype_creation(&self, name: &str) {
        let id = thread::current().id();
        let empty = match self.prototypes_in_creation.get_mut(&id) {
            Some(mut names) => {
                names.remove(name);
                names.is_empty()
            }
            None => false,
        };
        if empty {
            self.prototypes_in_creation.remove_if(&id, |_, names| names.is_empty());
        }
    }

    pub(crate) fn is_prototype_currently_in_creation(&self, name: &str) -> bool {
        self.prototypes_in_creation
            .get(&thread::current().id())
            .is_some_and(|names| names.contains(name))
    }

    /// 按合并定义完整创建一个实例；用户代码中的 panic 转换为创建错误
    pub(crate) fn create_bean_from_definition(
        &self,
        name: &str,
        definition: &Arc<RootBeanDefinition>,
        args: Option<&[BeanObject]>,
    ) -> BeanResult<BeanObject> {
        catch_unwind(AssertUnwindSafe(|| self.create_bean_unguarded(name, definition, args))).unwrap_or_else(
            |payload| {
                let message = panic_message(&*payload);
                warn!("创建 bean '{}' 时发生 panic: {}", name, message);
                Err(BeanError::creation(name, format!("创建 bean 时发生 panic: {}", message)))
            },
        )
    }

    fn create_bean_unguarded(
        &self,
        name: &str,
        definition: &Arc<RootBeanDefinition>,
        args: Option<&[BeanObject]>,
    ) -> BeanResult<BeanObject> {
        trace!("创建 bean '{}' 的实例", name);
        if definition.resolved_class().is_none() {
            if let Some(BeanClassRef::Name(class_name)) = &definition.definition().bean_class {
                let class = self.classes.resolve_class(class_name).ok_or_else(|| BeanError::DefinitionStore {
                    name: name.to_string(),
                    message: format!("找不到类 [{}]", class_name),
                })?;
                definition.set_resolved_class(class);
            }
        }
        if let Some(class) = definition.resolved_class() {
            self.ensure_class_registered(&class);
        }

        match self.resolve_before_instantiation(name, definition) {
            Ok(Some(bean)) => return Ok(bean),
            Ok(None) => {}
            Err(e) if e.is_pass_through() => return Err(e),
            Err(e) => {
                return Err(BeanError::creation_caused_by(
                    name,
                    "实例化之前的后置处理器执行失败",
                    e,
                ))
            }
        }

        match self.do_create_bean(name, definition, args) {
            Ok(bean) => {
                trace!("完成 bean '{}' 的创建", name);
                Ok(bean)
            }
            Err(e) if e.is_pass_through() => Err(e),
            Err(e) => Err(BeanError::creation_caused_by(name, "创建 bean 时发生意外错误", e)),
        }
    }

    fn resolve_before_instantiation(
        &self,
        name: &str,
        definition: &RootBeanDefinition,
    ) -> BeanResult<Option<BeanObject>> {
        if definition.before_instantiation_resolved() == Some(false) {
            return Ok(None);
        }
        let processors = self.post_processors.snapshot();
        let mut bean = None;
        if !definition.is_synthetic() && !processors.instantiation_aware.is_empty() {
            if let Some(class) = self.target_type(name, definition) {
                for processor in &processors.instantiation_aware {
                    let Some(aware) = processor.as_instantiation_aware() else {
                        continue;
                    };
                    if let Some(result) = aware.post_process_before_instantiation(&class, name)? {
                        debug!("bean '{}' 的创建被实例化前处理器短路", name);
                        bean = Some(self.apply_after_initialization(result, name)?);
                        break;
                    }
                }
            }
        }
        definition.set_before_instantiation_resolved(bean.is_some());
        Ok(bean)
    }

    fn do_create_bean(
        &self,
        name: &str,
        definition: &Arc<RootBeanDefinition>,
        args: Option<&[BeanObject]>,
    ) -> BeanResult<BeanObject> {
        let instance = self.create_bean_instance(name, definition, args)?;
        let class = self.class_of(&instance, Some(definition));

        {
            let mut processed = definition.post_processing_lock();
            if !*processed {
                let target = class.clone().unwrap_or_else(|| {
                    Arc::new(ClassDescriptor::opaque(TypeKey::erased((*instance).type_id(), "<unknown>")))
                });
                self.apply_merged_definition_post_processors(definition, &target, name)
                    .map_err(|e| BeanError::creation_caused_by(name, "合并定义的后置处理失败", e))?;
                *processed = true;
            }
        }

        let early_exposure = definition.is_singleton()
            && self.config().allow_circular_references
            && self.singletons.is_singleton_currently_in_creation(name);
        if early_exposure {
            trace!("提前缓存 bean '{}' 以解决潜在的循环引用", name);
            let factory = self.self_ref.clone();
            let early_definition = definition.clone();
            let raw = instance.clone();
            let bean_name = name.to_string();
            self.singletons.add_singleton_factory(
                name,
                Box::new(move || match factory.upgrade() {
                    Some(factory) => factory.get_early_bean_reference(&bean_name, &early_definition, raw),
                    None => Ok(raw),
                }),
            );
        }

        let wrapper = BeanWrapper::new(instance.clone(), class);
        let initialized = self
            .populate_bean(name, definition, &wrapper)
            .and_then(|_| self.initialize_bean(name, instance.clone(), Some(definition)));
        let mut exposed = match initialized {
            Ok(bean) => bean,
            Err(e) if e.is_pass_through() && e.bean_name() == Some(name) => return Err(e),
            Err(e) => return Err(BeanError::creation_caused_by(name, "初始化 bean 失败", e)),
        };

        if early_exposure {
            if let Some(early) = self.singletons.get_singleton(name, false)? {
                if same_object(&exposed, &instance) {
                    exposed = early;
                } else {
                    self.check_wrapped_references(name)?;
                }
            }
        }

        self.register_disposable_bean_if_necessary(name, &instance, definition)
            .map_err(|e| BeanError::creation_caused_by(name, "无效的销毁方法声明", e))?;
        Ok(exposed)
    }

    /// 原始实例已注入其他 bean，但最终暴露的是包装后的对象
    fn check_wrapped_references(&self, name: &str) -> BeanResult<()> {
        let policy = self.config().wrapped_reference_policy;
        if policy == WrappedReferencePolicy::Tolerate || !self.singletons.has_dependent_bean(name) {
            return Ok(());
        }
        let mut actual = Vec::new();
        for dependent in self.singletons.dependent_beans(name) {
            let created = self.already_created.lock().contains(&dependent);
            if policy == WrappedReferencePolicy::IgnoreTypeCheckOnly && !created {
                self.singletons.remove_singleton(&dependent);
                continue;
            }
            actual.push(dependent);
        }
        if actual.is_empty() {
            return Ok(());
        }
        Err(BeanError::CurrentlyInCreation {
            name: name.to_string(),
            message: format!(
                "bean '{}' 的原始版本已作为循环引用的一部分注入到 [{}] 中, 但最终被包装了; 这些 bean 没有使用最终版本",
                name,
                actual.join(", ")
            ),
        })
    }

    fn get_early_bean_reference(
        &self,
        name: &str,
        definition: &RootBeanDefinition,
        bean: BeanObject,
    ) -> BeanResult<BeanObject> {
        let mut exposed = bean;
        if !definition.is_synthetic() {
            for processor in &self.post_processors.snapshot().smart {
                if let Some(smart) = processor.as_smart_instantiation_aware() {
                    exposed = smart.get_early_bean_reference(exposed, name)?;
                }
            }
        }
        Ok(exposed)
    }

    fn apply_merged_definition_post_processors(
        &self,
        definition: &RootBeanDefinition,
        class: &Arc<ClassDescriptor>,
        name: &str,
    ) -> BeanResult<()> {
        for processor in &self.post_processors.snapshot().merged {
            if let Some(merged) = processor.as_merged_definition() {
                merged.post_process_merged_bean_definition(definition, class, name)?;
            }
        }
        Ok(())
    }

    /// 实例化：实例提供者 → 工厂方法 → 缓存的构造器 → 构造器自动装配 → 默认构造器
    fn create_bean_instance(
        &self,
        name: &str,
        definition: &RootBeanDefinition,
        args: Option<&[BeanObject]>,
    ) -> BeanResult<BeanObject> {
        let def = definition.definition();
        if args.is_none() {
            if let Some(supplier) = &def.instance_supplier {
                return supplier
                    .get()
                    .map_err(|e| BeanError::creation_caused_by(name, "实例提供者返回错误", e));
            }
        }

        if def.factory_method_name.is_some() {
            return ConstructorResolver::new(self).instantiate_using_factory_method(name, definition, args);
        }

        if args.is_none() {
            let cached = {
                let cache = definition.constructor_cache();
                match cache.resolved {
                    Some(ResolvedExecutable::Constructor(_)) => Some(cache.args_resolved),
                    _ => None,
                }
            };
            match cached {
                Some(true) => return ConstructorResolver::new(self).autowire_constructor(name, definition, None, None),
                Some(false) => return self.instantiate_bean(name, definition),
                None => {}
            }
        }

        let class = definition.resolved_class().ok_or_else(|| BeanError::DefinitionStore {
            name: name.to_string(),
            message: "定义既没有类, 也没有工厂方法或实例提供者".to_string(),
        })?;
        let chosen = self.determine_constructors_from_processors(&class, name)?;
        if chosen.is_some()
            || definition.autowire_mode() == AutowireMode::Constructor
            || definition.has_constructor_argument_values()
            || args.is_some()
        {
            return ConstructorResolver::new(self).autowire_constructor(name, definition, chosen, args);
        }
        if let Some(index) = class.sole_parameterized_constructor() {
            return ConstructorResolver::new(self).autowire_constructor(name, definition, Some(vec![index]), None);
        }
        self.instantiate_bean(name, definition)
    }

    fn determine_constructors_from_processors(
        &self,
        class: &Arc<ClassDescriptor>,
        name: &str,
    ) -> BeanResult<Option<Vec<usize>>> {
        for processor in &self.post_processors.snapshot().smart {
            if let Some(smart) = processor.as_smart_instantiation_aware() {
                if let Some(constructors) = smart.determine_candidate_constructors(class, name)? {
                    return Ok(Some(constructors));
                }
            }
        }
        Ok(None)
    }

    fn instantiate_bean(&self, name: &str, definition: &RootBeanDefinition) -> BeanResult<BeanObject> {
        if let Some(class) = definition.resolved_class() {
            if let Some((index, _)) = class.default_constructor() {
                let mut cache = definition.constructor_cache();
                if cache.resolved.is_none() {
                    cache.resolved = Some(ResolvedExecutable::Constructor(index));
                    cache.args_resolved = false;
                }
            }
        }
        let owner = self.owner()?;
        self.instantiation_strategy().instantiate(definition, name, &owner)
    }

    /// 属性填充：实例化后处理器 → 按名称/类型自动装配 → 属性处理器 → 应用属性值
    pub(crate) fn populate_bean(
        &self,
        name: &str,
        definition: &RootBeanDefinition,
        wrapper: &BeanWrapper,
    ) -> BeanResult<()> {
        let processors = self.post_processors.snapshot();
        if !definition.is_synthetic() {
            for processor in &processors.instantiation_aware {
                if let Some(aware) = processor.as_instantiation_aware() {
                    if !aware.post_process_after_instantiation(wrapper.instance(), name)? {
                        trace!("后置处理器跳过了 bean '{}' 的属性填充", name);
                        return Ok(());
                    }
                }
            }
        }

        let mut values = definition.definition().property_values.clone();
        match definition.autowire_mode() {
            AutowireMode::ByName => self.autowire_by_name(name, wrapper, &mut values),
            AutowireMode::ByType => self.autowire_by_type(name, wrapper, &mut values)?,
            AutowireMode::No | AutowireMode::Constructor => {}
        }

        if !definition.is_synthetic() {
            for processor in &processors.instantiation_aware {
                if let Some(aware) = processor.as_instantiation_aware() {
                    values = aware.post_process_properties(values, wrapper.instance(), name)?;
                }
            }
        }

        let applied = self.apply_property_values(name, definition, wrapper, &values)?;
        self.check_required_properties(name, wrapper, &applied)
    }

    /// 需要自动装配的属性：非简单类型、没有显式值、类型没有被忽略
    fn unsatisfied_properties(&self, wrapper: &BeanWrapper, values: &PropertyValues) -> Vec<String> {
        let Some(class) = wrapper.class() else {
            return Vec::new();
        };
        let ignored = self.ignored_types.read();
        class
            .properties()
            .iter()
            .filter(|p| !p.is_simple() && !values.contains(&p.name) && !ignored.contains(&p.type_key.id))
            .map(|p| p.name.clone())
            .collect()
    }

    fn autowire_by_name(&self, name: &str, wrapper: &BeanWrapper, values: &mut PropertyValues) {
        for property in self.unsatisfied_properties(wrapper, values) {
            if self.contains_bean(&property) {
                values.add(property.clone(), BeanValue::reference(property.clone()));
                debug!("按名称自动装配: bean '{}' 注入到 '{}' 的属性", property, name);
            } else {
                trace!("没有名为 '{}' 的 bean, 不按名称自动装配 '{}' 的该属性", property, name);
            }
        }
    }

    fn autowire_by_type(&self, name: &str, wrapper: &BeanWrapper, values: &mut PropertyValues) -> BeanResult<()> {
        let Some(class) = wrapper.class().cloned() else {
            return Ok(());
        };
        for property_name in self.unsatisfied_properties(wrapper, values) {
            let Some(property) = class.property(&property_name) else {
                continue;
            };
            let descriptor = DependencyDescriptor::for_property(class.name(), property);
            let mut autowired_names = Vec::new();
            let resolved = self
                .do_resolve_dependency(&descriptor, Some(name), &mut autowired_names)
                .map_err(|e| BeanError::unsatisfied(name, descriptor.injection_point.to_string(), e))?;
            if let Some(object) = resolved {
                values.add(property_name.clone(), BeanValue::Object(object));
            }
            for autowired in &autowired_names {
                self.register_dependent(autowired, name);
                debug!("按类型自动装配: bean '{}' 注入到 '{}' 的属性 '{}'", autowired, name, property_name);
            }
        }
        Ok(())
    }

    /// 返回实际被设置的属性名；值为空的属性被跳过
    fn apply_property_values(
        &self,
        name: &str,
        definition: &RootBeanDefinition,
        wrapper: &BeanWrapper,
        values: &PropertyValues,
    ) -> BeanResult<HashSet<String>> {
        let mut applied = HashSet::new();
        if values.is_empty() {
            return Ok(applied);
        }
        let resolver = BeanDefinitionValueResolver::new(self, name, definition);
        for value in values.iter() {
            let Some(property) = wrapper.property(&value.name) else {
                return Err(BeanError::creation_caused_by(
                    name,
                    "设置属性值失败",
                    BeanError::InvalidProperty {
                        class: wrapper.class_name().to_string(),
                        property: value.name.clone(),
                        message: "属性不可写或不存在".to_string(),
                    },
                ));
            };
            let (type_key, kind) = (property.type_key, property.kind);
            let resolved = resolver.resolve(&format!("属性 '{}'", value.name), &value.value)?;
            let converted = resolver
                .convert(resolved, type_key, kind)
                .map_err(|e| BeanError::creation_caused_by(name, format!("转换属性 '{}' 的值失败", value.name), e))?;
            match converted {
                Some(object) => {
                    wrapper
                        .set_property_value(&value.name, object)
                        .map_err(|e| BeanError::creation_caused_by(name, "设置属性值失败", e))?;
                    applied.insert(value.name.clone());
                }
                None => trace!("bean '{}' 的属性 '{}' 值为空, 跳过", name, value.name),
            }
        }
        Ok(applied)
    }

    fn check_required_properties(&self, name: &str, wrapper: &BeanWrapper, applied: &HashSet<String>) -> BeanResult<()> {
        let Some(class) = wrapper.class() else {
            return Ok(());
        };
        for property in class.properties().iter().filter(|p| p.required) {
            if !applied.contains(&property.name) {
                return Err(BeanError::UnsatisfiedDependency {
                    bean: name.to_string(),
                    injection_point: InjectionPoint::Property {
                        class: class.name().to_string(),
                        property: property.name.clone(),
                    }
                    .to_string(),
                    message: "必需的属性没有被设置".to_string(),
                    source: None,
                });
            }
        }
        Ok(())
    }

    /// 感知回调 → 初始化前处理器 → 初始化回调 → 初始化后处理器
    pub(crate) fn initialize_bean(
        &self,
        name: &str,
        bean: BeanObject,
        definition: Option<&RootBeanDefinition>,
    ) -> BeanResult<BeanObject> {
        if let Some(class) = self.class_of(&bean, definition) {
            let owner = self.owner()?;
            class.invoke_aware_methods(&bean, name, &self.classes, Some(&owner));
        }

        let synthetic = definition.is_some_and(|d| d.is_synthetic());
        let mut wrapped = bean;
        if !synthetic {
            wrapped = self.apply_before_initialization(wrapped, name)?;
        }
        self.invoke_init_methods(name, &wrapped, definition)?;
        if !synthetic {
            wrapped = self.apply_after_initialization(wrapped, name)?;
        }
        Ok(wrapped)
    }

    fn invoke_init_methods(
        &self,
        name: &str,
        bean: &BeanObject,
        definition: Option<&RootBeanDefinition>,
    ) -> BeanResult<()> {
        let class = self.class_of(bean, definition);
        let initializing = class.as_ref().is_some_and(|c| c.is_initializing_bean());
        if let Some(class) = class.as_ref().filter(|_| initializing) {
            if !definition.is_some_and(|d| d.is_externally_managed_init_method(INITIALIZING_BEAN_METHOD)) {
                trace!("调用 bean '{}' 的 after_properties_set()", name);
                class
                    .after_properties_set(bean)
                    .map_err(|e| BeanError::creation_caused_by(name, "after_properties_set() 调用失败", e))?;
            }
        }

        let Some(definition) = definition else {
            return Ok(());
        };
        for method_name in &definition.definition().init_method_names {
            if initializing && method_name == INITIALIZING_BEAN_METHOD {
                continue;
            }
            if definition.is_externally_managed_init_method(method_name) {
                continue;
            }
            match class.as_ref().and_then(|c| c.method(method_name)) {
                Some(method) => {
                    trace!("调用 bean '{}' 的 init 方法 '{}'", name, method_name);
                    method.invoke(bean).map_err(|e| {
                        BeanError::creation_caused_by(name, format!("init 方法 '{}' 调用失败", method_name), e)
                    })?;
                }
                None if definition.definition().enforce_init_method => {
                    return Err(BeanError::DefinitionValidation {
                        name: name.to_string(),
                        message: format!("找不到名为 '{}' 的 init 方法", method_name),
                    });
                }
                None => debug!("bean '{}' 上没有名为 '{}' 的 init 方法, 跳过", name, method_name),
            }
        }
        Ok(())
    }

    pub(crate) fn apply_before_initialization(&self, bean: BeanObject, name: &str) -> BeanResult<BeanObject> {
        let mut current = bean;
        for processor in &self.post_processors.snapshot().all {
            current = processor.post_process_before_initialization(current, name)?;
        }
        Ok(current)
    }

    pub(crate) fn apply_after_initialization(&self, bean: BeanObject, name: &str) -> BeanResult<BeanObject> {
        let mut current = bean;
        for processor in &self.post_processors.snapshot().all {
            current = processor.post_process_after_initialization(current, name)?;
        }
        Ok(current)
    }

    fn register_disposable_bean_if_necessary(
        &self,
        name: &str,
        instance: &BeanObject,
        definition: &RootBeanDefinition,
    ) -> BeanResult<()> {
        if definition.is_prototype() {
            return Ok(());
        }
        let adapter = DisposableBeanAdapter::new(
            name,
            instance.clone(),
            self.class_of(instance, Some(definition)),
            Some(definition),
            &self.post_processors.snapshot().destruction,
        )?;
        if !adapter.has_destruction_work() {
            return Ok(());
        }

        if definition.is_singleton() {
            self.singletons.register_disposable_bean(name, Box::new(adapter));
            return Ok(());
        }
        let scope = self.registered_scope(definition.scope()).ok_or_else(|| {
            BeanError::illegal_state(format!("没有为作用域 '{}' 注册 Scope", definition.scope()))
        })?;
        let bean_name = name.to_string();
        scope.register_destruction_callback(
            name,
            Box::new(move || {
                if let Err(e) = adapter.destroy() {
                    warn!("销毁作用域 bean '{}' 失败: {:#}", bean_name, e);
                }
            }),
        );
        Ok(())
    }
}
