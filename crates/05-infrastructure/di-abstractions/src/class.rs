//! 类描述符
//!
//! Rust 没有运行时反射，bean 工厂需要的所有类型能力（构造器、工厂方法、可写属性、
//! 生命周期回调、类型转换视图）都由 [`ClassBuilder`] 显式声明，构建成
//! [`ClassDescriptor`] 后按类型缓存在类注册表中。

use crate::factory::BeanFactory;
use crate::registry::ClassRegistry;
use anyhow::{anyhow, bail};
use infrastructure_common::{
    BeanNameAware, BeanObject, BeanResult, DisposableBean, InitializingBean,
    SmartInitializingSingleton, TypeKey,
};
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 多值注入时传递的 bean 列表
#[derive(Debug, Clone, Default)]
pub struct BeanList(pub Vec<BeanObject>);

/// 将具体类型的 bean 对象向下转型
pub fn downcast_bean<T: Send + Sync + 'static>(object: &BeanObject) -> Option<Arc<T>> {
    object.clone().downcast::<T>().ok()
}

/// 将视图对象（`Arc<Arc<V>>`）还原为 `Arc<V>`
pub fn downcast_view<V: ?Sized + Send + Sync + 'static>(object: &BeanObject) -> Option<Arc<V>> {
    object.downcast_ref::<Arc<V>>().cloned()
}

/// 把 trait 对象包装为 bean 对象
pub fn view_object<V: ?Sized + Send + Sync + 'static>(view: Arc<V>) -> BeanObject {
    Arc::new(view)
}

/// 设置一次性注入字段
pub fn set_once<V>(cell: &OnceCell<V>, value: V) -> anyhow::Result<()> {
    cell.set(value)
        .map_err(|_| anyhow!("字段已经被注入过，不能重复设置"))
}

type CastFn = Arc<dyn Fn(&BeanObject) -> Option<BeanObject> + Send + Sync>;
type InvokeFn = Arc<dyn Fn(&Args) -> anyhow::Result<BeanObject> + Send + Sync>;
type FactoryInvokeFn =
    Arc<dyn Fn(Option<&BeanObject>, &Args) -> anyhow::Result<BeanObject> + Send + Sync>;
type SetterFn = Arc<dyn Fn(&BeanObject, BeanObject) -> anyhow::Result<()> + Send + Sync>;
type GetterFn = Arc<dyn Fn(&BeanObject) -> Option<BeanObject> + Send + Sync>;
type MethodFn = Arc<dyn Fn(&BeanObject) -> anyhow::Result<()> + Send + Sync>;
type NameAwareFn = Arc<dyn Fn(&BeanObject, &str) + Send + Sync>;
type FactoryAwareFn = Arc<dyn Fn(&BeanObject, &Arc<dyn BeanFactory>) + Send + Sync>;
type RegistryAwareFn = Arc<dyn Fn(&BeanObject, &Arc<dyn ClassRegistry>) + Send + Sync>;
type LookupBindFn = Arc<dyn Fn(&BeanObject, ObjectLookup) -> anyhow::Result<()> + Send + Sync>;

/// 查找方法背后的对象获取函数
pub type ObjectLookup = Arc<dyn Fn() -> BeanResult<BeanObject> + Send + Sync>;

/// 需要访问 bean 工厂的组件
pub trait BeanFactoryAware: Send + Sync {
    /// 注入所属 bean 工厂
    fn set_bean_factory(&self, factory: &Arc<dyn BeanFactory>);
}

/// 需要访问类注册表的组件
pub trait ClassRegistryAware: Send + Sync {
    /// 注入类注册表
    fn set_class_registry(&self, registry: &Arc<dyn ClassRegistry>);
}

/// 参数/属性的注入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionKind {
    /// 引用其他 bean
    Bean,
    /// 简单值，由字符串字面量转换而来
    Value,
    /// 注入所有匹配的 bean
    Multiple,
}

/// 构造器/工厂方法参数描述
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    /// 参数名，参与按名称消除歧义
    pub name: Option<String>,
    /// 参数类型
    pub type_key: TypeKey,
    /// 注入方式
    pub kind: InjectionKind,
    /// 没有候选时是否报错
    pub required: bool,
    /// 限定符
    pub qualifier: Option<String>,
}

impl ParamDescriptor {
    fn with_kind(type_key: TypeKey, kind: InjectionKind) -> Self {
        Self {
            name: None,
            type_key,
            kind,
            required: true,
            qualifier: None,
        }
    }

    /// 具体类型的 bean 参数
    pub fn bean<T: Send + Sync + 'static>() -> Self {
        Self::with_kind(TypeKey::of::<T>(), InjectionKind::Bean)
    }

    /// trait 对象视图参数
    pub fn view<V: ?Sized + Send + Sync + 'static>() -> Self {
        Self::with_kind(TypeKey::of::<V>(), InjectionKind::Bean)
    }

    /// 简单值参数
    pub fn value<T: Send + Sync + 'static>() -> Self {
        Self::with_kind(TypeKey::of::<T>(), InjectionKind::Value)
    }

    /// 所有匹配视图的列表参数
    pub fn all<V: ?Sized + Send + Sync + 'static>() -> Self {
        Self::with_kind(TypeKey::of::<V>(), InjectionKind::Multiple)
    }

    /// 设置参数名
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 标记为可选参数，没有候选时注入 `None`
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// 只匹配带有该限定符的候选
    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }
}

/// 已解析的调用参数
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Vec<Option<BeanObject>>,
}

impl Args {
    /// 由解析后的参数值构造
    pub fn new(values: Vec<Option<BeanObject>>) -> Self {
        Self { values }
    }

    /// 参数个数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否没有参数
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 原始参数对象
    pub fn raw(&self, index: usize) -> anyhow::Result<Option<&BeanObject>> {
        match self.values.get(index) {
            Some(value) => Ok(value.as_ref()),
            None => bail!("参数索引 {} 超出范围 (共 {} 个参数)", index, self.values.len()),
        }
    }

    /// 按下标取出具体类型的参数
    pub fn bean<T: Send + Sync + 'static>(&self, index: usize) -> anyhow::Result<Arc<T>> {
        self.optional_bean(index)?
            .ok_or_else(|| anyhow!("参数 {} 为空", index))
    }

    /// 按下标取出具体类型的参数，空值返回 `None`
    pub fn optional_bean<T: Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> anyhow::Result<Option<Arc<T>>> {
        match self.raw(index)? {
            None => Ok(None),
            Some(object) => downcast_bean::<T>(object).map(Some).ok_or_else(|| {
                anyhow!("参数 {} 不是类型 {}", index, std::any::type_name::<T>())
            }),
        }
    }

    /// 按下标取出 trait 视图参数
    pub fn view<V: ?Sized + Send + Sync + 'static>(&self, index: usize) -> anyhow::Result<Arc<V>> {
        self.optional_view(index)?
            .ok_or_else(|| anyhow!("参数 {} 为空", index))
    }

    /// 按下标取出 trait 视图参数，空值返回 `None`
    pub fn optional_view<V: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> anyhow::Result<Option<Arc<V>>> {
        match self.raw(index)? {
            None => Ok(None),
            Some(object) => downcast_view::<V>(object).map(Some).ok_or_else(|| {
                anyhow!("参数 {} 不是视图 {}", index, std::any::type_name::<V>())
            }),
        }
    }

    /// 简单值参数
    pub fn value<T: Clone + 'static>(&self, index: usize) -> anyhow::Result<T> {
        self.raw(index)?
            .and_then(|object| object.downcast_ref::<T>().cloned())
            .ok_or_else(|| anyhow!("参数 {} 不是值类型 {}", index, std::any::type_name::<T>()))
    }

    /// 多值注入的视图列表
    pub fn views<V: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> anyhow::Result<Vec<Arc<V>>> {
        let Some(object) = self.raw(index)? else {
            return Ok(Vec::new());
        };
        let list = object
            .downcast_ref::<BeanList>()
            .ok_or_else(|| anyhow!("参数 {} 不是 bean 列表", index))?;
        list.0
            .iter()
            .map(|item| {
                downcast_view::<V>(item)
                    .ok_or_else(|| anyhow!("列表元素不是视图 {}", std::any::type_name::<V>()))
            })
            .collect()
    }
}

/// 构造器描述
#[derive(Clone)]
pub struct ConstructorDescriptor {
    /// 参数列表
    pub params: Vec<ParamDescriptor>,
    /// 是否为公开构造器
    pub public: bool,
    invoke: InvokeFn,
}

impl ConstructorDescriptor {
    /// 用解析后的参数调用构造器
    pub fn invoke(&self, args: &Args) -> anyhow::Result<BeanObject> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("params", &self.params)
            .field("public", &self.public)
            .finish()
    }
}

/// 工厂方法描述
///
/// 静态工厂方法定义在 bean 类上，实例工厂方法由另一个 bean（factory-bean）提供。
#[derive(Clone)]
pub struct FactoryMethodDescriptor {
    /// 方法名
    pub name: String,
    /// 是否为静态工厂方法
    pub is_static: bool,
    /// 参数列表
    pub params: Vec<ParamDescriptor>,
    /// 返回值类型
    pub return_type: TypeKey,
    invoke: FactoryInvokeFn,
}

impl FactoryMethodDescriptor {
    /// 调用工厂方法；实例工厂方法需要传入 factory-bean 实例
    pub fn invoke(&self, target: Option<&BeanObject>, args: &Args) -> anyhow::Result<BeanObject> {
        (self.invoke)(target, args)
    }
}

impl fmt::Debug for FactoryMethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryMethodDescriptor")
            .field("name", &self.name)
            .field("is_static", &self.is_static)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .finish()
    }
}

/// 可写属性描述
#[derive(Clone)]
pub struct PropertyDescriptor {
    /// 属性名
    pub name: String,
    /// 属性类型
    pub type_key: TypeKey,
    /// 注入方式
    pub kind: InjectionKind,
    /// 按类型自动装配时没有候选是否报错
    pub required: bool,
    setter: SetterFn,
    getter: Option<GetterFn>,
}

impl PropertyDescriptor {
    /// 写入属性值
    pub fn set(&self, target: &BeanObject, value: BeanObject) -> anyhow::Result<()> {
        (self.setter)(target, value)
    }

    /// 读取属性值，没有读取方法时返回 `None`
    pub fn get(&self, target: &BeanObject) -> Option<BeanObject> {
        self.getter.as_ref().and_then(|getter| getter(target))
    }

    /// 是否提供了读取方法
    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    /// 简单属性不参与按名称/按类型自动装配
    pub fn is_simple(&self) -> bool {
        self.kind == InjectionKind::Value
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("type_key", &self.type_key)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .finish()
    }
}

/// 无参方法（自定义 init/destroy 方法的目标）
#[derive(Clone)]
pub struct MethodDescriptor {
    /// 方法名
    pub name: String,
    invoke: MethodFn,
}

impl MethodDescriptor {
    /// 在实例上调用该方法
    pub fn invoke(&self, target: &BeanObject) -> anyhow::Result<()> {
        (self.invoke)(target)
    }
}

/// 查找方法描述
#[derive(Clone)]
pub struct LookupMethodDescriptor {
    /// 方法名
    pub name: String,
    /// 返回值类型
    pub return_type: TypeKey,
    bind: LookupBindFn,
}

impl LookupMethodDescriptor {
    /// 把对象获取函数绑定到实例上
    pub fn bind(&self, target: &BeanObject, lookup: ObjectLookup) -> anyhow::Result<()> {
        (self.bind)(target, lookup)
    }
}

/// 查找方法句柄，每次调用 [`Lookup::get`] 都会重新向工厂请求对象
pub struct Lookup<R: ?Sized> {
    source: ObjectLookup,
    adapt: fn(&BeanObject) -> Option<Arc<R>>,
}

impl<R: ?Sized> Clone for Lookup<R> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            adapt: self.adapt,
        }
    }
}

impl<R: ?Sized + 'static> Lookup<R> {
    /// 向工厂请求一个新的对象
    pub fn get(&self) -> anyhow::Result<Arc<R>> {
        let object = (self.source)()?;
        (self.adapt)(&object)
            .ok_or_else(|| anyhow!("查找到的对象不是类型 {}", std::any::type_name::<R>()))
    }
}

impl<R: ?Sized> fmt::Debug for Lookup<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Lookup")
    }
}

#[derive(Clone, Default)]
struct LifecycleCallbacks {
    initializing: Option<MethodFn>,
    disposable: Option<MethodFn>,
    smart_initializing: Option<MethodFn>,
    name_aware: Option<NameAwareFn>,
    factory_aware: Option<FactoryAwareFn>,
    registry_aware: Option<RegistryAwareFn>,
}

/// 类描述符
#[derive(Clone)]
pub struct ClassDescriptor {
    name: String,
    type_key: TypeKey,
    instance_type: TypeId,
    casts: Vec<(TypeKey, CastFn)>,
    constructors: Vec<ConstructorDescriptor>,
    factory_methods: Vec<FactoryMethodDescriptor>,
    properties: Vec<PropertyDescriptor>,
    methods: Vec<MethodDescriptor>,
    lookup_methods: Vec<LookupMethodDescriptor>,
    priority: Option<i32>,
    callbacks: LifecycleCallbacks,
}

impl ClassDescriptor {
    /// 只知道确切类型、没有任何能力声明的描述符
    pub fn opaque(type_key: TypeKey) -> Self {
        let identity: CastFn = Arc::new(|object: &BeanObject| Some(object.clone()));
        Self {
            name: type_key.short_name().to_string(),
            type_key,
            instance_type: type_key.id,
            casts: vec![(type_key, identity)],
            constructors: Vec::new(),
            factory_methods: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            lookup_methods: Vec::new(),
            priority: None,
            callbacks: LifecycleCallbacks::default(),
        }
    }

    /// 视图对象（以 `Arc<Arc<V>>` 存放的 trait 对象，例如代理）的描述符
    pub fn view<V: ?Sized + Send + Sync + 'static>() -> Self {
        let mut descriptor = Self::opaque(TypeKey::of::<V>());
        descriptor.instance_type = TypeId::of::<Arc<V>>();
        descriptor
    }

    /// 类名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 类自身的类型键
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// 实例对象的 `TypeId`
    pub fn instance_type(&self) -> TypeId {
        self.instance_type
    }

    /// 对象是否为该类的实例
    pub fn is_instance(&self, object: &BeanObject) -> bool {
        (**object).type_id() == self.instance_type
    }

    /// 能否作为指定类型注入
    pub fn is_assignable_to(&self, key: TypeKey) -> bool {
        self.casts.iter().any(|(k, _)| *k == key)
    }

    /// 可匹配的所有类型
    pub fn assignable_types(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.casts.iter().map(|(k, _)| *k)
    }

    /// 把实例转换为指定类型的视图
    pub fn cast(&self, object: &BeanObject, key: TypeKey) -> Option<BeanObject> {
        if !self.is_instance(object) {
            return None;
        }
        self.casts
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, cast)| cast(object))
    }

    /// 声明的全部构造器
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    /// 无参构造器
    pub fn default_constructor(&self) -> Option<(usize, &ConstructorDescriptor)> {
        self.constructors
            .iter()
            .enumerate()
            .find(|(_, c)| c.params.is_empty())
    }

    /// 唯一的有参构造器（会被隐式自动装配）
    pub fn sole_parameterized_constructor(&self) -> Option<usize> {
        match self.constructors.as_slice() {
            [only] if !only.params.is_empty() => Some(0),
            _ => None,
        }
    }

    /// 声明的全部工厂方法
    pub fn factory_methods(&self) -> &[FactoryMethodDescriptor] {
        &self.factory_methods
    }

    /// 声明的全部属性
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// 按名称查找属性
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// 按名称查找无参方法
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// 按名称查找查找方法
    pub fn lookup_method(&self, name: &str) -> Option<&LookupMethodDescriptor> {
        self.lookup_methods.iter().find(|m| m.name == name)
    }

    /// 类级别的优先级
    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    /// 是否实现了 `InitializingBean`
    pub fn is_initializing_bean(&self) -> bool {
        self.callbacks.initializing.is_some()
    }

    /// 是否实现了 `DisposableBean`
    pub fn is_disposable_bean(&self) -> bool {
        self.callbacks.disposable.is_some()
    }

    /// 是否实现了 `SmartInitializingSingleton`
    pub fn is_smart_initializing_singleton(&self) -> bool {
        self.callbacks.smart_initializing.is_some()
    }

    /// 调用 `InitializingBean::after_properties_set`
    pub fn after_properties_set(&self, object: &BeanObject) -> anyhow::Result<()> {
        match &self.callbacks.initializing {
            Some(callback) => callback(object),
            None => Ok(()),
        }
    }

    /// 调用 `DisposableBean::destroy`
    pub fn destroy(&self, object: &BeanObject) -> anyhow::Result<()> {
        match &self.callbacks.disposable {
            Some(callback) => callback(object),
            None => Ok(()),
        }
    }

    /// 调用 `SmartInitializingSingleton::after_singletons_instantiated`
    pub fn after_singletons_instantiated(&self, object: &BeanObject) -> anyhow::Result<()> {
        match &self.callbacks.smart_initializing {
            Some(callback) => callback(object),
            None => Ok(()),
        }
    }

    /// 依次调用名称、类注册表、工厂感知回调
    pub fn invoke_aware_methods(
        &self,
        object: &BeanObject,
        name: &str,
        registry: &Arc<dyn ClassRegistry>,
        factory: Option<&Arc<dyn BeanFactory>>,
    ) {
        if let Some(callback) = &self.callbacks.name_aware {
            callback(object, name);
        }
        if let Some(callback) = &self.callbacks.registry_aware {
            callback(object, registry);
        }
        if let (Some(callback), Some(factory)) = (&self.callbacks.factory_aware, factory) {
            callback(object, factory);
        }
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("type_key", &self.type_key)
            .field("casts", &self.casts.iter().map(|(k, _)| k.name).collect::<Vec<_>>())
            .field("constructors", &self.constructors.len())
            .field("factory_methods", &self.factory_methods.len())
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// 类描述符构建器
///
/// ```ignore
/// let class = ClassBuilder::<OrderService>::new()
///     .alias::<dyn OrderApi>(|s| s)
///     .constructor(vec![ParamDescriptor::view::<dyn OrderRepository>()], |args| {
///         Ok(OrderService::new(args.view::<dyn OrderRepository>(0)?))
///     })
///     .method("warm_up", |s| s.warm_up())
///     .build();
/// ```
pub struct ClassBuilder<T> {
    descriptor: ClassDescriptor,
    _marker: PhantomData<fn() -> T>,
}

fn target<T: 'static>(object: &BeanObject) -> anyhow::Result<&T> {
    object
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow!("实例不是类型 {}", std::any::type_name::<T>()))
}

impl<T: Send + Sync + 'static> ClassBuilder<T> {
    /// 以类型名作为类名
    pub fn new() -> Self {
        Self::named(infrastructure_common::short_type_name(std::any::type_name::<T>()))
    }

    /// 使用自定义类名
    pub fn named(name: impl Into<String>) -> Self {
        let mut descriptor = ClassDescriptor::opaque(TypeKey::of::<T>());
        descriptor.name = name.into();
        Self {
            descriptor,
            _marker: PhantomData,
        }
    }

    /// 声明 trait 对象视图
    pub fn alias<V: ?Sized + Send + Sync + 'static>(mut self, cast: fn(Arc<T>) -> Arc<V>) -> Self {
        let cast_fn: CastFn = Arc::new(move |object: &BeanObject| {
            downcast_bean::<T>(object).map(|concrete| view_object(cast(concrete)))
        });
        self.descriptor.casts.push((TypeKey::of::<V>(), cast_fn));
        self
    }

    /// 声明带参数的构造器
    pub fn constructor<F>(self, params: Vec<ParamDescriptor>, constructor: F) -> Self
    where
        F: Fn(&Args) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.push_constructor(params, true, constructor)
    }

    /// 非公开构造器，只在公开构造器都无法满足时才会被选择
    pub fn private_constructor<F>(self, params: Vec<ParamDescriptor>, constructor: F) -> Self
    where
        F: Fn(&Args) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.push_constructor(params, false, constructor)
    }

    /// 声明无参构造器
    pub fn no_arg_constructor<F>(self, constructor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.push_constructor(Vec::new(), true, move |_| Ok(constructor()))
    }

    /// 用 `Default` 作为无参构造器
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.no_arg_constructor(T::default)
    }

    fn push_constructor<F>(mut self, params: Vec<ParamDescriptor>, public: bool, constructor: F) -> Self
    where
        F: Fn(&Args) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let invoke: InvokeFn =
            Arc::new(move |args: &Args| constructor(args).map(|v| Arc::new(v) as BeanObject));
        self.descriptor.constructors.push(ConstructorDescriptor {
            params,
            public,
            invoke,
        });
        self
    }

    /// 声明静态工厂方法
    pub fn static_factory_method<R, F>(
        mut self,
        name: impl Into<String>,
        params: Vec<ParamDescriptor>,
        method: F,
    ) -> Self
    where
        R: Send + Sync + 'static,
        F: Fn(&Args) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        let invoke: FactoryInvokeFn = Arc::new(move |_, args: &Args| {
            method(args).map(|v| Arc::new(v) as BeanObject)
        });
        self.descriptor.factory_methods.push(FactoryMethodDescriptor {
            name: name.into(),
            is_static: true,
            params,
            return_type: TypeKey::of::<R>(),
            invoke,
        });
        self
    }

    /// 声明实例工厂方法，由持有该方法的 bean 充当 factory-bean
    pub fn factory_method<R, F>(
        mut self,
        name: impl Into<String>,
        params: Vec<ParamDescriptor>,
        method: F,
    ) -> Self
    where
        R: Send + Sync + 'static,
        F: Fn(&T, &Args) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        let invoke: FactoryInvokeFn = Arc::new(move |factory: Option<&BeanObject>, args: &Args| {
            let factory = factory.ok_or_else(|| anyhow!("实例工厂方法缺少工厂对象"))?;
            method(target::<T>(factory)?, args).map(|v| Arc::new(v) as BeanObject)
        });
        self.descriptor.factory_methods.push(FactoryMethodDescriptor {
            name: name.into(),
            is_static: false,
            params,
            return_type: TypeKey::of::<R>(),
            invoke,
        });
        self
    }

    fn push_property(
        mut self,
        name: impl Into<String>,
        type_key: TypeKey,
        kind: InjectionKind,
        setter: SetterFn,
    ) -> Self {
        self.descriptor.properties.push(PropertyDescriptor {
            name: name.into(),
            type_key,
            kind,
            required: false,
            setter,
            getter: None,
        });
        self
    }

    /// 具体类型的 bean 属性
    pub fn property<P, F>(self, name: impl Into<String>, setter: F) -> Self
    where
        P: Send + Sync + 'static,
        F: Fn(&T, Arc<P>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let setter_fn: SetterFn = Arc::new(move |object: &BeanObject, value: BeanObject| {
            let value = downcast_bean::<P>(&value)
                .ok_or_else(|| anyhow!("属性值不是类型 {}", std::any::type_name::<P>()))?;
            setter(target::<T>(object)?, value)
        });
        self.push_property(name, TypeKey::of::<P>(), InjectionKind::Bean, setter_fn)
    }

    /// trait 对象视图属性
    pub fn view_property<V, F>(self, name: impl Into<String>, setter: F) -> Self
    where
        V: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<V>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let setter_fn: SetterFn = Arc::new(move |object: &BeanObject, value: BeanObject| {
            let value = downcast_view::<V>(&value)
                .ok_or_else(|| anyhow!("属性值不是视图 {}", std::any::type_name::<V>()))?;
            setter(target::<T>(object)?, value)
        });
        self.push_property(name, TypeKey::of::<V>(), InjectionKind::Bean, setter_fn)
    }

    /// 简单值属性
    pub fn value_property<P, F>(self, name: impl Into<String>, setter: F) -> Self
    where
        P: Clone + Send + Sync + 'static,
        F: Fn(&T, P) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let setter_fn: SetterFn = Arc::new(move |object: &BeanObject, value: BeanObject| {
            let value = value
                .downcast_ref::<P>()
                .cloned()
                .ok_or_else(|| anyhow!("属性值不是类型 {}", std::any::type_name::<P>()))?;
            setter(target::<T>(object)?, value)
        });
        self.push_property(name, TypeKey::of::<P>(), InjectionKind::Value, setter_fn)
    }

    /// 多值视图属性
    pub fn list_property<V, F>(self, name: impl Into<String>, setter: F) -> Self
    where
        V: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Vec<Arc<V>>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let setter_fn: SetterFn = Arc::new(move |object: &BeanObject, value: BeanObject| {
            let list = value
                .downcast_ref::<BeanList>()
                .ok_or_else(|| anyhow!("属性值不是 bean 列表"))?;
            let views = list
                .0
                .iter()
                .map(|item| {
                    downcast_view::<V>(item)
                        .ok_or_else(|| anyhow!("列表元素不是视图 {}", std::any::type_name::<V>()))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            setter(target::<T>(object)?, views)
        });
        self.push_property(name, TypeKey::of::<V>(), InjectionKind::Multiple, setter_fn)
    }

    /// 将最近声明的属性标记为必需
    pub fn required(mut self) -> Self {
        if let Some(last) = self.descriptor.properties.last_mut() {
            last.required = true;
        }
        self
    }

    /// 为已声明的属性提供读取方法
    pub fn getter<P, F>(mut self, name: &str, getter: F) -> Self
    where
        P: Send + Sync + 'static,
        F: Fn(&T) -> Option<P> + Send + Sync + 'static,
    {
        let getter_fn: GetterFn = Arc::new(move |object: &BeanObject| {
            let this = object.downcast_ref::<T>()?;
            getter(this).map(|v| Arc::new(v) as BeanObject)
        });
        if let Some(property) = self.descriptor.properties.iter_mut().find(|p| p.name == name) {
            property.getter = Some(getter_fn);
        }
        self
    }

    /// 无参方法，可作为自定义 init/destroy 方法
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let invoke: MethodFn = Arc::new(move |object: &BeanObject| method(target::<T>(object)?));
        self.descriptor.methods.push(MethodDescriptor {
            name: name.into(),
            invoke,
        });
        self
    }

    fn push_lookup<R, F>(
        mut self,
        name: impl Into<String>,
        adapt: fn(&BeanObject) -> Option<Arc<R>>,
        bind: F,
    ) -> Self
    where
        R: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Lookup<R>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let bind_fn: LookupBindFn = Arc::new(move |object: &BeanObject, source: ObjectLookup| {
            bind(target::<T>(object)?, Lookup { source, adapt })
        });
        self.descriptor.lookup_methods.push(LookupMethodDescriptor {
            name: name.into(),
            return_type: TypeKey::of::<R>(),
            bind: bind_fn,
        });
        self
    }

    /// 返回具体类型的查找方法
    pub fn lookup_method<R, F>(self, name: impl Into<String>, bind: F) -> Self
    where
        R: Send + Sync + 'static,
        F: Fn(&T, Lookup<R>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.push_lookup(name, |object| downcast_bean::<R>(object), bind)
    }

    /// 返回 trait 对象视图的查找方法
    pub fn lookup_view<V, F>(self, name: impl Into<String>, bind: F) -> Self
    where
        V: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Lookup<V>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.push_lookup(name, |object| downcast_view::<V>(object), bind)
    }

    /// 类级别的优先级
    pub fn priority(mut self, priority: i32) -> Self {
        self.descriptor.priority = Some(priority);
        self
    }

    /// 登记 `InitializingBean` 回调
    pub fn initializing_bean(mut self) -> Self
    where
        T: InitializingBean,
    {
        self.descriptor.callbacks.initializing = Some(Arc::new(|object: &BeanObject| {
            target::<T>(object)?.after_properties_set()
        }));
        self
    }

    /// 登记 `DisposableBean` 回调
    pub fn disposable_bean(mut self) -> Self
    where
        T: DisposableBean,
    {
        self.descriptor.callbacks.disposable =
            Some(Arc::new(|object: &BeanObject| target::<T>(object)?.destroy()));
        self
    }

    /// 登记 `SmartInitializingSingleton` 回调
    pub fn smart_initializing_singleton(mut self) -> Self
    where
        T: SmartInitializingSingleton,
    {
        self.descriptor.callbacks.smart_initializing = Some(Arc::new(|object: &BeanObject| {
            target::<T>(object)?.after_singletons_instantiated()
        }));
        self
    }

    /// 登记 `BeanNameAware` 回调
    pub fn bean_name_aware(mut self) -> Self
    where
        T: BeanNameAware,
    {
        self.descriptor.callbacks.name_aware = Some(Arc::new(|object: &BeanObject, name: &str| {
            if let Some(this) = object.downcast_ref::<T>() {
                this.set_bean_name(name);
            }
        }));
        self
    }

    /// 登记 `BeanFactoryAware` 回调
    pub fn bean_factory_aware(mut self) -> Self
    where
        T: BeanFactoryAware,
    {
        self.descriptor.callbacks.factory_aware = Some(Arc::new(
            |object: &BeanObject, factory: &Arc<dyn BeanFactory>| {
                if let Some(this) = object.downcast_ref::<T>() {
                    this.set_bean_factory(factory);
                }
            },
        ));
        self
    }

    /// 登记 `ClassRegistryAware` 回调
    pub fn class_registry_aware(mut self) -> Self
    where
        T: ClassRegistryAware,
    {
        self.descriptor.callbacks.registry_aware = Some(Arc::new(
            |object: &BeanObject, registry: &Arc<dyn ClassRegistry>| {
                if let Some(this) = object.downcast_ref::<T>() {
                    this.set_class_registry(registry);
                }
            },
        ));
        self
    }

    /// 生成类描述符
    pub fn build(self) -> Arc<ClassDescriptor> {
        Arc::new(self.descriptor)
    }
}

impl<T: Send + Sync + 'static> Default for ClassBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
