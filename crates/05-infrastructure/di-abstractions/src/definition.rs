//! bean 定义模型
//!
//! 一个逻辑组件名对应一个 [`BeanDefinition`]。定义本身只描述“如何创建”，
//! 不持有实例；配置加载器产生定义并注册到 [`BeanDefinitionRegistry`](crate::BeanDefinitionRegistry)。

use crate::class::ClassDescriptor;
use infrastructure_common::{
    BeanError, BeanObject, BeanResult, SCOPE_DEFAULT, SCOPE_PROTOTYPE, SCOPE_SINGLETON,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// bean 类引用
#[derive(Debug, Clone)]
pub enum BeanClassRef {
    /// 类名，创建时通过类注册表解析
    Name(String),
    /// 已解析的类描述符
    Resolved(Arc<ClassDescriptor>),
}

impl BeanClassRef {
    /// 类名
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Resolved(class) => class.name(),
        }
    }
}

/// 自动装配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutowireMode {
    /// 不自动装配
    #[default]
    No,
    /// 按属性名称
    ByName,
    /// 按属性类型
    ByType,
    /// 构造器自动装配
    Constructor,
}

/// bean 的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeanRole {
    #[default]
    Application,
    Support,
    Infrastructure,
}

/// 属性值或构造器参数值
#[derive(Debug, Clone)]
pub enum BeanValue {
    /// 对另一个 bean 的引用（按名称）
    Reference(String),
    /// 内部 bean
    Inner {
        name: Option<String>,
        definition: Box<BeanDefinition>,
    },
    /// 字符串字面量，可能包含占位符，注入时按目标类型转换
    Literal(String),
    /// 值列表
    List(Vec<BeanValue>),
    /// 已经存在的对象
    Object(BeanObject),
    /// 空值
    Null,
}

impl BeanValue {
    /// 按名称引用另一个 bean
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference(name.into())
    }

    /// 字面量，注入时按目标类型转换
    pub fn literal(value: impl ToString) -> Self {
        Self::Literal(value.to_string())
    }

    /// 内部 bean
    pub fn inner(definition: BeanDefinition) -> Self {
        Self::Inner {
            name: None,
            definition: Box::new(definition),
        }
    }

    /// 直接注入的对象
    pub fn object<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Object(Arc::new(value))
    }

    /// 值在解析时是否需要访问工厂（引用、内部 bean）
    pub fn requires_resolution(&self) -> bool {
        match self {
            Self::Reference(_) | Self::Inner { .. } => true,
            Self::List(items) => items.iter().any(Self::requires_resolution),
            _ => false,
        }
    }
}

/// 构造器参数值
#[derive(Debug, Clone)]
pub struct ValueHolder {
    /// 参数值
    pub value: BeanValue,
    /// 期望的参数类型名称
    pub type_name: Option<String>,
    /// 期望的参数名称
    pub name: Option<String>,
}

impl ValueHolder {
    /// 只带值的参数
    pub fn new(value: BeanValue) -> Self {
        Self {
            value,
            type_name: None,
            name: None,
        }
    }

    /// 限定期望的参数类型
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// 限定期望的参数名
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// 构造器参数集合（按索引 + 通用）
#[derive(Debug, Clone, Default)]
pub struct ConstructorArgumentValues {
    indexed: BTreeMap<usize, ValueHolder>,
    generic: Vec<ValueHolder>,
}

impl ConstructorArgumentValues {
    /// 添加指定下标的参数
    pub fn add_indexed(&mut self, index: usize, holder: ValueHolder) {
        self.indexed.insert(index, holder);
    }

    /// 添加未指定下标的参数
    pub fn add_generic(&mut self, holder: ValueHolder) {
        self.generic.push(holder);
    }

    /// 按下标的参数
    pub fn indexed(&self) -> &BTreeMap<usize, ValueHolder> {
        &self.indexed
    }

    /// 可变遍历按下标的参数
    pub fn indexed_mut(&mut self) -> impl Iterator<Item = &mut ValueHolder> {
        self.indexed.values_mut()
    }

    /// 未指定下标的参数
    pub fn generic(&self) -> &[ValueHolder] {
        &self.generic
    }

    /// 可变遍历未指定下标的参数
    pub fn generic_mut(&mut self) -> impl Iterator<Item = &mut ValueHolder> {
        self.generic.iter_mut()
    }

    /// 参数总数
    pub fn argument_count(&self) -> usize {
        self.indexed.len() + self.generic.len()
    }

    /// 是否没有任何参数
    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty() && self.generic.is_empty()
    }

    /// 用另一组参数覆盖（子定义覆盖父定义）
    pub fn add_all(&mut self, other: &ConstructorArgumentValues) {
        for (index, holder) in &other.indexed {
            self.indexed.insert(*index, holder.clone());
        }
        self.generic.extend(other.generic.iter().cloned());
    }
}

/// 单个属性值
#[derive(Debug, Clone)]
pub struct PropertyValue {
    /// 属性名
    pub name: String,
    /// 属性值
    pub value: BeanValue,
}

/// 属性值集合，保持声明顺序
#[derive(Debug, Clone, Default)]
pub struct PropertyValues {
    values: Vec<PropertyValue>,
}

impl PropertyValues {
    /// 空的属性值集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加属性值，同名属性会被替换
    pub fn add(&mut self, name: impl Into<String>, value: BeanValue) {
        let name = name.into();
        match self.values.iter_mut().find(|pv| pv.name == name) {
            Some(existing) => existing.value = value,
            None => self.values.push(PropertyValue { name, value }),
        }
    }

    /// 按属性名取值
    pub fn get(&self, name: &str) -> Option<&BeanValue> {
        self.values.iter().find(|pv| pv.name == name).map(|pv| &pv.value)
    }

    /// 是否设置了该属性
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 移除属性，返回原值
    pub fn remove(&mut self, name: &str) -> Option<BeanValue> {
        let index = self.values.iter().position(|pv| pv.name == name)?;
        Some(self.values.remove(index).value)
    }

    /// 按设置顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &PropertyValue> {
        self.values.iter()
    }

    /// 按设置顺序可变遍历
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PropertyValue> {
        self.values.iter_mut()
    }

    /// 属性个数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 合并另一组属性值，后者优先
    pub fn add_all(&mut self, other: &PropertyValues) {
        for pv in &other.values {
            self.add(pv.name.clone(), pv.value.clone());
        }
    }
}

/// 方法覆盖
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodOverride {
    /// 查找方法：每次调用都从工厂取得目标 bean。`bean` 为空时按返回类型查找。
    Lookup { method: String, bean: Option<String> },
}

impl MethodOverride {
    /// 被覆盖的方法名
    pub fn method_name(&self) -> &str {
        match self {
            Self::Lookup { method, .. } => method,
        }
    }
}

/// 实例提供者
#[derive(Clone)]
pub struct InstanceSupplier(Arc<dyn Fn() -> anyhow::Result<BeanObject> + Send + Sync>);

impl InstanceSupplier {
    /// 包装实例提供函数
    pub fn new<F>(supplier: F) -> Self
    where
        F: Fn() -> anyhow::Result<BeanObject> + Send + Sync + 'static,
    {
        Self(Arc::new(supplier))
    }

    /// 调用提供函数
    pub fn get(&self) -> anyhow::Result<BeanObject> {
        (self.0)()
    }
}

impl fmt::Debug for InstanceSupplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InstanceSupplier")
    }
}

/// bean 定义
#[derive(Debug, Clone)]
pub struct BeanDefinition {
    /// bean 的类
    pub bean_class: Option<BeanClassRef>,
    /// 父定义名称
    pub parent_name: Option<String>,
    /// 作用域名称，空字符串表示默认（单例）
    pub scope: String,
    /// 是否为抽象定义（只能被继承）
    pub is_abstract: bool,
    /// `None` 表示未设置（合并时沿用父定义）
    pub lazy_init: Option<bool>,
    /// 自动装配模式
    pub autowire_mode: AutowireMode,
    /// 必须先于本 bean 初始化的 bean
    pub depends_on: Vec<String>,
    /// 能否作为其他 bean 的自动装配候选
    pub autowire_candidate: bool,
    /// 是否为首选候选
    pub primary: bool,
    /// 限定符
    pub qualifiers: Vec<String>,
    /// 候选选择时使用的优先级
    pub priority: Option<i32>,
    /// 实例提供者，优先于构造器和工厂方法
    pub instance_supplier: Option<InstanceSupplier>,
    /// 实例工厂方法所在的 bean
    pub factory_bean_name: Option<String>,
    /// 工厂方法名
    pub factory_method_name: Option<String>,
    /// 构造器参数
    pub constructor_args: ConstructorArgumentValues,
    /// 属性值
    pub property_values: PropertyValues,
    /// 方法覆盖
    pub method_overrides: Vec<MethodOverride>,
    /// 自定义 init 方法
    pub init_method_names: Vec<String>,
    /// 找不到 init 方法时是否报错
    pub enforce_init_method: bool,
    /// 自定义 destroy 方法
    pub destroy_method_names: Vec<String>,
    /// 找不到 destroy 方法时是否报错
    pub enforce_destroy_method: bool,
    /// 是否为框架内部合成的定义
    pub synthetic: bool,
    /// 角色
    pub role: BeanRole,
    /// 描述
    pub description: Option<String>,
}

impl Default for BeanDefinition {
    fn default() -> Self {
        Self {
            bean_class: None,
            parent_name: None,
            scope: SCOPE_DEFAULT.to_string(),
            is_abstract: false,
            lazy_init: None,
            autowire_mode: AutowireMode::No,
            depends_on: Vec::new(),
            autowire_candidate: true,
            primary: false,
            qualifiers: Vec::new(),
            priority: None,
            instance_supplier: None,
            factory_bean_name: None,
            factory_method_name: None,
            constructor_args: ConstructorArgumentValues::default(),
            property_values: PropertyValues::default(),
            method_overrides: Vec::new(),
            init_method_names: Vec::new(),
            enforce_init_method: false,
            destroy_method_names: Vec::new(),
            enforce_destroy_method: false,
            synthetic: false,
            role: BeanRole::Application,
            description: None,
        }
    }
}

impl BeanDefinition {
    /// 空定义（没有类）
    pub fn new() -> Self {
        Self::default()
    }

    /// 按类名创建定义
    pub fn for_class_name(class_name: impl Into<String>) -> Self {
        Self {
            bean_class: Some(BeanClassRef::Name(class_name.into())),
            ..Self::new()
        }
    }

    /// 按已解析的类创建定义
    pub fn for_class(class: Arc<ClassDescriptor>) -> Self {
        Self {
            bean_class: Some(BeanClassRef::Resolved(class)),
            ..Self::new()
        }
    }

    /// 子定义，从父定义继承设置
    pub fn child(parent_name: impl Into<String>) -> Self {
        Self {
            parent_name: Some(parent_name.into()),
            ..Self::new()
        }
    }

    /// 由实例提供者创建的定义
    pub fn supplied<F>(supplier: F) -> Self
    where
        F: Fn() -> anyhow::Result<BeanObject> + Send + Sync + 'static,
    {
        Self {
            instance_supplier: Some(InstanceSupplier::new(supplier)),
            ..Self::new()
        }
    }

    /// 设置作用域
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// 设置为原型作用域
    pub fn with_prototype_scope(self) -> Self {
        self.with_scope(SCOPE_PROTOTYPE)
    }

    /// 设置是否为抽象定义
    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    /// 设置是否延迟初始化
    pub fn with_lazy_init(mut self, lazy_init: bool) -> Self {
        self.lazy_init = Some(lazy_init);
        self
    }

    /// 设置自动装配模式
    pub fn with_autowire_mode(mut self, mode: AutowireMode) -> Self {
        self.autowire_mode = mode;
        self
    }

    /// 追加 depends-on 的 bean
    pub fn with_depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// 设置能否作为自动装配候选
    pub fn with_autowire_candidate(mut self, candidate: bool) -> Self {
        self.autowire_candidate = candidate;
        self
    }

    /// 设置是否为首选候选
    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    /// 追加限定符
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.push(qualifier.into());
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// 设置 factory-bean
    pub fn with_factory_bean(mut self, factory_bean: impl Into<String>) -> Self {
        self.factory_bean_name = Some(factory_bean.into());
        self
    }

    /// 设置工厂方法名
    pub fn with_factory_method(mut self, method: impl Into<String>) -> Self {
        self.factory_method_name = Some(method.into());
        self
    }

    /// 设置指定下标的构造器参数
    pub fn with_constructor_arg(mut self, index: usize, value: BeanValue) -> Self {
        self.constructor_args.add_indexed(index, ValueHolder::new(value));
        self
    }

    /// 追加未指定下标的构造器参数
    pub fn with_generic_arg(mut self, holder: ValueHolder) -> Self {
        self.constructor_args.add_generic(holder);
        self
    }

    /// 设置属性值
    pub fn with_property(mut self, name: impl Into<String>, value: BeanValue) -> Self {
        self.property_values.add(name, value);
        self
    }

    /// 声明查找方法；`bean` 为空时按返回类型查找
    pub fn with_lookup_method(mut self, method: impl Into<String>, bean: Option<&str>) -> Self {
        self.method_overrides.push(MethodOverride::Lookup {
            method: method.into(),
            bean: bean.map(str::to_string),
        });
        self
    }

    /// 追加 init 方法
    pub fn with_init_method(mut self, method: impl Into<String>) -> Self {
        self.init_method_names.push(method.into());
        self
    }

    /// 设置找不到 init 方法时是否报错
    pub fn with_enforce_init_method(mut self, enforce: bool) -> Self {
        self.enforce_init_method = enforce;
        self
    }

    /// 追加 destroy 方法
    pub fn with_destroy_method(mut self, method: impl Into<String>) -> Self {
        self.destroy_method_names.push(method.into());
        self
    }

    /// 设置找不到 destroy 方法时是否报错
    pub fn with_enforce_destroy_method(mut self, enforce: bool) -> Self {
        self.enforce_destroy_method = enforce;
        self
    }

    /// 设置是否为合成定义
    pub fn with_synthetic(mut self, synthetic: bool) -> Self {
        self.synthetic = synthetic;
        self
    }

    /// 设置角色
    pub fn with_role(mut self, role: BeanRole) -> Self {
        self.role = role;
        self
    }

    /// 设置描述
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 类名，未设置类时为 `None`
    pub fn class_name(&self) -> Option<&str> {
        self.bean_class.as_ref().map(BeanClassRef::name)
    }

    /// 是否为单例作用域
    pub fn is_singleton(&self) -> bool {
        self.scope == SCOPE_SINGLETON || self.scope == SCOPE_DEFAULT
    }

    /// 是否为原型作用域
    pub fn is_prototype(&self) -> bool {
        self.scope == SCOPE_PROTOTYPE
    }

    /// 是否延迟初始化
    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init.unwrap_or(false)
    }

    /// 注册前的结构校验
    pub fn validate(&self) -> Result<(), String> {
        if !self.method_overrides.is_empty() && self.factory_method_name.is_some() {
            return Err("不能同时使用工厂方法和方法覆盖: 工厂方法需要返回已创建的实例".to_string());
        }
        if self.enforce_init_method && self.init_method_names.is_empty() {
            return Err("强制 init 方法但没有指定方法名".to_string());
        }
        if self.enforce_destroy_method && self.destroy_method_names.is_empty() {
            return Err("强制 destroy 方法但没有指定方法名".to_string());
        }
        if self.factory_bean_name.is_some() && self.factory_method_name.is_none() {
            return Err("指定了 factory-bean 但没有指定工厂方法".to_string());
        }
        Ok(())
    }

    /// 校验方法覆盖引用的方法都存在于类中
    pub fn validate_method_overrides(&self, name: &str, class: &ClassDescriptor) -> BeanResult<()> {
        for method_override in &self.method_overrides {
            if class.lookup_method(method_override.method_name()).is_none() {
                return Err(BeanError::DefinitionValidation {
                    name: name.to_string(),
                    message: format!(
                        "类 [{}] 上不存在名为 '{}' 的查找方法",
                        class.name(),
                        method_override.method_name()
                    ),
                });
            }
        }
        Ok(())
    }

    /// 用子定义的设置覆盖当前（父）定义
    pub fn override_from(&mut self, child: &BeanDefinition) {
        if child.bean_class.is_some() {
            self.bean_class = child.bean_class.clone();
        }
        if !child.scope.is_empty() {
            self.scope = child.scope.clone();
        }
        self.is_abstract = child.is_abstract;
        if child.lazy_init.is_some() {
            self.lazy_init = child.lazy_init;
        }
        if child.instance_supplier.is_some() {
            self.instance_supplier = child.instance_supplier.clone();
        }
        if child.factory_bean_name.is_some() {
            self.factory_bean_name = child.factory_bean_name.clone();
        }
        if child.factory_method_name.is_some() {
            self.factory_method_name = child.factory_method_name.clone();
        }
        self.autowire_mode = child.autowire_mode;
        if !child.depends_on.is_empty() {
            self.depends_on = child.depends_on.clone();
        }
        self.autowire_candidate = child.autowire_candidate;
        self.primary = child.primary;
        for qualifier in &child.qualifiers {
            if !self.qualifiers.contains(qualifier) {
                self.qualifiers.push(qualifier.clone());
            }
        }
        if child.priority.is_some() {
            self.priority = child.priority;
        }
        self.constructor_args.add_all(&child.constructor_args);
        self.property_values.add_all(&child.property_values);
        for method_override in &child.method_overrides {
            if !self.method_overrides.contains(method_override) {
                self.method_overrides.push(method_override.clone());
            }
        }
        if !child.init_method_names.is_empty() {
            self.init_method_names = child.init_method_names.clone();
            self.enforce_init_method = child.enforce_init_method;
        }
        if !child.destroy_method_names.is_empty() {
            self.destroy_method_names = child.destroy_method_names.clone();
            self.enforce_destroy_method = child.enforce_destroy_method;
        }
        self.synthetic = child.synthetic;
        self.role = child.role;
        if child.description.is_some() {
            self.description = child.description.clone();
        }
    }
}
