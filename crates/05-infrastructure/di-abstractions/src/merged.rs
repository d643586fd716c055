//! 合并后的 bean 定义
//!
//! 父子定义链展开后的结果，同时承载创建过程中的各类缓存。缓存使用定义级别的锁，
//! 与全局单例锁相互独立。

use crate::class::ClassDescriptor;
use crate::definition::{AutowireMode, BeanDefinition, BeanValue};
use infrastructure_common::{BeanObject, TypeKey};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 已解析的构造器或工厂方法（在类描述符中的下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedExecutable {
    Constructor(usize),
    FactoryMethod(usize),
}

/// 需要在每次创建时重新解析的参数
#[derive(Debug, Clone)]
pub enum PreparedArgument {
    /// 自动装配的参数
    Autowired,
    /// 定义中声明的原始值
    Value(BeanValue),
}

/// 构造器解析缓存
#[derive(Debug, Default)]
pub struct ConstructorCache {
    /// 选中的构造器或工厂方法
    pub resolved: Option<ResolvedExecutable>,
    /// 参数是否已完全解析
    pub args_resolved: bool,
    /// 完全解析后的参数
    pub resolved_args: Option<Vec<Option<BeanObject>>>,
    /// 每次创建时需要重新解析的参数
    pub prepared_args: Option<Vec<PreparedArgument>>,
}

/// 合并后的 bean 定义
#[derive(Debug)]
pub struct RootBeanDefinition {
    name: String,
    definition: BeanDefinition,
    resolved_class: RwLock<Option<Arc<ClassDescriptor>>>,
    factory_method_return_type: RwLock<Option<TypeKey>>,
    constructor_cache: Mutex<ConstructorCache>,
    post_processed: Mutex<bool>,
    before_instantiation_resolved: Mutex<Option<bool>>,
    externally_managed_init_methods: RwLock<HashSet<String>>,
    externally_managed_destroy_methods: RwLock<HashSet<String>>,
    stale: AtomicBool,
}

impl RootBeanDefinition {
    /// 由名称和已合并的定义构造
    pub fn new(name: impl Into<String>, definition: BeanDefinition) -> Self {
        let resolved = match &definition.bean_class {
            Some(crate::definition::BeanClassRef::Resolved(class)) => Some(class.clone()),
            _ => None,
        };
        Self {
            name: name.into(),
            definition,
            resolved_class: RwLock::new(resolved),
            factory_method_return_type: RwLock::new(None),
            constructor_cache: Mutex::new(ConstructorCache::default()),
            post_processed: Mutex::new(false),
            before_instantiation_resolved: Mutex::new(None),
            externally_managed_init_methods: RwLock::new(HashSet::new()),
            externally_managed_destroy_methods: RwLock::new(HashSet::new()),
            stale: AtomicBool::new(false),
        }
    }

    /// bean 名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 合并后的原始定义
    pub fn definition(&self) -> &BeanDefinition {
        &self.definition
    }

    /// 作用域名称，空字符串视为单例
    pub fn scope(&self) -> &str {
        &self.definition.scope
    }

    /// 是否为单例作用域
    pub fn is_singleton(&self) -> bool {
        self.definition.is_singleton()
    }

    /// 是否为原型作用域
    pub fn is_prototype(&self) -> bool {
        self.definition.is_prototype()
    }

    /// 是否为抽象定义
    pub fn is_abstract(&self) -> bool {
        self.definition.is_abstract
    }

    /// 是否为合成定义
    pub fn is_synthetic(&self) -> bool {
        self.definition.synthetic
    }

    /// 是否延迟初始化
    pub fn is_lazy_init(&self) -> bool {
        self.definition.is_lazy_init()
    }

    /// 自动装配模式
    pub fn autowire_mode(&self) -> AutowireMode {
        self.definition.autowire_mode
    }

    /// 是否声明了构造器参数
    pub fn has_constructor_argument_values(&self) -> bool {
        !self.definition.constructor_args.is_empty()
    }

    /// 是否声明了方法覆盖
    pub fn has_method_overrides(&self) -> bool {
        !self.definition.method_overrides.is_empty()
    }

    /// 已解析的类
    pub fn resolved_class(&self) -> Option<Arc<ClassDescriptor>> {
        self.resolved_class.read().clone()
    }

    /// 记录解析出的类
    pub fn set_resolved_class(&self, class: Arc<ClassDescriptor>) {
        *self.resolved_class.write() = Some(class);
    }

    /// 工厂方法的返回类型
    pub fn factory_method_return_type(&self) -> Option<TypeKey> {
        *self.factory_method_return_type.read()
    }

    /// 记录工厂方法的返回类型
    pub fn set_factory_method_return_type(&self, key: TypeKey) {
        *self.factory_method_return_type.write() = Some(key);
    }

    /// 构造器缓存（定义级别的锁）
    pub fn constructor_cache(&self) -> MutexGuard<'_, ConstructorCache> {
        self.constructor_cache.lock()
    }

    /// 合并定义后置处理锁，值为 true 表示已经处理过
    pub fn post_processing_lock(&self) -> MutexGuard<'_, bool> {
        self.post_processed.lock()
    }

    /// 合并定义后置处理器是否已经执行
    pub fn is_post_processed(&self) -> bool {
        *self.post_processed.lock()
    }

    /// 实例化前置处理的结果，`None` 表示尚未执行
    pub fn before_instantiation_resolved(&self) -> Option<bool> {
        *self.before_instantiation_resolved.lock()
    }

    /// 记录实例化前置处理的结果
    pub fn set_before_instantiation_resolved(&self, resolved: bool) {
        *self.before_instantiation_resolved.lock() = Some(resolved);
    }

    /// 标记由外部（例如后置处理器）负责调用的 init 方法
    pub fn register_externally_managed_init_method(&self, method: impl Into<String>) {
        self.externally_managed_init_methods.write().insert(method.into());
    }

    /// init 方法是否已由外部调用
    pub fn is_externally_managed_init_method(&self, method: &str) -> bool {
        self.externally_managed_init_methods.read().contains(method)
    }

    /// 登记由外部调用的 destroy 方法
    pub fn register_externally_managed_destroy_method(&self, method: impl Into<String>) {
        self.externally_managed_destroy_methods
            .write()
            .insert(method.into());
    }

    /// destroy 方法是否已由外部调用
    pub fn is_externally_managed_destroy_method(&self, method: &str) -> bool {
        self.externally_managed_destroy_methods.read().contains(method)
    }

    /// 定义是否已过期，需要重新合并
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// 标记为过期
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }
}
