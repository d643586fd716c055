//! 集成测试共用的夹具
#![allow(dead_code)]

use di_abstractions::{set_once, ClassBuilder, ClassDescriptor, ParamDescriptor};
use di_impl::{DefaultClassRegistry, DefaultListableBeanFactory};
use infrastructure_common::{DisposableBean, InitializingBean};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// 初始化测试日志，`RUST_LOG` 控制级别
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn new_factory() -> Arc<DefaultListableBeanFactory> {
    init_test_logger();
    DefaultListableBeanFactory::new(Arc::new(DefaultClassRegistry::new()))
}

/// 记录回调顺序
pub type Events = Arc<Mutex<Vec<String>>>;

pub fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn snapshot(events: &Events) -> Vec<String> {
    events.lock().clone()
}

pub trait Repository: Send + Sync {
    fn kind(&self) -> &'static str;
}

#[derive(Default)]
pub struct MemoryRepository;

impl Repository for MemoryRepository {
    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[derive(Default)]
pub struct SqlRepository;

impl Repository for SqlRepository {
    fn kind(&self) -> &'static str {
        "sql"
    }
}

#[derive(Default)]
pub struct FileRepository;

impl Repository for FileRepository {
    fn kind(&self) -> &'static str {
        "file"
    }
}

fn as_repository<T: Repository + 'static>(repository: Arc<T>) -> Arc<dyn Repository> {
    repository
}

pub fn repository_class<T: Repository + Default + 'static>() -> Arc<ClassDescriptor> {
    ClassBuilder::<T>::new()
        .alias::<dyn Repository>(as_repository::<T>)
        .default_constructor()
        .build()
}

pub fn prioritized_repository_class<T: Repository + Default + 'static>(priority: i32) -> Arc<ClassDescriptor> {
    ClassBuilder::<T>::new()
        .alias::<dyn Repository>(as_repository::<T>)
        .default_constructor()
        .priority(priority)
        .build()
}

/// 构造器注入单个仓储
pub struct OrderService {
    pub repository: Arc<dyn Repository>,
}

pub fn order_service_class() -> Arc<ClassDescriptor> {
    ClassBuilder::<OrderService>::new()
        .constructor(vec![ParamDescriptor::view::<dyn Repository>()], |args| {
            Ok(OrderService {
                repository: args.view::<dyn Repository>(0)?,
            })
        })
        .build()
}

/// 参数名参与候选选择
pub fn named_order_service_class(param_name: &str) -> Arc<ClassDescriptor> {
    ClassBuilder::<OrderService>::named(format!("OrderService[{}]", param_name))
        .constructor(
            vec![ParamDescriptor::view::<dyn Repository>().named(param_name)],
            |args| {
                Ok(OrderService {
                    repository: args.view::<dyn Repository>(0)?,
                })
            },
        )
        .build()
}

/// 属性注入：单个可选仓储与全部仓储
#[derive(Default)]
pub struct ReportService {
    pub primary: OnceCell<Arc<dyn Repository>>,
    pub all: OnceCell<Vec<Arc<dyn Repository>>>,
}

pub fn report_service_class() -> Arc<ClassDescriptor> {
    ClassBuilder::<ReportService>::new()
        .default_constructor()
        .view_property::<dyn Repository, _>("repository", |this, value| set_once(&this.primary, value))
        .list_property::<dyn Repository, _>("repositories", |this, value| set_once(&this.all, value))
        .build()
}

/// 记录生命周期回调的组件
pub struct Tracked {
    pub events: Events,
    pub label: String,
    pub peer: OnceCell<Arc<Tracked>>,
}

impl Tracked {
    fn record(&self, event: &str) {
        self.events.lock().push(format!("{}:{}", self.label, event));
    }
}

impl InitializingBean for Tracked {
    fn after_properties_set(&self) -> anyhow::Result<()> {
        self.record("after_properties_set");
        Ok(())
    }
}

impl DisposableBean for Tracked {
    fn destroy(&self) -> anyhow::Result<()> {
        self.record("destroy");
        Ok(())
    }
}

pub fn tracked_class(label: &str, events: &Events) -> Arc<ClassDescriptor> {
    let events = events.clone();
    let label = label.to_string();
    ClassBuilder::<Tracked>::named(format!("Tracked[{}]", label))
        .no_arg_constructor(move || Tracked {
            events: events.clone(),
            label: label.clone(),
            peer: OnceCell::new(),
        })
        .property::<Tracked, _>("peer", |this, value| set_once(&this.peer, value))
        .method("init", |this| {
            this.record("init");
            Ok(())
        })
        .method("close", |this| {
            this.record("close");
            Ok(())
        })
        .method("explode", |this| {
            this.record("explode");
            anyhow::bail!("{} 销毁失败", this.label)
        })
        .initializing_bean()
        .disposable_bean()
        .build()
}

/// 属性循环引用的两端
#[derive(Default)]
pub struct Alpha {
    pub beta: OnceCell<Arc<Beta>>,
}

#[derive(Default)]
pub struct Beta {
    pub alpha: OnceCell<Arc<Alpha>>,
}

pub fn alpha_class() -> Arc<ClassDescriptor> {
    ClassBuilder::<Alpha>::new()
        .default_constructor()
        .property::<Beta, _>("beta", |this, value| set_once(&this.beta, value))
        .build()
}

pub fn beta_class() -> Arc<ClassDescriptor> {
    ClassBuilder::<Beta>::new()
        .default_constructor()
        .property::<Alpha, _>("alpha", |this, value| set_once(&this.alpha, value))
        .build()
}
