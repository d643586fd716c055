//! # 示例应用程序
//!
//! 用 bean 工厂装配一个小型订单处理对象图：构造器注入、首选候选、占位符、
//! 请求作用域和查找方法，最后按依赖顺序关闭。

use clap::Parser;
use di_abstractions::{
    set_once, AliasRegistry, BeanDefinition, BeanDefinitionRegistry, BeanFactoryExt, BeanValue, ClassBuilder,
    ClassDescriptor, ConfigurableBeanFactory, FactoryPostProcessor, Lookup, ParamDescriptor, SingletonBeanRegistry,
};
use di_impl::{BeanFactoryConfig, ContextScope, DefaultClassRegistry, DefaultListableBeanFactory, PlaceholderConfigurer};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

const SCOPE_REQUEST: &str = "request";

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "bean 工厂示例应用")]
struct Args {
    /// 工厂配置文件（TOML）；缺省时读取 config/beans 和 BEANS_ 环境变量
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 占位符属性文件
    #[arg(short, long)]
    properties: Option<PathBuf>,

    /// 模拟的请求数量
    #[arg(long, default_value_t = 3)]
    requests: usize,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 以 JSON 格式输出日志
    #[arg(long)]
    json: bool,
}

trait Repository: Send + Sync {
    fn save(&self, order: &str) -> usize;
    fn kind(&self) -> &'static str;
}

#[derive(Default)]
struct MemoryRepository {
    orders: Mutex<Vec<String>>,
}

impl Repository for MemoryRepository {
    fn save(&self, order: &str) -> usize {
        let mut orders = self.orders.lock();
        orders.push(order.to_string());
        orders.len()
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[derive(Default)]
struct AuditRepository;

impl Repository for AuditRepository {
    fn save(&self, order: &str) -> usize {
        info!("审计订单 {}", order);
        0
    }

    fn kind(&self) -> &'static str {
        "audit"
    }
}

fn as_repository<T: Repository + 'static>(repository: Arc<T>) -> Arc<dyn Repository> {
    repository
}

fn repository_class<T: Repository + Default + 'static>() -> Arc<ClassDescriptor> {
    ClassBuilder::<T>::new()
        .alias::<dyn Repository>(as_repository::<T>)
        .default_constructor()
        .build()
}

/// 每个请求一个实例
struct RequestContext {
    serial: usize,
}

fn request_context_class() -> Arc<ClassDescriptor> {
    let counter = Arc::new(AtomicUsize::new(1));
    ClassBuilder::<RequestContext>::new()
        .no_arg_constructor(move || RequestContext {
            serial: counter.fetch_add(1, Ordering::SeqCst),
        })
        .method("close", |this| {
            info!("请求 #{} 结束", this.serial);
            Ok(())
        })
        .build()
}

#[derive(Default)]
struct Settings {
    region: OnceCell<String>,
    batch: OnceCell<u32>,
}

fn settings_class() -> Arc<ClassDescriptor> {
    ClassBuilder::<Settings>::new()
        .default_constructor()
        .value_property::<String, _>("region", |this, value| set_once(&this.region, value))
        .value_property::<u32, _>("batch", |this, value| set_once(&this.batch, value))
        .build()
}

struct OrderService {
    repository: Arc<dyn Repository>,
    settings: Arc<Settings>,
    request: OnceCell<Lookup<RequestContext>>,
}

impl OrderService {
    fn place(&self, item: &str) -> anyhow::Result<usize> {
        let request = self
            .request
            .get()
            .ok_or_else(|| anyhow::anyhow!("查找方法 current_request 未绑定"))?
            .get()?;
        let region = self.settings.region.get().map(String::as_str).unwrap_or("unknown");
        let order = format!("{}#{}@{}", item, request.serial, region);
        Ok(self.repository.save(&order))
    }
}

fn order_service_class() -> Arc<ClassDescriptor> {
    ClassBuilder::<OrderService>::new()
        .constructor(
            vec![ParamDescriptor::view::<dyn Repository>(), ParamDescriptor::bean::<Settings>()],
            |args| {
                Ok(OrderService {
                    repository: args.view::<dyn Repository>(0)?,
                    settings: args.bean::<Settings>(1)?,
                    request: OnceCell::new(),
                })
            },
        )
        .lookup_method::<RequestContext, _>("current_request", |this, lookup| {
            this.request
                .set(lookup)
                .map_err(|_| anyhow::anyhow!("查找方法 current_request 重复绑定"))
        })
        .build()
}

fn init_logging(args: &Args) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if args.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("初始化日志失败: {}", e);
    }
}

fn build_factory(args: &Args) -> anyhow::Result<(Arc<DefaultListableBeanFactory>, Arc<ContextScope>)> {
    let config = match &args.config {
        Some(path) => BeanFactoryConfig::from_file(path)?,
        None => BeanFactoryConfig::load()?,
    };
    let factory = DefaultListableBeanFactory::with_config(Arc::new(DefaultClassRegistry::new()), config);

    let scope = Arc::new(ContextScope::new(SCOPE_REQUEST));
    factory.register_scope(SCOPE_REQUEST, scope.clone())?;

    factory.register_bean_definition(
        "memoryRepository",
        BeanDefinition::for_class(repository_class::<MemoryRepository>()).with_primary(true),
    )?;
    factory.register_bean_definition(
        "auditRepository",
        BeanDefinition::for_class(repository_class::<AuditRepository>()),
    )?;
    factory.register_bean_definition(
        "settings",
        BeanDefinition::for_class(settings_class())
            .with_property("region", BeanValue::literal("${app.region:local}"))
            .with_property("batch", BeanValue::literal("${app.batch:16}")),
    )?;
    factory.register_bean_definition(
        "requestContext",
        BeanDefinition::for_class(request_context_class())
            .with_scope(SCOPE_REQUEST)
            .with_destroy_method("close"),
    )?;
    factory.register_bean_definition(
        "orderService",
        BeanDefinition::for_class(order_service_class()).with_lookup_method("current_request", None),
    )?;
    factory.register_alias("orderService", "orders")?;
    Ok((factory, scope))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args);
    info!("启动示例应用");

    let (factory, scope) = build_factory(&args)?;
    let placeholders = match &args.properties {
        Some(path) => PlaceholderConfigurer::from_file(path)?,
        None => PlaceholderConfigurer::new(Default::default()),
    };
    factory.refresh(&[FactoryPostProcessor::Regular(Arc::new(placeholders))])?;
    info!("容器就绪, {} 个单例", factory.singleton_count());

    let service = factory.get_typed::<OrderService>("orders")?;
    let settings = factory.get_typed::<Settings>("settings")?;
    info!(
        "区域 {}, 批大小 {}",
        settings.region.get().map(String::as_str).unwrap_or("unknown"),
        settings.batch.get().copied().unwrap_or_default()
    );

    for i in 0..args.requests {
        scope.begin()?;
        let result = service.place(&format!("order-{}", i));
        scope.end();
        match result {
            Ok(count) => info!("订单 order-{} 已保存, 当前共 {} 条", i, count),
            Err(e) => warn!("订单 order-{} 处理失败: {:#}", i, e),
        }
    }

    // 并发读取已创建的单例
    let mut readers = Vec::new();
    for _ in 0..4 {
        let factory = factory.clone();
        readers.push(tokio::task::spawn_blocking(move || {
            factory
                .resolve_view::<dyn Repository>()
                .map(|repository| repository.kind())
        }));
    }
    for reader in readers {
        let kind = reader.await??;
        info!("按类型解析到 {} 仓储", kind);
    }

    factory.shutdown();
    info!("应用已关闭");
    Ok(())
}
