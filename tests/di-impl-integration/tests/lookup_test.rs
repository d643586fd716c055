//! 查找方法、工厂方法、内部 bean 与占位符的端到端装配

mod common;

use common::*;
use di_abstractions::{
    set_once, AutowireMode, BeanDefinition, BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, BeanValue,
    ClassBuilder, ClassDescriptor, ConfigurableBeanFactory, FactoryPostProcessor, ListableBeanFactory, Lookup,
    ParamDescriptor,
};
use di_impl::PlaceholderConfigurer;
use infrastructure_common::TypeKey;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Cart {
    serial: usize,
}

fn cart_class() -> Arc<ClassDescriptor> {
    let counter = Arc::new(AtomicUsize::new(0));
    ClassBuilder::<Cart>::new()
        .no_arg_constructor(move || Cart {
            serial: counter.fetch_add(1, Ordering::SeqCst),
        })
        .build()
}

#[derive(Default)]
struct Shop {
    carts: OnceCell<Lookup<Cart>>,
    handler: OnceCell<Lookup<dyn Handler>>,
}

impl Shop {
    fn new_cart(&self) -> anyhow::Result<Arc<Cart>> {
        self.carts
            .get()
            .ok_or_else(|| anyhow::anyhow!("new_cart 未绑定"))?
            .get()
    }

    fn handler(&self) -> anyhow::Result<Arc<dyn Handler>> {
        self.handler
            .get()
            .ok_or_else(|| anyhow::anyhow!("handler 未绑定"))?
            .get()
    }
}

fn shop_class() -> Arc<ClassDescriptor> {
    ClassBuilder::<Shop>::new()
        .default_constructor()
        .lookup_method::<Cart, _>("new_cart", |this, lookup| {
            this.carts.set(lookup).map_err(|_| anyhow::anyhow!("重复绑定"))
        })
        .lookup_view::<dyn Handler, _>("handler", |this, lookup| {
            this.handler.set(lookup).map_err(|_| anyhow::anyhow!("重复绑定"))
        })
        .build()
}

#[test]
fn test_lookup_methods_fetch_fresh_objects() {
    let factory = new_factory();
    factory
        .register_bean_definition("cart", BeanDefinition::for_class(cart_class()).with_prototype_scope())
        .unwrap();
    factory
        .register_bean_definition("echo", BeanDefinition::for_class(handler_class::<EchoHandler>()))
        .unwrap();
    factory
        .register_bean_definition("upper", BeanDefinition::for_class(handler_class::<UpperHandler>()))
        .unwrap();
    factory
        .register_bean_definition(
            "shop",
            BeanDefinition::for_class(shop_class())
                .with_lookup_method("new_cart", None)
                .with_lookup_method("handler", Some("upper")),
        )
        .unwrap();
    factory.refresh(&[]).unwrap();

    let shop = factory.get_typed::<Shop>("shop").unwrap();
    let first = shop.new_cart().unwrap();
    let second = shop.new_cart().unwrap();
    assert_ne!(first.serial, second.serial);
    assert_eq!(shop.handler().unwrap().handle("a"), "A");
}

#[test]
fn test_unknown_lookup_method_fails_creation() {
    let factory = new_factory();
    factory
        .register_bean_definition(
            "shop",
            BeanDefinition::for_class(shop_class()).with_lookup_method("checkout", None),
        )
        .unwrap();
    assert!(factory.get_bean("shop").is_err());
}

#[derive(Debug)]
struct Connection {
    url: String,
}

fn connection_class() -> Arc<ClassDescriptor> {
    ClassBuilder::<Connection>::new()
        .static_factory_method::<Connection, _>("open", vec![ParamDescriptor::value::<String>()], |args| {
            Ok(Connection {
                url: args.value::<String>(0)?,
            })
        })
        .build()
}

#[derive(Default)]
struct Pool {
    prefix: OnceCell<String>,
}

struct Channel {
    handler: Arc<dyn Handler>,
}

fn pool_class() -> Arc<ClassDescriptor> {
    ClassBuilder::<Pool>::new()
        .default_constructor()
        .value_property::<String, _>("prefix", |this, value| set_once(&this.prefix, value))
        .factory_method::<Connection, _>("connect", Vec::new(), |this, _| {
            let prefix = this.prefix.get().map(String::as_str).unwrap_or("mem:");
            Ok(Connection {
                url: format!("{}//pooled", prefix),
            })
        })
        .factory_method::<Channel, _>("channel", vec![ParamDescriptor::view::<dyn Handler>()], |_, args| {
            Ok(Channel {
                handler: args.view::<dyn Handler>(0)?,
            })
        })
        .build()
}

#[test]
fn test_static_factory_method_with_explicit_argument() {
    let factory = new_factory();
    factory
        .register_bean_definition(
            "conn",
            BeanDefinition::for_class(connection_class())
                .with_factory_method("open")
                .with_constructor_arg(0, BeanValue::literal("mem://orders")),
        )
        .unwrap();

    let conn = factory.get_typed::<Connection>("conn").unwrap();
    assert_eq!(conn.url, "mem://orders");
    assert!(Arc::ptr_eq(&conn, &factory.get_typed::<Connection>("conn").unwrap()));
}

#[test]
fn test_instance_factory_method_records_dependency() {
    let factory = new_factory();
    factory
        .register_bean_definition(
            "pool",
            BeanDefinition::for_class(pool_class()).with_property("prefix", BeanValue::literal("tcp:")),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "conn",
            BeanDefinition::new()
                .with_factory_bean("pool")
                .with_factory_method("connect"),
        )
        .unwrap();
    factory.refresh(&[]).unwrap();

    let conn = factory.get_typed::<Connection>("conn").unwrap();
    assert_eq!(conn.url, "tcp://pooled");
    assert_eq!(factory.dependent_beans("pool"), vec!["conn".to_string()]);
}

#[test]
fn test_factory_method_parameters_need_constructor_autowiring() {
    let factory = new_factory();
    factory
        .register_bean_definition("pool", BeanDefinition::for_class(pool_class()))
        .unwrap();
    factory
        .register_bean_definition("upper", BeanDefinition::for_class(handler_class::<UpperHandler>()))
        .unwrap();
    factory
        .register_bean_definition(
            "plain",
            BeanDefinition::new()
                .with_factory_bean("pool")
                .with_factory_method("channel"),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "wired",
            BeanDefinition::new()
                .with_factory_bean("pool")
                .with_factory_method("channel")
                .with_autowire_mode(AutowireMode::Constructor),
        )
        .unwrap();

    assert!(factory.get_bean("plain").is_err());
    let channel = factory.get_typed::<Channel>("wired").unwrap();
    assert_eq!(channel.handler.handle("c"), "C");
}

#[derive(Default)]
struct Pipeline {
    label: OnceCell<String>,
    stages: OnceCell<Vec<Arc<dyn Handler>>>,
}

impl Pipeline {
    fn run(&self, input: &str) -> Vec<String> {
        self.stages
            .get()
            .map(|stages| stages.iter().map(|stage| stage.handle(input)).collect())
            .unwrap_or_default()
    }
}

fn pipeline_class() -> Arc<ClassDescriptor> {
    ClassBuilder::<Pipeline>::new()
        .default_constructor()
        .value_property::<String, _>("label", |this, value| set_once(&this.label, value))
        .list_property::<dyn Handler, _>("stages", |this, value| set_once(&this.stages, value))
        .build()
}

#[test]
fn test_list_of_references_and_inner_beans() {
    let factory = new_factory();
    factory
        .register_bean_definition("echo", BeanDefinition::for_class(handler_class::<EchoHandler>()))
        .unwrap();
    factory
        .register_bean_definition(
            "pipeline",
            BeanDefinition::for_class(pipeline_class())
                .with_property("label", BeanValue::object(String::from("main")))
                .with_property(
                    "stages",
                    BeanValue::List(vec![
                        BeanValue::reference("echo"),
                        BeanValue::inner(BeanDefinition::for_class(handler_class::<UpperHandler>())),
                    ]),
                ),
        )
        .unwrap();
    factory.refresh(&[]).unwrap();

    let pipeline = factory.get_typed::<Pipeline>("pipeline").unwrap();
    assert_eq!(pipeline.label.get().map(String::as_str), Some("main"));
    assert_eq!(pipeline.run("ab"), vec!["ab", "AB"]);
    // 内部 bean 不会以名字暴露
    assert_eq!(
        factory.bean_names_for_type(TypeKey::of::<dyn Handler>(), true, true),
        vec!["echo".to_string()]
    );
}

#[test]
fn test_null_property_value_is_skipped() {
    let factory = new_factory();
    factory
        .register_bean_definition(
            "pipeline",
            BeanDefinition::for_class(pipeline_class()).with_property("label", BeanValue::Null),
        )
        .unwrap();
    let pipeline = factory.get_typed::<Pipeline>("pipeline").unwrap();
    assert!(pipeline.label.get().is_none());
}

#[test]
fn test_placeholders_reach_arguments_references_and_scopes() {
    let factory = new_factory();
    factory
        .register_bean_definition(
            "conn",
            BeanDefinition::for_class(connection_class())
                .with_factory_method("open")
                .with_constructor_arg(0, BeanValue::literal("${db.url}")),
        )
        .unwrap();
    factory
        .register_bean_definition("echo", BeanDefinition::for_class(handler_class::<EchoHandler>()))
        .unwrap();
    factory
        .register_bean_definition("upper", BeanDefinition::for_class(handler_class::<UpperHandler>()))
        .unwrap();
    factory
        .register_bean_definition(
            "pipeline",
            BeanDefinition::for_class(pipeline_class())
                .with_property("label", BeanValue::literal("${pipeline.label:default}"))
                .with_property("stages", BeanValue::List(vec![BeanValue::reference("${handler.bean}")])),
        )
        .unwrap();
    factory
        .register_bean_definition("cart", BeanDefinition::for_class(cart_class()).with_scope("${cart.scope}"))
        .unwrap();

    let mut properties = HashMap::new();
    properties.insert("db.url".to_string(), "mem://orders".to_string());
    let configurer = PlaceholderConfigurer::new(properties)
        .with_property("handler.bean", "upper")
        .with_property("cart.scope", "prototype");
    factory
        .refresh(&[FactoryPostProcessor::Regular(Arc::new(configurer))])
        .unwrap();

    assert_eq!(factory.get_typed::<Connection>("conn").unwrap().url, "mem://orders");
    let pipeline = factory.get_typed::<Pipeline>("pipeline").unwrap();
    assert_eq!(pipeline.label.get().map(String::as_str), Some("default"));
    assert_eq!(pipeline.run("x"), vec!["X"]);
    assert!(factory.is_prototype("cart").unwrap());
    assert!(factory.has_embedded_value_resolver());
    assert_eq!(factory.resolve_embedded_value("${db.url}").unwrap(), "mem://orders");
}
