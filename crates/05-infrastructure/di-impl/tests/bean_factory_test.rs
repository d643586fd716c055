//! 获取、作用域、别名、父子工厂与定义合并

mod common;

use common::*;
use di_abstractions::{
    AliasRegistry, BeanDefinition, BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, ClassBuilder,
    ConfigurableBeanFactory, ConfigurableListableBeanFactory, HierarchicalBeanFactory, ListableBeanFactory,
    ParamDescriptor, SingletonBeanRegistry,
};
use infrastructure_common::{BeanError, BeanObject, TypeKey};
use std::sync::Arc;

#[test]
fn test_singleton_is_shared_and_prototype_is_fresh() {
    let factory = new_factory();
    factory
        .register_bean_definition("memory", BeanDefinition::for_class(repository_class::<MemoryRepository>()))
        .unwrap();
    factory
        .register_bean_definition(
            "sql",
            BeanDefinition::for_class(repository_class::<SqlRepository>()).with_prototype_scope(),
        )
        .unwrap();

    let first = factory.get_typed::<MemoryRepository>("memory").unwrap();
    let second = factory.get_typed::<MemoryRepository>("memory").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let first = factory.get_typed::<SqlRepository>("sql").unwrap();
    let second = factory.get_typed::<SqlRepository>("sql").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));

    assert!(factory.is_singleton("memory").unwrap());
    assert!(factory.is_prototype("sql").unwrap());
    assert!(factory.contains_singleton("memory"));
    assert!(!factory.contains_singleton("sql"));
}

#[test]
fn test_view_lookup_by_name_and_type() {
    let factory = new_factory();
    factory
        .register_bean_definition("memory", BeanDefinition::for_class(repository_class::<MemoryRepository>()))
        .unwrap();

    let repository = factory.get_view::<dyn Repository>("memory").unwrap();
    assert_eq!(repository.kind(), "memory");
    let resolved = factory.resolve_view::<dyn Repository>().unwrap();
    assert_eq!(resolved.kind(), "memory");

    assert!(factory
        .is_type_match("memory", TypeKey::of::<dyn Repository>())
        .unwrap());
    assert!(!factory.is_type_match("memory", TypeKey::of::<SqlRepository>()).unwrap());
    assert_eq!(
        factory.get_type("memory").unwrap(),
        Some(TypeKey::of::<MemoryRepository>())
    );

    let err = factory
        .get_bean_of_type("memory", TypeKey::of::<SqlRepository>())
        .unwrap_err();
    assert!(matches!(err, BeanError::BeanNotOfRequiredType { .. }));
}

#[test]
fn test_missing_bean() {
    let factory = new_factory();
    let err = factory.get_bean("nothing").unwrap_err();
    assert!(matches!(err, BeanError::NoSuchBeanDefinition { ref name } if name == "nothing"));
    assert!(!factory.contains_bean("nothing"));

    let err = factory.resolve_view::<dyn Repository>().err().expect("没有候选时应当失败");
    assert!(matches!(err, BeanError::NoSuchBeanOfType { .. }));
}

#[test]
fn test_aliases_resolve_to_same_instance() {
    let factory = new_factory();
    factory
        .register_bean_definition("memory", BeanDefinition::for_class(repository_class::<MemoryRepository>()))
        .unwrap();
    factory.register_alias("memory", "mem").unwrap();
    factory.register_alias("mem", "m").unwrap();

    let by_name = factory.get_typed::<MemoryRepository>("memory").unwrap();
    let by_alias = factory.get_typed::<MemoryRepository>("m").unwrap();
    assert!(Arc::ptr_eq(&by_name, &by_alias));
    assert_eq!(factory.canonical_name("m"), "memory");
    assert!(factory.is_alias("mem"));
    assert!(factory.contains_bean("m"));

    let mut aliases = factory.get_aliases("memory");
    aliases.sort();
    assert_eq!(aliases, vec!["m".to_string(), "mem".to_string()]);
}

#[test]
fn test_definition_override_can_be_disallowed() {
    let factory = new_factory();
    factory.set_allow_bean_definition_overriding(false);
    factory
        .register_bean_definition("repo", BeanDefinition::for_class(repository_class::<MemoryRepository>()))
        .unwrap();
    let err = factory
        .register_bean_definition("repo", BeanDefinition::for_class(repository_class::<SqlRepository>()))
        .unwrap_err();
    assert!(matches!(err, BeanError::DefinitionOverride { .. }));
    assert_eq!(factory.get_view::<dyn Repository>("repo").unwrap().kind(), "memory");
}

#[test]
fn test_override_replaces_definition_and_instance() {
    let factory = new_factory();
    factory
        .register_bean_definition("repo", BeanDefinition::for_class(repository_class::<MemoryRepository>()))
        .unwrap();
    assert_eq!(factory.get_view::<dyn Repository>("repo").unwrap().kind(), "memory");

    factory
        .register_bean_definition("repo", BeanDefinition::for_class(repository_class::<SqlRepository>()))
        .unwrap();
    assert_eq!(factory.get_view::<dyn Repository>("repo").unwrap().kind(), "sql");
}

#[test]
fn test_child_definition_inherits_from_abstract_parent() {
    let factory = new_factory();
    factory
        .register_bean_definition(
            "baseRepository",
            BeanDefinition::for_class(repository_class::<FileRepository>())
                .with_prototype_scope()
                .with_abstract(true),
        )
        .unwrap();
    factory
        .register_bean_definition("fileRepository", BeanDefinition::child("baseRepository"))
        .unwrap();

    let err = factory.get_bean("baseRepository").unwrap_err();
    assert!(matches!(err, BeanError::BeanIsAbstract { .. }));

    assert!(factory.is_prototype("fileRepository").unwrap());
    let repository = factory.get_view::<dyn Repository>("fileRepository").unwrap();
    assert_eq!(repository.kind(), "file");

    let merged = factory.get_merged_bean_definition("fileRepository").unwrap();
    assert!(!merged.definition().is_abstract);
}

#[test]
fn test_parent_factory_delegation() {
    let parent = new_factory();
    parent
        .register_bean_definition("memory", BeanDefinition::for_class(repository_class::<MemoryRepository>()))
        .unwrap();
    let child = new_factory();
    child.set_parent_bean_factory(parent.clone()).unwrap();

    assert!(child.contains_bean("memory"));
    assert!(!child.contains_local_bean("memory"));
    let from_child = child.get_typed::<MemoryRepository>("memory").unwrap();
    let from_parent = parent.get_typed::<MemoryRepository>("memory").unwrap();
    assert!(Arc::ptr_eq(&from_child, &from_parent));

    let resolved = child.resolve_view::<dyn Repository>().unwrap();
    assert_eq!(resolved.kind(), "memory");

    let other = new_factory();
    assert!(child.set_parent_bean_factory(other).is_err());
}

#[test]
fn test_beans_of_type_and_names_for_type() {
    let factory = new_factory();
    factory
        .register_bean_definition("memory", BeanDefinition::for_class(repository_class::<MemoryRepository>()))
        .unwrap();
    factory
        .register_bean_definition("sql", BeanDefinition::for_class(repository_class::<SqlRepository>()))
        .unwrap();
    factory
        .register_bean_definition(
            "lazyFile",
            BeanDefinition::for_class(repository_class::<FileRepository>()).with_lazy_init(true),
        )
        .unwrap();
    factory
        .register_bean_definition("service", BeanDefinition::for_class(order_service_class()).with_lazy_init(true))
        .unwrap();

    let mut names = factory.bean_names_for_type(TypeKey::of::<dyn Repository>(), true, true);
    names.sort();
    assert_eq!(names, vec!["lazyFile", "memory", "sql"]);

    let mut beans: Vec<String> = factory
        .beans_of_type(TypeKey::of::<dyn Repository>())
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    beans.sort();
    assert_eq!(beans, vec!["lazyFile", "memory", "sql"]);
}

#[test]
fn test_lazy_singletons_are_not_pre_instantiated() {
    let factory = new_factory();
    factory
        .register_bean_definition("memory", BeanDefinition::for_class(repository_class::<MemoryRepository>()))
        .unwrap();
    factory
        .register_bean_definition(
            "sql",
            BeanDefinition::for_class(repository_class::<SqlRepository>()).with_lazy_init(true),
        )
        .unwrap();

    factory.refresh(&[]).unwrap();
    assert!(factory.is_configuration_frozen());
    assert!(factory.contains_singleton("memory"));
    assert!(!factory.contains_singleton("sql"));

    factory.get_bean("sql").unwrap();
    assert!(factory.contains_singleton("sql"));
}

struct Greeting {
    text: String,
}

#[test]
fn test_get_bean_with_explicit_args() {
    let factory = new_factory();
    let class = ClassBuilder::<Greeting>::new()
        .constructor(vec![ParamDescriptor::value::<String>()], |args| {
            Ok(Greeting {
                text: args.value::<String>(0)?,
            })
        })
        .build();
    factory
        .register_bean_definition("greeting", BeanDefinition::for_class(class).with_prototype_scope())
        .unwrap();

    let args: Vec<BeanObject> = vec![Arc::new("hello".to_string())];
    let object = factory.get_bean_with_args("greeting", args).unwrap();
    let greeting = object.downcast_ref::<Greeting>().unwrap();
    assert_eq!(greeting.text, "hello");
}

#[test]
fn test_manually_registered_singleton() {
    let factory = new_factory();
    factory
        .register_singleton("manual", Arc::new(MemoryRepository))
        .unwrap();
    assert!(factory.contains_bean("manual"));
    assert!(factory.get_typed::<MemoryRepository>("manual").is_ok());

    let err = factory
        .register_singleton("manual", Arc::new(MemoryRepository))
        .unwrap_err();
    assert!(matches!(err, BeanError::IllegalState { .. }));
}

#[derive(Debug)]
struct Clock;

struct Scheduler {
    clock: Arc<Clock>,
    factory: Arc<dyn BeanFactory>,
}

#[test]
fn test_resolvable_dependency_and_factory_self_injection() {
    let factory = new_factory();
    factory.register_resolvable_dependency(TypeKey::of::<Clock>(), Arc::new(Clock));
    let class = ClassBuilder::<Scheduler>::new()
        .constructor(
            vec![
                ParamDescriptor::bean::<Clock>(),
                ParamDescriptor::view::<dyn BeanFactory>(),
            ],
            |args| {
                Ok(Scheduler {
                    clock: args.bean::<Clock>(0)?,
                    factory: args.view::<dyn BeanFactory>(1)?,
                })
            },
        )
        .build();
    factory
        .register_bean_definition("scheduler", BeanDefinition::for_class(class))
        .unwrap();

    let scheduler = factory.get_typed::<Scheduler>("scheduler").unwrap();
    assert!(scheduler.factory.contains_bean("scheduler"));
    assert_eq!(format!("{:?}", scheduler.clock), "Clock");
    assert!(!factory.contains_bean("clock"));
}

#[test]
fn test_supplier_definition() {
    let factory = new_factory();
    factory
        .register_bean_definition(
            "supplied",
            BeanDefinition::supplied(|| Ok(Arc::new(SqlRepository) as BeanObject)),
        )
        .unwrap();
    assert!(factory.get_typed::<SqlRepository>("supplied").is_ok());
}

#[test]
fn test_shutdown_closes_factory() {
    let factory = new_factory();
    factory
        .register_bean_definition("memory", BeanDefinition::for_class(repository_class::<MemoryRepository>()))
        .unwrap();
    factory.refresh(&[]).unwrap();
    factory.shutdown();

    assert!(factory.is_closed());
    assert_eq!(factory.singleton_count(), 0);
}

struct Flaky;

fn flaky_class() -> Arc<di_abstractions::ClassDescriptor> {
    let failed_once = Arc::new(std::sync::atomic::AtomicBool::new(false));
    ClassBuilder::<Flaky>::new()
        .no_arg_constructor(move || {
            if !failed_once.swap(true, std::sync::atomic::Ordering::SeqCst) {
                panic!("第一次构造失败");
            }
            Flaky
        })
        .build()
}

#[test]
fn test_panicking_constructor_does_not_leave_bean_in_creation() {
    let factory = new_factory();
    factory
        .register_bean_definition("flaky", BeanDefinition::for_class(flaky_class()))
        .unwrap();

    let err = factory.get_bean("flaky").unwrap_err();
    assert!(matches!(err, BeanError::Creation { ref name, ref message, .. }
        if name == "flaky" && message.contains("第一次构造失败")));
    assert!(!factory.is_currently_in_creation("flaky"));
    assert!(!factory.contains_singleton("flaky"));

    assert!(factory.get_typed::<Flaky>("flaky").is_ok());
}

#[test]
fn test_panicking_prototype_constructor_is_reported() {
    let factory = new_factory();
    factory
        .register_bean_definition(
            "flaky",
            BeanDefinition::for_class(flaky_class()).with_prototype_scope(),
        )
        .unwrap();

    assert!(matches!(
        factory.get_bean("flaky"),
        Err(BeanError::Creation { ref name, .. }) if name == "flaky"
    ));
    assert!(!factory.is_currently_in_creation("flaky"));
    assert!(factory.get_typed::<Flaky>("flaky").is_ok());
}
