//! 元数据后置处理器与实例后置处理器的编排

mod common;

use common::*;
use di_abstractions::{
    downcast_bean, set_once, BeanDefinition, BeanDefinitionRegistry, BeanDefinitionRegistryPostProcessor,
    BeanFactory, BeanFactoryExt, BeanFactoryPostProcessor, BeanPostProcessor, BeanValue, ClassBuilder,
    ClassDescriptor, ConfigurableBeanFactory, ConfigurableListableBeanFactory, DestructionAwareBeanPostProcessor,
    FactoryPostProcessor, InstantiationAwareBeanPostProcessor, MergedBeanDefinitionPostProcessor, ParamDescriptor,
    PropertyValues, RootBeanDefinition, SmartInstantiationAwareBeanPostProcessor,
};
use di_impl::ListenerBeanDetector;
use infrastructure_common::{BeanObject, BeanResult, Precedence};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type Registrations = Arc<dyn Fn() -> Vec<(String, BeanDefinition)> + Send + Sync>;

/// 在注册阶段追加定义的处理器
struct Registrar {
    label: &'static str,
    events: Events,
    registrations: Registrations,
}

impl BeanFactoryPostProcessor for Registrar {
    fn post_process_bean_factory(&self, _factory: &dyn ConfigurableListableBeanFactory) -> BeanResult<()> {
        self.events.lock().push(format!("{}:factory", self.label));
        Ok(())
    }
}

impl BeanDefinitionRegistryPostProcessor for Registrar {
    fn post_process_bean_definition_registry(&self, registry: &dyn BeanDefinitionRegistry) -> BeanResult<()> {
        self.events.lock().push(format!("{}:registry", self.label));
        for (name, definition) in (self.registrations)() {
            registry.register_bean_definition(&name, definition)?;
        }
        Ok(())
    }
}

fn as_registry_processor(registrar: Arc<Registrar>) -> Arc<dyn BeanDefinitionRegistryPostProcessor> {
    registrar
}

fn as_factory_processor(registrar: Arc<Registrar>) -> Arc<dyn BeanFactoryPostProcessor> {
    registrar
}

fn registrar_class(label: &'static str, events: &Events, registrations: Registrations) -> Arc<ClassDescriptor> {
    let events = events.clone();
    ClassBuilder::<Registrar>::named(format!("Registrar[{}]", label))
        .alias::<dyn BeanDefinitionRegistryPostProcessor>(as_registry_processor)
        .alias::<dyn BeanFactoryPostProcessor>(as_factory_processor)
        .no_arg_constructor(move || Registrar {
            label,
            events: events.clone(),
            registrations: registrations.clone(),
        })
        .build()
}

#[test]
fn test_registry_processors_run_until_no_new_ones_appear() {
    let factory = new_factory();
    let events = events();

    let for_second: Registrations = Arc::new(|| {
        vec![(
            "handler".to_string(),
            BeanDefinition::for_class(handler_class::<EchoHandler>()),
        )]
    });
    let second = registrar_class("second", &events, for_second);
    let for_first: Registrations = Arc::new(move || {
        vec![("second".to_string(), BeanDefinition::for_class(second.clone()))]
    });
    let first = registrar_class("first", &events, for_first);
    let boot = Arc::new(Registrar {
        label: "boot",
        events: events.clone(),
        registrations: Arc::new(move || vec![("first".to_string(), BeanDefinition::for_class(first.clone()))]),
    });

    factory
        .refresh(&[FactoryPostProcessor::Registry(boot)])
        .unwrap();

    assert_eq!(
        snapshot(&events),
        vec![
            "boot:registry",
            "first:registry",
            "second:registry",
            "boot:factory",
            "first:factory",
            "second:factory",
        ]
    );
    let handler = factory.get_view::<dyn Handler>("handler").unwrap();
    assert_eq!(handler.handle("ok"), "ok");
}

/// 普通元数据后置处理器；可选地把某个定义标记为首选
struct FactoryStep {
    label: &'static str,
    precedence: Precedence,
    events: Events,
    promote: Option<&'static str>,
}

impl BeanFactoryPostProcessor for FactoryStep {
    fn post_process_bean_factory(&self, factory: &dyn ConfigurableListableBeanFactory) -> BeanResult<()> {
        self.events.lock().push(self.label.to_string());
        if let Some(name) = self.promote {
            factory.update_bean_definition(name, &mut |definition| {
                definition.primary = true;
                Ok(())
            })?;
        }
        Ok(())
    }

    fn precedence(&self) -> Precedence {
        self.precedence
    }
}

fn as_factory_step(step: Arc<FactoryStep>) -> Arc<dyn BeanFactoryPostProcessor> {
    step
}

fn factory_step_class(
    label: &'static str,
    precedence: Precedence,
    events: &Events,
    promote: Option<&'static str>,
) -> Arc<ClassDescriptor> {
    let events = events.clone();
    ClassBuilder::<FactoryStep>::named(format!("FactoryStep[{}]", label))
        .alias::<dyn BeanFactoryPostProcessor>(as_factory_step)
        .no_arg_constructor(move || FactoryStep {
            label,
            precedence,
            events: events.clone(),
            promote,
        })
        .build()
}

#[test]
fn test_regular_processors_follow_precedence_and_can_edit_definitions() {
    let factory = new_factory();
    let events = events();
    let steps = [
        ("unordered", Precedence::Unordered, Some("upper")),
        ("ordered", Precedence::Ordered(1), None),
        ("priority", Precedence::PriorityOrdered(5), None),
    ];
    for (label, precedence, promote) in steps {
        factory
            .register_bean_definition(
                label,
                BeanDefinition::for_class(factory_step_class(label, precedence, &events, promote)),
            )
            .unwrap();
    }
    factory
        .register_bean_definition("echo", BeanDefinition::for_class(handler_class::<EchoHandler>()))
        .unwrap();
    factory
        .register_bean_definition("upper", BeanDefinition::for_class(handler_class::<UpperHandler>()))
        .unwrap();

    let manual = Arc::new(FactoryStep {
        label: "manual",
        precedence: Precedence::Unordered,
        events: events.clone(),
        promote: None,
    });
    factory
        .refresh(&[FactoryPostProcessor::Regular(manual)])
        .unwrap();

    assert_eq!(snapshot(&events), vec!["manual", "priority", "ordered", "unordered"]);
    let handler = factory.resolve_view::<dyn Handler>().unwrap();
    assert_eq!(handler.handle("x"), "X");
}

/// 只记录目标 bean 的初始化前回调
struct Stamp {
    label: &'static str,
    precedence: Precedence,
    events: Events,
}

impl BeanPostProcessor for Stamp {
    fn post_process_before_initialization(&self, bean: BeanObject, name: &str) -> BeanResult<BeanObject> {
        if name == "target" {
            self.events.lock().push(self.label.to_string());
        }
        Ok(bean)
    }

    fn precedence(&self) -> Precedence {
        self.precedence
    }
}

fn as_stamp(stamp: Arc<Stamp>) -> Arc<dyn BeanPostProcessor> {
    stamp
}

#[test]
fn test_bean_defined_post_processors_are_sorted_by_precedence() {
    let factory = new_factory();
    let events = events();
    let stamps = [
        ("u", Precedence::Unordered),
        ("p10", Precedence::PriorityOrdered(10)),
        ("o-5", Precedence::Ordered(-5)),
        ("p1", Precedence::PriorityOrdered(1)),
    ];
    for (label, precedence) in stamps {
        let recorder = events.clone();
        let class = ClassBuilder::<Stamp>::named(format!("Stamp[{}]", label))
            .alias::<dyn BeanPostProcessor>(as_stamp)
            .no_arg_constructor(move || Stamp {
                label,
                precedence,
                events: recorder.clone(),
            })
            .build();
        factory
            .register_bean_definition(label, BeanDefinition::for_class(class))
            .unwrap();
    }
    factory
        .register_bean_definition("target", BeanDefinition::for_class(handler_class::<EchoHandler>()))
        .unwrap();

    factory.refresh(&[]).unwrap();
    assert_eq!(snapshot(&events), vec!["p1", "p10", "o-5", "u"]);
}

/// 替换、否决、改写属性的实例化感知处理器
#[derive(Default)]
struct Interceptor {
    after_init: Mutex<Vec<String>>,
}

impl BeanPostProcessor for Interceptor {
    fn post_process_after_initialization(&self, bean: BeanObject, name: &str) -> BeanResult<BeanObject> {
        self.after_init.lock().push(name.to_string());
        Ok(bean)
    }

    fn as_instantiation_aware(&self) -> Option<&dyn InstantiationAwareBeanPostProcessor> {
        Some(self)
    }
}

impl InstantiationAwareBeanPostProcessor for Interceptor {
    fn post_process_before_instantiation(
        &self,
        _class: &Arc<ClassDescriptor>,
        name: &str,
    ) -> BeanResult<Option<BeanObject>> {
        if name == "replaced" {
            return Ok(Some(Arc::new(UpperHandler) as BeanObject));
        }
        Ok(None)
    }

    fn post_process_after_instantiation(&self, _bean: &BeanObject, name: &str) -> BeanResult<bool> {
        Ok(name != "vetoed")
    }

    fn post_process_properties(
        &self,
        mut values: PropertyValues,
        _bean: &BeanObject,
        name: &str,
    ) -> BeanResult<PropertyValues> {
        if name == "rewired" {
            values.remove("handler");
            values.add("handler", BeanValue::reference("upper"));
        }
        Ok(values)
    }
}

#[derive(Default)]
struct Holder {
    handler: OnceCell<Arc<dyn Handler>>,
}

fn holder_class() -> Arc<ClassDescriptor> {
    ClassBuilder::<Holder>::new()
        .default_constructor()
        .view_property::<dyn Handler, _>("handler", |this, value| set_once(&this.handler, value))
        .build()
}

fn interceptor_factory() -> (Arc<di_impl::DefaultListableBeanFactory>, Arc<Interceptor>) {
    let factory = new_factory();
    let interceptor = Arc::new(Interceptor::default());
    factory.add_bean_post_processor(interceptor.clone());
    factory
        .register_bean_definition("echo", BeanDefinition::for_class(handler_class::<EchoHandler>()))
        .unwrap();
    factory
        .register_bean_definition("upper", BeanDefinition::for_class(handler_class::<UpperHandler>()))
        .unwrap();
    let holder = holder_class();
    for name in ["plain", "vetoed", "rewired"] {
        factory
            .register_bean_definition(
                name,
                BeanDefinition::for_class(holder.clone()).with_property("handler", BeanValue::reference("echo")),
            )
            .unwrap();
    }
    (factory, interceptor)
}

#[test]
fn test_before_instantiation_short_circuits_creation() {
    let (factory, interceptor) = interceptor_factory();
    factory
        .register_bean_definition("replaced", BeanDefinition::for_class(handler_class::<EchoHandler>()))
        .unwrap();

    let bean = factory.get_bean("replaced").unwrap();
    assert!(downcast_bean::<UpperHandler>(&bean).is_some());
    assert!(downcast_bean::<EchoHandler>(&bean).is_none());
    // 短路后仍然经过初始化后回调
    assert!(interceptor.after_init.lock().contains(&"replaced".to_string()));
}

#[test]
fn test_after_instantiation_veto_skips_population() {
    let (factory, _) = interceptor_factory();

    let plain = factory.get_typed::<Holder>("plain").unwrap();
    assert_eq!(plain.handler.get().unwrap().handle("a"), "a");

    let vetoed = factory.get_typed::<Holder>("vetoed").unwrap();
    assert!(vetoed.handler.get().is_none());
}

#[test]
fn test_property_values_can_be_rewritten() {
    let (factory, _) = interceptor_factory();
    let rewired = factory.get_typed::<Holder>("rewired").unwrap();
    assert_eq!(rewired.handler.get().unwrap().handle("a"), "A");
}

/// 统计合并定义回调次数
#[derive(Default)]
struct MergedCounter {
    counts: Mutex<HashMap<String, usize>>,
    resets: Mutex<Vec<String>>,
}

impl BeanPostProcessor for MergedCounter {
    fn as_merged_definition(&self) -> Option<&dyn MergedBeanDefinitionPostProcessor> {
        Some(self)
    }
}

impl MergedBeanDefinitionPostProcessor for MergedCounter {
    fn post_process_merged_bean_definition(
        &self,
        _definition: &RootBeanDefinition,
        _class: &Arc<ClassDescriptor>,
        name: &str,
    ) -> BeanResult<()> {
        *self.counts.lock().entry(name.to_string()).or_default() += 1;
        Ok(())
    }

    fn reset_bean_definition(&self, name: &str) {
        self.resets.lock().push(name.to_string());
    }
}

#[test]
fn test_merged_definition_is_post_processed_once() {
    let factory = new_factory();
    let counter = Arc::new(MergedCounter::default());
    factory.add_bean_post_processor(counter.clone());
    factory
        .register_bean_definition(
            "proto",
            BeanDefinition::for_class(handler_class::<EchoHandler>()).with_prototype_scope(),
        )
        .unwrap();

    for _ in 0..3 {
        factory.get_bean("proto").unwrap();
    }
    assert_eq!(counter.counts.lock().get("proto").copied(), Some(1));

    factory
        .register_bean_definition(
            "proto",
            BeanDefinition::for_class(handler_class::<UpperHandler>()).with_prototype_scope(),
        )
        .unwrap();
    assert!(counter.resets.lock().contains(&"proto".to_string()));

    let handler = factory.get_view::<dyn Handler>("proto").unwrap();
    assert_eq!(handler.handle("b"), "B");
    assert_eq!(counter.counts.lock().get("proto").copied(), Some(2));
}

struct DestructionLog {
    events: Events,
}

impl BeanPostProcessor for DestructionLog {
    fn as_destruction_aware(&self) -> Option<&dyn DestructionAwareBeanPostProcessor> {
        Some(self)
    }
}

impl DestructionAwareBeanPostProcessor for DestructionLog {
    fn post_process_before_destruction(&self, _bean: &BeanObject, name: &str) -> BeanResult<()> {
        self.events.lock().push(format!("destroy:{}", name));
        Ok(())
    }
}

#[test]
fn test_destruction_aware_processor_sees_plain_singletons() {
    let factory = new_factory();
    let events = events();
    factory.add_bean_post_processor(Arc::new(DestructionLog { events: events.clone() }));
    factory
        .register_bean_definition("echo", BeanDefinition::for_class(handler_class::<EchoHandler>()))
        .unwrap();
    factory
        .register_bean_definition(
            "proto",
            BeanDefinition::for_class(handler_class::<UpperHandler>()).with_prototype_scope(),
        )
        .unwrap();
    factory.refresh(&[]).unwrap();
    factory.get_bean("proto").unwrap();

    factory.shutdown();
    assert_eq!(snapshot(&events), vec!["destroy:echo"]);
}

/// 两个构造器的类，默认会选无参构造器
struct Greeter {
    source: &'static str,
}

fn greeter_class() -> Arc<ClassDescriptor> {
    ClassBuilder::<Greeter>::new()
        .no_arg_constructor(|| Greeter { source: "default" })
        .constructor(vec![ParamDescriptor::view::<dyn Handler>()], |args| {
            args.view::<dyn Handler>(0)?;
            Ok(Greeter { source: "injected" })
        })
        .build()
}

struct PreferInjection;

impl BeanPostProcessor for PreferInjection {
    fn as_smart_instantiation_aware(&self) -> Option<&dyn SmartInstantiationAwareBeanPostProcessor> {
        Some(self)
    }
}

impl SmartInstantiationAwareBeanPostProcessor for PreferInjection {
    fn determine_candidate_constructors(
        &self,
        class: &Arc<ClassDescriptor>,
        _name: &str,
    ) -> BeanResult<Option<Vec<usize>>> {
        let injected = class
            .constructors()
            .iter()
            .position(|constructor| !constructor.params.is_empty());
        Ok(injected.map(|index| vec![index]))
    }
}

#[test]
fn test_candidate_constructors_from_processor() {
    let factory = new_factory();
    factory
        .register_bean_definition("echo", BeanDefinition::for_class(handler_class::<EchoHandler>()))
        .unwrap();
    factory
        .register_bean_definition("greeter", BeanDefinition::for_class(greeter_class()))
        .unwrap();
    assert_eq!(factory.get_typed::<Greeter>("greeter").unwrap().source, "default");

    let factory = new_factory();
    factory.add_bean_post_processor(Arc::new(PreferInjection));
    factory
        .register_bean_definition("echo", BeanDefinition::for_class(handler_class::<EchoHandler>()))
        .unwrap();
    factory
        .register_bean_definition("greeter", BeanDefinition::for_class(greeter_class()))
        .unwrap();
    assert_eq!(factory.get_typed::<Greeter>("greeter").unwrap().source, "injected");
    assert_eq!(factory.dependencies_for_bean("greeter"), vec!["echo".to_string()]);
}

#[test]
fn test_listener_detector_tracks_singleton_listeners() {
    let factory = new_factory();
    let detector = Arc::new(ListenerBeanDetector::<dyn Handler>::new(factory.classes().clone()));
    factory.add_bean_post_processor(detector.clone());
    factory
        .register_bean_definition("audit", BeanDefinition::for_class(handler_class::<EchoHandler>()))
        .unwrap();
    factory
        .register_bean_definition(
            "temp",
            BeanDefinition::for_class(handler_class::<UpperHandler>()).with_prototype_scope(),
        )
        .unwrap();
    factory.refresh(&[]).unwrap();
    factory.get_bean("temp").unwrap();

    assert_eq!(detector.listener_names(), vec!["audit".to_string()]);
    assert_eq!(detector.listeners()[0].handle("z"), "z");

    factory.shutdown();
    assert!(detector.listeners().is_empty());
}
