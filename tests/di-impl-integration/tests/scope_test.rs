//! 自定义作用域的生命周期

mod common;

use common::*;
use di_abstractions::{
    BeanDefinition, BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, ClassBuilder, ClassDescriptor,
    ConfigurableBeanFactory, Lookup, Scope,
};
use di_impl::ContextScope;
use infrastructure_common::BeanError;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Session {
    id: usize,
}

fn session_class(events: &Events) -> Arc<ClassDescriptor> {
    let counter = Arc::new(AtomicUsize::new(0));
    let events = events.clone();
    ClassBuilder::<Session>::new()
        .no_arg_constructor(move || Session {
            id: counter.fetch_add(1, Ordering::SeqCst),
        })
        .method("close", move |this| {
            events.lock().push(format!("session#{}:close", this.id));
            Ok(())
        })
        .build()
}

fn scoped_factory(events: &Events) -> (Arc<di_impl::DefaultListableBeanFactory>, Arc<ContextScope>) {
    let factory = new_factory();
    let scope = Arc::new(ContextScope::new("request"));
    factory.register_scope("request", scope.clone()).unwrap();
    factory
        .register_bean_definition(
            "session",
            BeanDefinition::for_class(session_class(events))
                .with_scope("request")
                .with_destroy_method("close"),
        )
        .unwrap();
    (factory, scope)
}

#[test]
fn test_inactive_scope_is_reported() {
    let events = events();
    let (factory, scope) = scoped_factory(&events);
    assert!(!scope.is_active());

    let err = factory.get_bean("session").unwrap_err();
    assert!(matches!(err, BeanError::Creation { ref name, .. } if name == "session"));
    assert!(err.any_cause(|e| matches!(e, BeanError::ScopeNotActive { scope } if scope == "request")));
    assert!(!factory.is_singleton("session").unwrap());
    assert!(!factory.is_prototype("session").unwrap());
}

#[test]
fn test_one_instance_per_context_and_destroyed_on_end() {
    let events = events();
    let (factory, scope) = scoped_factory(&events);

    let first_context = scope.begin().unwrap();
    assert!(scope.started_at().is_some());
    let a = factory.get_typed::<Session>("session").unwrap();
    let b = factory.get_typed::<Session>("session").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(scope.conversation_id(), Some(first_context.to_string()));
    scope.end();
    assert_eq!(snapshot(&events), vec!["session#0:close"]);

    let second_context = scope.begin().unwrap();
    assert_ne!(first_context, second_context);
    let c = factory.get_typed::<Session>("session").unwrap();
    assert_eq!(c.id, 1);
    scope.end();
    assert_eq!(snapshot(&events), vec!["session#0:close", "session#1:close"]);
}

#[test]
fn test_nested_begin_is_rejected() {
    let scope = ContextScope::new("job");
    scope.begin().unwrap();
    assert!(matches!(scope.begin(), Err(BeanError::IllegalState { .. })));
    scope.end();
    // 没有活动上下文时结束什么也不做
    scope.end();
    assert!(!scope.is_active());
}

#[test]
fn test_destroy_scoped_bean_removes_instance_and_callback() {
    let events = events();
    let (factory, scope) = scoped_factory(&events);
    scope.begin().unwrap();

    let old = factory.get_typed::<Session>("session").unwrap();
    factory.destroy_scoped_bean("session").unwrap();
    assert_eq!(snapshot(&events), vec![format!("session#{}:close", old.id)]);

    let fresh = factory.get_typed::<Session>("session").unwrap();
    assert!(!Arc::ptr_eq(&old, &fresh));

    scope.end();
    assert_eq!(
        snapshot(&events),
        vec![
            format!("session#{}:close", old.id),
            format!("session#{}:close", fresh.id),
        ]
    );
}

#[test]
fn test_destroy_scoped_bean_rejects_singletons() {
    let events = events();
    let (factory, _scope) = scoped_factory(&events);
    factory
        .register_bean_definition("echo", BeanDefinition::for_class(handler_class::<EchoHandler>()))
        .unwrap();
    assert!(matches!(
        factory.destroy_scoped_bean("echo"),
        Err(BeanError::IllegalState { .. })
    ));
}

#[test]
fn test_builtin_scopes_cannot_be_replaced() {
    let factory = new_factory();
    for name in ["singleton", "prototype"] {
        let result = factory.register_scope(name, Arc::new(ContextScope::new(name)));
        assert!(matches!(result, Err(BeanError::IllegalState { .. })));
    }
    factory
        .register_scope("request", Arc::new(ContextScope::new("request")))
        .unwrap();
    assert_eq!(factory.registered_scope_names(), vec!["request".to_string()]);
}

#[test]
fn test_unregistered_scope_is_an_error() {
    let events = events();
    let factory = new_factory();
    factory
        .register_bean_definition(
            "session",
            BeanDefinition::for_class(session_class(&events)).with_scope("conversation"),
        )
        .unwrap();
    assert!(matches!(
        factory.get_bean("session"),
        Err(BeanError::IllegalState { .. })
    ));
}

/// 单例通过查找方法访问当前上下文里的会话
struct Controller {
    session: OnceCell<Lookup<Session>>,
}

impl Controller {
    fn current_session(&self) -> anyhow::Result<Arc<Session>> {
        match self.session.get() {
            Some(lookup) => lookup.get(),
            None => anyhow::bail!("查找方法未绑定"),
        }
    }
}

#[test]
fn test_singleton_reaches_scoped_bean_through_lookup() {
    let events = events();
    let (factory, scope) = scoped_factory(&events);
    let controller_class = ClassBuilder::<Controller>::new()
        .no_arg_constructor(|| Controller {
            session: OnceCell::new(),
        })
        .lookup_method::<Session, _>("current_session", |this, lookup| {
            this.session
                .set(lookup)
                .map_err(|_| anyhow::anyhow!("查找方法重复绑定"))
        })
        .build();
    factory
        .register_bean_definition(
            "controller",
            BeanDefinition::for_class(controller_class).with_lookup_method("current_session", Some("session")),
        )
        .unwrap();
    factory.refresh(&[]).unwrap();

    let controller = factory.get_typed::<Controller>("controller").unwrap();
    assert!(controller.current_session().is_err());

    scope.begin().unwrap();
    let first = controller.current_session().unwrap();
    assert!(Arc::ptr_eq(&first, &controller.current_session().unwrap()));
    scope.end();

    scope.begin().unwrap();
    let second = controller.current_session().unwrap();
    assert_ne!(first.id, second.id);
    scope.end();
}
