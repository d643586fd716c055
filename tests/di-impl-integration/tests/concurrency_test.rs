//! 多线程并发获取 bean

mod common;

use common::*;
use di_abstractions::{
    BeanDefinition, BeanDefinitionRegistry, BeanFactoryExt, ClassBuilder, ClassDescriptor, ParamDescriptor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

struct Slow {
    serial: usize,
}

fn slow_class(created: &Arc<AtomicUsize>) -> Arc<ClassDescriptor> {
    let created = created.clone();
    ClassBuilder::<Slow>::new()
        .no_arg_constructor(move || {
            std::thread::sleep(Duration::from_millis(20));
            Slow {
                serial: created.fetch_add(1, Ordering::SeqCst),
            }
        })
        .build()
}

struct Consumer {
    slow: Arc<Slow>,
}

fn consumer_class() -> Arc<ClassDescriptor> {
    ClassBuilder::<Consumer>::new()
        .constructor(vec![ParamDescriptor::bean::<Slow>()], |args| {
            Ok(Consumer {
                slow: args.bean::<Slow>(0)?,
            })
        })
        .build()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_singleton_access_creates_one_instance() {
    let factory = new_factory();
    let created = Arc::new(AtomicUsize::new(0));
    factory
        .register_bean_definition("slow", BeanDefinition::for_class(slow_class(&created)))
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let factory = factory.clone();
        handles.push(tokio::task::spawn_blocking(move || factory.get_typed::<Slow>("slow")));
    }
    let mut instances = Vec::new();
    for handle in handles {
        instances.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|slow| Arc::ptr_eq(slow, &instances[0])));
    assert_eq!(instances[0].serial, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dependents_share_dependency() {
    let factory = new_factory();
    let created = Arc::new(AtomicUsize::new(0));
    factory
        .register_bean_definition("slow", BeanDefinition::for_class(slow_class(&created)))
        .unwrap();
    for index in 0..4 {
        factory
            .register_bean_definition(&format!("consumer{}", index), BeanDefinition::for_class(consumer_class()))
            .unwrap();
    }

    let mut handles = Vec::new();
    for round in 0..16 {
        let factory = factory.clone();
        let name = format!("consumer{}", round % 4);
        handles.push(tokio::task::spawn_blocking(move || factory.get_typed::<Consumer>(&name)));
    }
    let mut consumers = Vec::new();
    for handle in handles {
        consumers.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(created.load(Ordering::SeqCst), 1);
    let shared = factory.get_typed::<Slow>("slow").unwrap();
    assert!(consumers.iter().all(|consumer| Arc::ptr_eq(&consumer.slow, &shared)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_prototypes_are_distinct() {
    let factory = new_factory();
    let created = Arc::new(AtomicUsize::new(0));
    factory
        .register_bean_definition(
            "slow",
            BeanDefinition::for_class(slow_class(&created)).with_prototype_scope(),
        )
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let factory = factory.clone();
        handles.push(tokio::task::spawn_blocking(move || factory.get_typed::<Slow>("slow")));
    }
    let mut serials = Vec::new();
    for handle in handles {
        serials.push(handle.await.unwrap().unwrap().serial);
    }
    serials.sort_unstable();
    debug!("原型序号: {:?}", serials);

    assert_eq!(created.load(Ordering::SeqCst), 8);
    assert_eq!(serials, (0..8).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_refresh_then_concurrent_reads() {
    let factory = new_factory();
    let created = Arc::new(AtomicUsize::new(0));
    factory
        .register_bean_definition("slow", BeanDefinition::for_class(slow_class(&created)))
        .unwrap();
    factory
        .register_bean_definition("echo", BeanDefinition::for_class(handler_class::<EchoHandler>()))
        .unwrap();
    factory.refresh(&[]).unwrap();

    let mut handles = Vec::new();
    for index in 0..32 {
        let factory = factory.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let handler = factory.resolve_view::<dyn Handler>()?;
            Ok::<_, infrastructure_common::BeanError>(handler.handle(&format!("msg-{}", index)))
        }));
    }
    for (index, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap().unwrap(), format!("msg-{}", index));
    }
    assert_eq!(created.load(Ordering::SeqCst), 1);

    factory.shutdown();
}
