//! 跨 crate 集成测试的公共设施
#![allow(dead_code)]

use di_abstractions::{ClassBuilder, ClassDescriptor};
use di_impl::{DefaultClassRegistry, DefaultListableBeanFactory};
use parking_lot::Mutex;
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

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

pub type Events = Arc<Mutex<Vec<String>>>;

pub fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn snapshot(events: &Events) -> Vec<String> {
    events.lock().clone()
}

pub trait Handler: Send + Sync {
    fn handle(&self, input: &str) -> String;
}

#[derive(Default)]
pub struct EchoHandler;

impl Handler for EchoHandler {
    fn handle(&self, input: &str) -> String {
        input.to_string()
    }
}

#[derive(Default)]
pub struct UpperHandler;

impl Handler for UpperHandler {
    fn handle(&self, input: &str) -> String {
        input.to_uppercase()
    }
}

fn as_handler<T: Handler + 'static>(handler: Arc<T>) -> Arc<dyn Handler> {
    handler
}

pub fn handler_class<T: Handler + Default + 'static>() -> Arc<ClassDescriptor> {
    ClassBuilder::<T>::new()
        .alias::<dyn Handler>(as_handler::<T>)
        .default_constructor()
        .build()
}
