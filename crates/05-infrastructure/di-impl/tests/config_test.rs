//! 工厂配置文件与占位符属性文件

mod common;

use common::*;
use di_abstractions::{
    set_once, BeanDefinition, BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, BeanValue, ClassBuilder,
    ClassDescriptor, ConfigurableBeanFactory, FactoryPostProcessor,
};
use di_impl::{
    BeanFactoryConfig, DefaultClassRegistry, DefaultListableBeanFactory, PlaceholderConfigurer, WrappedReferencePolicy,
};
use infrastructure_common::{BeanError, ConfigError};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_factory_config_from_file() {
    init_test_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "beans.toml",
        r#"
allow_circular_references = false
wrapped_reference_policy = "strict"
suppressed_exceptions_limit = 10
"#,
    );

    let config = BeanFactoryConfig::from_file(&path).unwrap();
    assert!(!config.allow_circular_references);
    assert_eq!(config.wrapped_reference_policy, WrappedReferencePolicy::Strict);
    assert_eq!(config.suppressed_exceptions_limit, 10);
    // 未出现的键使用默认值
    assert!(config.allow_bean_definition_overriding);
    assert!(config.cache_bean_metadata);
}

#[test]
fn test_loaded_config_drives_factory_behavior() {
    init_test_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "beans.toml", "allow_circular_references = false\n");
    let config = BeanFactoryConfig::from_file(&path).unwrap();

    let factory = DefaultListableBeanFactory::with_config(Arc::new(DefaultClassRegistry::new()), config);
    factory
        .register_bean_definition(
            "alpha",
            BeanDefinition::for_class(alpha_class()).with_property("beta", BeanValue::reference("beta")),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "beta",
            BeanDefinition::for_class(beta_class()).with_property("alpha", BeanValue::reference("alpha")),
        )
        .unwrap();

    let err = factory.get_bean("alpha").unwrap_err();
    assert!(err.any_cause(|e| matches!(e, BeanError::CurrentlyInCreation { .. })));
}

#[test]
fn test_missing_config_file() {
    let err = BeanFactoryConfig::from_file("/definitely/not/here/beans.toml").unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));

    let err = PlaceholderConfigurer::from_file("/definitely/not/here/app.toml").unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "beans.toml", "suppressed_exceptions_limit = 0\n");
    let err = BeanFactoryConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { .. }));

    let path = write_file(&dir, "broken.toml", "allow_circular_references = [\n");
    let err = BeanFactoryConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
}

#[derive(Default)]
struct DataSource {
    url: OnceCell<String>,
    pool: OnceCell<u32>,
    timeout: OnceCell<u64>,
}

fn data_source_class() -> Arc<ClassDescriptor> {
    ClassBuilder::<DataSource>::new()
        .default_constructor()
        .value_property::<String, _>("url", |this, value| set_once(&this.url, value))
        .value_property::<u32, _>("pool", |this, value| set_once(&this.pool, value))
        .value_property::<u64, _>("timeout", |this, value| set_once(&this.timeout, value))
        .build()
}

fn data_source_definition() -> BeanDefinition {
    BeanDefinition::for_class(data_source_class())
        .with_property("url", BeanValue::literal("${db.url}"))
        .with_property("pool", BeanValue::literal("${db.pool}"))
        .with_property("timeout", BeanValue::literal("${db.timeout:30}"))
}

#[test]
fn test_placeholders_from_properties_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "app.toml",
        r#"
[db]
host = "localhost"
url = "mem://${db.host}/orders"
pool = 8
"#,
    );
    let configurer = PlaceholderConfigurer::from_file(&path).unwrap();
    assert_eq!(configurer.resolver().property("db.pool"), Some("8"));

    let factory = new_factory();
    factory
        .register_bean_definition("dataSource", data_source_definition())
        .unwrap();
    factory
        .refresh(&[FactoryPostProcessor::Regular(Arc::new(configurer))])
        .unwrap();

    let data_source = factory.get_typed::<DataSource>("dataSource").unwrap();
    assert_eq!(data_source.url.get().map(String::as_str), Some("mem://localhost/orders"));
    assert_eq!(data_source.pool.get(), Some(&8));
    assert_eq!(data_source.timeout.get(), Some(&30));

    assert!(factory.has_embedded_value_resolver());
    assert_eq!(factory.resolve_embedded_value("${db.host}:5432").unwrap(), "localhost:5432");
}

#[test]
fn test_unresolvable_placeholder_fails_refresh() {
    let factory = new_factory();
    factory
        .register_bean_definition("dataSource", data_source_definition())
        .unwrap();
    let configurer = PlaceholderConfigurer::new(Default::default()).with_property("db.url", "mem://x");

    let err = factory
        .refresh(&[FactoryPostProcessor::Regular(Arc::new(configurer))])
        .unwrap_err();
    assert!(err.to_string().contains("db.pool"));
}

#[test]
fn test_ignore_unresolvable_keeps_placeholder_text() {
    let factory = new_factory();
    factory
        .register_bean_definition(
            "dataSource",
            BeanDefinition::for_class(data_source_class()).with_property("url", BeanValue::literal("${db.url}")),
        )
        .unwrap();
    let configurer = PlaceholderConfigurer::new(Default::default()).with_ignore_unresolvable(true);
    factory
        .refresh(&[FactoryPostProcessor::Regular(Arc::new(configurer))])
        .unwrap();

    let data_source = factory.get_typed::<DataSource>("dataSource").unwrap();
    assert_eq!(data_source.url.get().map(String::as_str), Some("${db.url}"));
    assert!(data_source.pool.get().is_none());
}
