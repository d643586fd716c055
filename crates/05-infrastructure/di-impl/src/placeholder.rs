//! `${...}` 占位符替换
//!
//! [`PlaceholderConfigurer`] 是一个元数据后置处理器：在任何实例创建之前，遍历所有定义，
//! 把字面量、引用名、类名等位置的占位符替换为属性值，然后把自己的解析器注册为
//! 工厂的内嵌值解析器。

use di_abstractions::{
    BeanClassRef, BeanDefinition, BeanFactoryPostProcessor, BeanValue,
    ConfigurableListableBeanFactory, StringValueResolver,
};
use infrastructure_common::{
    BeanError, BeanResult, ConfigError, ConfigResult, Precedence, LOWEST_PRECEDENCE,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

const PREFIX: &str = "${";
const SUFFIX: &str = "}";
const SIMPLE_PREFIX: &str = "{";
const VALUE_SEPARATOR: char = ':';

/// 占位符解析器
#[derive(Debug, Clone, Default)]
pub struct PlaceholderResolver {
    properties: HashMap<String, String>,
    ignore_unresolvable: bool,
}

impl PlaceholderResolver {
    /// 由属性表创建解析器
    pub fn new(properties: HashMap<String, String>) -> Self {
        Self {
            properties,
            ignore_unresolvable: false,
        }
    }

    /// 取得属性值
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// 替换字符串中的所有占位符
    pub fn resolve(&self, value: &str) -> BeanResult<String> {
        self.parse(value, &mut HashSet::new())
    }

    fn parse(&self, value: &str, visiting: &mut HashSet<String>) -> BeanResult<String> {
        let mut result = value.to_string();
        let mut start = result.find(PREFIX);

        while let Some(start_index) = start {
            let Some(end_index) = Self::find_placeholder_end(&result, start_index) else {
                break;
            };
            let original = result[start_index + PREFIX.len()..end_index].to_string();
            if !visiting.insert(original.clone()) {
                return Err(BeanError::illegal_state(format!(
                    "属性定义中存在循环占位符引用 '{}'",
                    original
                )));
            }

            let placeholder = self.parse(&original, visiting)?;
            let resolved = match self.properties.get(&placeholder) {
                Some(value) => Some(value.clone()),
                None => placeholder.split_once(VALUE_SEPARATOR).map(|(key, default)| {
                    self.properties
                        .get(key)
                        .cloned()
                        .unwrap_or_else(|| default.to_string())
                }),
            };

            let next_from = match resolved {
                Some(value) => {
                    let value = self.parse(&value, visiting)?;
                    result.replace_range(start_index..end_index + SUFFIX.len(), &value);
                    start_index + value.len()
                }
                None if self.ignore_unresolvable => end_index + SUFFIX.len(),
                None => {
                    return Err(BeanError::illegal_state(format!(
                        "无法解析值 \"{}\" 中的占位符 '{}'",
                        value, placeholder
                    )));
                }
            };
            visiting.remove(&original);
            start = result
                .get(next_from..)
                .and_then(|rest| rest.find(PREFIX))
                .map(|offset| next_from + offset);
        }
        Ok(result)
    }

    fn find_placeholder_end(buf: &str, start_index: usize) -> Option<usize> {
        let bytes = buf.as_bytes();
        let mut index = start_index + PREFIX.len();
        let mut nested = 0;
        while index < bytes.len() {
            if bytes[index..].starts_with(SUFFIX.as_bytes()) {
                if nested == 0 {
                    return Some(index);
                }
                nested -= 1;
                index += SUFFIX.len();
            } else if bytes[index..].starts_with(SIMPLE_PREFIX.as_bytes()) {
                nested += 1;
                index += SIMPLE_PREFIX.len();
            } else {
                index += 1;
            }
        }
        None
    }
}

impl StringValueResolver for PlaceholderResolver {
    fn resolve_string_value(&self, value: &str) -> BeanResult<String> {
        self.resolve(value)
    }
}

/// 占位符配置器
#[derive(Debug, Clone)]
pub struct PlaceholderConfigurer {
    resolver: Arc<PlaceholderResolver>,
    order: i32,
}

impl PlaceholderConfigurer {
    /// 由属性表创建配置器
    pub fn new(properties: HashMap<String, String>) -> Self {
        Self {
            resolver: Arc::new(PlaceholderResolver::new(properties)),
            order: LOWEST_PRECEDENCE,
        }
    }

    /// 追加一个属性
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.resolver)
            .properties
            .insert(key.into(), value.into());
        self
    }

    /// 无法解析的占位符原样保留，而不是报错
    pub fn with_ignore_unresolvable(mut self, ignore: bool) -> Self {
        Arc::make_mut(&mut self.resolver).ignore_unresolvable = ignore;
        self
    }

    /// 设置执行顺序
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// 从已构建的配置中读取属性，嵌套表展开为点分隔的键
    pub fn from_config(config: &config::Config) -> ConfigResult<Self> {
        let table = config
            .clone()
            .try_deserialize::<HashMap<String, config::Value>>()
            .map_err(|e| {
                error!("读取占位符属性失败: {}", e);
                ConfigError::ParseError { source: Box::new(e) }
            })?;
        let mut properties = HashMap::new();
        for (key, value) in table {
            flatten_value(&key, value, &mut properties);
        }
        debug!("加载了 {} 个占位符属性", properties.len());
        Ok(Self::new(properties))
    }

    /// 从属性文件加载（格式由扩展名决定）
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(|e| ConfigError::ParseError { source: Box::new(e) })?;
        Self::from_config(&settings)
    }

    /// 共享的占位符解析器
    pub fn resolver(&self) -> Arc<PlaceholderResolver> {
        self.resolver.clone()
    }

    fn visit_definition(&self, definition: &mut BeanDefinition) -> BeanResult<()> {
        let resolver = &self.resolver;
        if let Some(parent) = definition.parent_name.as_mut() {
            *parent = resolver.resolve(parent)?;
        }
        if let Some(BeanClassRef::Name(class_name)) = definition.bean_class.as_mut() {
            *class_name = resolver.resolve(class_name)?;
        }
        if let Some(factory_bean) = definition.factory_bean_name.as_mut() {
            *factory_bean = resolver.resolve(factory_bean)?;
        }
        if let Some(factory_method) = definition.factory_method_name.as_mut() {
            *factory_method = resolver.resolve(factory_method)?;
        }
        definition.scope = resolver.resolve(&definition.scope)?;

        for property in definition.property_values.iter_mut() {
            self.visit_value(&mut property.value)?;
        }
        for holder in definition.constructor_args.indexed_mut() {
            self.visit_value(&mut holder.value)?;
        }
        for holder in definition.constructor_args.generic_mut() {
            self.visit_value(&mut holder.value)?;
        }
        Ok(())
    }

    fn visit_value(&self, value: &mut BeanValue) -> BeanResult<()> {
        match value {
            BeanValue::Literal(text) | BeanValue::Reference(text) => {
                *text = self.resolver.resolve(text)?;
            }
            BeanValue::Inner { definition, .. } => self.visit_definition(definition)?,
            BeanValue::List(items) => {
                for item in items {
                    self.visit_value(item)?;
                }
            }
            BeanValue::Object(_) | BeanValue::Null => {}
        }
        Ok(())
    }
}

fn flatten_value(key: &str, value: config::Value, out: &mut HashMap<String, String>) {
    match value.kind {
        config::ValueKind::Table(table) => {
            for (child, value) in table {
                flatten_value(&format!("{}.{}", key, child), value, out);
            }
        }
        config::ValueKind::Array(items) => {
            let joined = items
                .into_iter()
                .map(|item| item.to_string())
                .collect::<Vec<_>>()
                .join(",");
            out.insert(key.to_string(), joined);
        }
        config::ValueKind::Nil => {}
        config::ValueKind::String(text) => {
            out.insert(key.to_string(), text);
        }
        other => {
            out.insert(key.to_string(), other.to_string());
        }
    }
}

impl BeanFactoryPostProcessor for PlaceholderConfigurer {
    fn post_process_bean_factory(&self, factory: &dyn ConfigurableListableBeanFactory) -> BeanResult<()> {
        let names = factory.bean_definition_names();
        for name in &names {
            factory
                .update_bean_definition(name, &mut |definition| self.visit_definition(definition))
                .map_err(|e| match e {
                    BeanError::DefinitionStore { .. } | BeanError::NoSuchBeanDefinition { .. } => e,
                    other => BeanError::DefinitionStore {
                        name: name.clone(),
                        message: other.to_string(),
                    },
                })?;
        }

        for name in &names {
            let aliases = factory.get_aliases(name);
            for alias in aliases {
                let resolved = self.resolver.resolve(&alias)?;
                if resolved != alias {
                    factory.remove_alias(&alias)?;
                    factory.register_alias(name, &resolved)?;
                }
            }
        }

        factory.add_embedded_value_resolver(self.resolver.clone());
        info!("占位符已在 {} 个 bean 定义中解析", names.len());
        Ok(())
    }

    fn precedence(&self) -> Precedence {
        Precedence::PriorityOrdered(self.order)
    }
}
