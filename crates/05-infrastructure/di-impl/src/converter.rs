//! 字符串到目标类型的简单转换器

use di_abstractions::TypeConverter;
use infrastructure_common::{BeanError, BeanObject, BeanResult, TypeKey};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

type ConvertFn = Arc<dyn Fn(&str) -> Result<BeanObject, String> + Send + Sync>;

/// 按目标 `TypeId` 注册的转换函数表
///
/// 默认支持 `String`、`bool`、`char`、所有整数与浮点类型以及 `PathBuf`。
pub struct SimpleTypeConverter {
    converters: RwLock<HashMap<TypeId, ConvertFn>>,
}

macro_rules! register_from_str {
    ($converter:expr, $($ty:ty),+ $(,)?) => {
        $( $converter.register_from_str::<$ty>(); )+
    };
}

impl SimpleTypeConverter {
    /// 创建支持内置简单类型的转换器
    pub fn new() -> Self {
        let converter = Self {
            converters: RwLock::new(HashMap::new()),
        };
        register_from_str!(
            converter, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32,
            f64
        );
        converter.register::<String, _>(|s| Ok(s.to_string()));
        converter.register::<PathBuf, _>(|s| Ok(PathBuf::from(s)));
        converter.register::<bool, _>(parse_bool);
        converter
    }

    /// 注册自定义转换函数
    pub fn register<T, F>(&self, convert: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&str) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let convert_fn: ConvertFn = Arc::new(move |value: &str| {
            convert(value)
                .map(|v| Arc::new(v) as BeanObject)
                .map_err(|e| format!("{:#}", e))
        });
        self.converters.write().insert(TypeId::of::<T>(), convert_fn);
    }

    /// 使用 `FromStr` 转换（忽略首尾空白）
    pub fn register_from_str<T>(&self)
    where
        T: FromStr + Send + Sync + 'static,
        T::Err: Display,
    {
        let convert_fn: ConvertFn = Arc::new(|value: &str| {
            value
                .trim()
                .parse::<T>()
                .map(|v| Arc::new(v) as BeanObject)
                .map_err(|e| e.to_string())
        });
        self.converters.write().insert(TypeId::of::<T>(), convert_fn);
    }

    /// 把字符串当作 JSON 反序列化
    pub fn register_json<T>(&self)
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let convert_fn: ConvertFn = Arc::new(|value: &str| {
            serde_json::from_str::<T>(value)
                .map(|v| Arc::new(v) as BeanObject)
                .map_err(|e| e.to_string())
        });
        self.converters.write().insert(TypeId::of::<T>(), convert_fn);
    }
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => anyhow::bail!("无效的布尔值 '{}'", other),
    }
}

impl Default for SimpleTypeConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeConverter for SimpleTypeConverter {
    fn can_convert(&self, target: TypeKey) -> bool {
        self.converters.read().contains_key(&target.id)
    }

    fn convert(&self, value: &str, target: TypeKey) -> BeanResult<BeanObject> {
        let convert = self
            .converters
            .read()
            .get(&target.id)
            .cloned()
            .ok_or_else(|| BeanError::Conversion {
                value: value.to_string(),
                required_type: target.name.to_string(),
                message: "没有匹配的转换器".to_string(),
            })?;
        convert(value).map_err(|message| BeanError::Conversion {
            value: value.to_string(),
            required_type: target.name.to_string(),
            message,
        })
    }
}
