//! String-to-[`Value`] conversion, keyed by value type name.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::value::{Value, ValueType};

/// A user-supplied converter. The error string becomes the conversion
/// error's reason.
pub type ConvertFn = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

/// Converters for every value type a command may declare.
///
/// Built-in types (`bool`, `int`, `float`, `char`, `string`, `path`) and enum
/// domains are handled without registration. A converter registered under a
/// built-in name replaces the built-in one. The registry is passed into each
/// parse explicitly, so different commands can use different converters.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    custom: HashMap<String, ConvertFn>,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.custom.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ConverterRegistry")
            .field("custom", &names)
            .finish()
    }
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, type_name: impl Into<String>, convert: F) -> &mut Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.custom.insert(type_name.into(), Arc::new(convert));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, type_name: impl Into<String>, convert: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.register(type_name, convert);
        self
    }

    pub fn has_converter(&self, ty: &ValueType) -> bool {
        !matches!(ty, ValueType::Custom(_)) || self.custom.contains_key(ty.name())
    }

    /// Convert `raw`; the error is a human-readable reason.
    pub fn convert(&self, ty: &ValueType, raw: &str) -> Result<Value, String> {
        if let Some(custom) = self.custom.get(ty.name()) {
            return custom(raw);
        }
        match ty {
            ValueType::Bool => convert_bool(raw),
            ValueType::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| e.to_string()),
            ValueType::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| e.to_string()),
            ValueType::Char => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err("expected a single character".to_string()),
                }
            }
            ValueType::String => Ok(Value::Str(raw.to_string())),
            ValueType::Path => Ok(Value::Path(PathBuf::from(raw))),
            ValueType::Enum(domain) => domain.lookup(raw).map(Value::Enum).ok_or_else(|| {
                format!("expected one of: {}", domain.variants().join(", "))
            }),
            ValueType::Custom(name) => Err(format!("no converter registered for type '{name}'")),
        }
    }

    /// Whether `raw` converts; used to decide if an optional value is taken.
    pub fn accepts(&self, ty: &ValueType, raw: &str) -> bool {
        self.convert(ty, raw).is_ok()
    }
}

fn convert_bool(raw: &str) -> Result<Value, String> {
    if raw.eq_ignore_ascii_case("true") {
        Ok(Value::Bool(true))
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(Value::Bool(false))
    } else {
        Err("expected 'true' or 'false'".to_string())
    }
}
