//! Typed values produced by the binder, and the type descriptors that
//! produce and order them.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A converted argument value.
///
/// Equality and ordering are total: floats compare with `f64::total_cmp`.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    Path(PathBuf),
    Enum(EnumValue),
}

/// A variant of an [`EnumDomain`], carrying its declared position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub variant: String,
    pub ordinal: usize,
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) => 1,
            Self::Float(_) => 2,
            Self::Char(_) => 3,
            Self::Str(_) => 4,
            Self::Path(_) => 5,
            Self::Enum(_) => 6,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Enum(e) => Some(&e.variant),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Char(a), Self::Char(b)) => a.cmp(b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::Path(a), Self::Path(b)) => a.cmp(b),
            (Self::Enum(a), Self::Enum(b)) => a
                .ordinal
                .cmp(&b.ordinal)
                .then_with(|| a.variant.cmp(&b.variant)),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Char(c) => write!(f, "{c}"),
            Self::Str(s) => f.write_str(s),
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Enum(e) => f.write_str(&e.variant),
        }
    }
}

/// A closed set of named variants.
///
/// Iteration order of sets over this domain is the declared variant order,
/// not insertion order and not alphabetical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDomain {
    name: String,
    variants: Vec<String>,
    case_insensitive: bool,
}

impl EnumDomain {
    pub fn new<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
            case_insensitive: false,
        }
    }

    /// Accept variants regardless of ASCII case (`foo` matches `FOO`).
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    pub fn lookup(&self, raw: &str) -> Option<EnumValue> {
        self.variants
            .iter()
            .position(|v| {
                if self.case_insensitive {
                    v.eq_ignore_ascii_case(raw)
                } else {
                    v == raw
                }
            })
            .map(|ordinal| EnumValue {
                variant: self.variants[ordinal].clone(),
                ordinal,
            })
    }
}

/// The declared type of an option or positional's values.
///
/// Each type carries the ordering used for `set` targets (see [`ValueType::compare`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Char,
    String,
    Path,
    Enum(Arc<EnumDomain>),
    /// Resolved through a converter registered under this name.
    Custom(String),
}

impl ValueType {
    /// Registry key; enum types use their domain name.
    pub fn name(&self) -> &str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Char => "char",
            Self::String => "string",
            Self::Path => "path",
            Self::Enum(domain) => domain.name(),
            Self::Custom(name) => name,
        }
    }

    /// Resolve a built-in type name. Enum and custom names are not known here.
    pub fn builtin(name: &str) -> Option<Self> {
        Some(match name {
            "bool" | "boolean" => Self::Bool,
            "int" | "integer" | "i64" => Self::Int,
            "float" | "double" | "f64" => Self::Float,
            "char" => Self::Char,
            "string" | "str" => Self::String,
            "path" | "file" => Self::Path,
            _ => return None,
        })
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    /// Ordering of values in a set over this type.
    ///
    /// Enum values order by their position in the domain's declaration.
    /// Every other type uses the natural order of [`Value`]: numeric for
    /// numbers, `false < true`, lexicographic for chars, strings and paths.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (self, a, b) {
            (Self::Enum(domain), Value::Enum(x), Value::Enum(y)) => {
                let pos = |v: &EnumValue| {
                    domain
                        .variants
                        .iter()
                        .position(|d| *d == v.variant)
                        .unwrap_or(v.ordinal)
                };
                pos(x).cmp(&pos(y))
            }
            _ => a.cmp(b),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unique values kept in the order defined by their [`ValueType`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueSet {
    items: Vec<Value>,
}

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value`; returns `false` when an equal value was already present.
    pub fn insert(&mut self, ty: &ValueType, value: Value) -> bool {
        match self.items.binary_search_by(|probe| ty.compare(probe, &value)) {
            Ok(_) => false,
            Err(at) => {
                self.items.insert(at, value);
                true
            }
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.items.iter().any(|v| v == value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }
}

impl<'a> IntoIterator for &'a ValueSet {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// What a spec currently holds: its declared default, or what the binder put there.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Binding {
    #[default]
    Unset,
    Scalar(Value),
    List(Vec<Value>),
    Set(ValueSet),
}

impl Binding {
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// The single value of a scalar, or the last value of a collection.
    pub fn value(&self) -> Option<&Value> {
        self.values().last()
    }

    pub fn values(&self) -> &[Value] {
        match self {
            Self::Unset => &[],
            Self::Scalar(v) => std::slice::from_ref(v),
            Self::List(vs) => vs,
            Self::Set(set) => set.as_slice(),
        }
    }
}

/// Extraction of a concrete Rust type from a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromValue for char {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Path(p) => Some(p.display().to_string()),
            other => other.as_str().map(str::to_string),
        }
    }
}

impl FromValue for PathBuf {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Path(p) => Some(p.clone()),
            Value::Str(s) => Some(PathBuf::from(s)),
            _ => None,
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facility() -> Arc<EnumDomain> {
        Arc::new(EnumDomain::new("Facility", ["FOO", "BAR", "BAZ", "ALL"]))
    }

    fn variant(domain: &EnumDomain, name: &str) -> Value {
        Value::Enum(domain.lookup(name).unwrap())
    }

    #[test]
    fn enum_sets_iterate_in_declared_order() {
        let domain = facility();
        let ty = ValueType::Enum(domain.clone());
        let mut set = ValueSet::new();
        for name in ["ALL", "BAR", "FOO", "BAR"] {
            set.insert(&ty, variant(&domain, name));
        }
        let names: Vec<String> = set.iter().map(|v| v.to_string()).collect();
        assert_eq!(names, ["FOO", "BAR", "ALL"]);
    }

    #[test]
    fn insert_reports_duplicates() {
        let mut set = ValueSet::new();
        assert!(set.insert(&ValueType::Int, Value::Int(3)));
        assert!(set.insert(&ValueType::Int, Value::Int(-1)));
        assert!(!set.insert(&ValueType::Int, Value::Int(3)));
        assert_eq!(set.as_slice(), &[Value::Int(-1), Value::Int(3)]);
    }

    #[test]
    fn case_insensitive_lookup_keeps_declared_spelling() {
        let domain = EnumDomain::new("Level", ["Low", "High"]).case_insensitive(true);
        assert_eq!(domain.lookup("HIGH").unwrap().variant, "High");
        assert!(EnumDomain::new("Level", ["Low"]).lookup("low").is_none());
    }

    #[test]
    fn floats_have_total_equality() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert!(Value::Float(-0.5) < Value::Float(0.5));
    }

    #[test]
    fn binding_views() {
        assert!(Binding::Unset.values().is_empty());
        let list = Binding::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(list.value(), Some(&Value::Int(2)));
        assert_eq!(i64::from_value(&Value::Int(7)), Some(7));
        assert_eq!(
            PathBuf::from_value(&Value::Str("a.txt".into())),
            Some(PathBuf::from("a.txt"))
        );
    }
}
