//! Immutable description of one command: its options and positional parameters.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::arity::Arity;
use crate::value::{Binding, ValueType};

/// Problems found while assembling a [`CommandSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("invalid arity '{0}'")]
    InvalidArity(String),

    #[error("option has no names")]
    EmptyNames,

    #[error("invalid option name '{0}'")]
    InvalidName(String),

    #[error("option name '{name}' is declared by both '{first}' and '{second}'")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },

    #[error("positional label '{0}' is empty or declared twice")]
    InvalidLabel(String),

    #[error("option '{0}' is negatable but not boolean")]
    NegatableNotBoolean(String),

    #[error("'{0}' declares an empty split delimiter")]
    EmptySplit(String),

    #[error("option '{0}' declares a fallback value but takes no values")]
    FallbackWithoutValues(String),

    #[error("default for '{0}' does not match its target kind")]
    DefaultShape(String),
}

/// How matched values are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetKind {
    /// Last occurrence wins.
    #[default]
    Scalar,
    /// Appended in encounter order, duplicates kept.
    List,
    /// Unique values, ordered by the value type.
    Set,
}

impl TargetKind {
    pub fn is_collection(&self) -> bool {
        !matches!(self, Self::Scalar)
    }

    fn fits(&self, binding: &Binding) -> bool {
        matches!(
            (self, binding),
            (_, Binding::Unset)
                | (Self::Scalar, Binding::Scalar(_))
                | (Self::List, Binding::List(_))
                | (Self::Set, Binding::Set(_))
        )
    }
}

/// Identity of an option or positional within its [`CommandSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpecId {
    Option(usize),
    Positional(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    names: Vec<String>,
    arity: Option<Arity>,
    value_type: ValueType,
    split: Option<String>,
    fallback: Option<String>,
    negatable: bool,
    target: TargetKind,
    required: bool,
    default: Binding,
    label: Option<String>,
}

impl OptionSpec {
    /// A string-valued scalar option with default arity.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            arity: None,
            value_type: ValueType::String,
            split: None,
            fallback: None,
            negatable: false,
            target: TargetKind::Scalar,
            required: false,
            default: Binding::Unset,
            label: None,
        }
    }

    /// A boolean switch (`arity = 0`).
    pub fn flag<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names).with_type(ValueType::Bool)
    }

    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn with_split(mut self, delimiter: impl Into<String>) -> Self {
        self.split = Some(delimiter.into());
        self
    }

    pub fn with_fallback(mut self, value: impl Into<String>) -> Self {
        self.fallback = Some(value.into());
        self
    }

    pub fn with_target(mut self, target: TargetKind) -> Self {
        self.target = target;
        self
    }

    pub fn with_default(mut self, default: Binding) -> Self {
        self.default = default;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn negatable(mut self, yes: bool) -> Self {
        self.negatable = yes;
        self
    }

    pub fn required(mut self, yes: bool) -> Self {
        self.required = yes;
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The first declared name; used in messages and as the result key.
    pub fn primary_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    /// Declared arity, or `0` for booleans and `1` otherwise.
    pub fn arity(&self) -> Arity {
        self.arity.unwrap_or(if self.value_type.is_bool() {
            Arity::zero()
        } else {
            Arity::exactly(1)
        })
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn split(&self) -> Option<&str> {
        self.split.as_deref()
    }

    pub fn fallback(&self) -> Option<&str> {
        self.fallback.as_deref()
    }

    pub fn is_negatable(&self) -> bool {
        self.negatable
    }

    pub fn target(&self) -> TargetKind {
        self.target
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_binding(&self) -> &Binding {
        &self.default
    }

    /// Placeholder for the option's value, e.g. `FACILITY`.
    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("<{}>", self.value_type.name()))
    }

    fn validate(&self) -> Result<(), SpecError> {
        if self.names.is_empty() {
            return Err(SpecError::EmptyNames);
        }
        for name in &self.names {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(SpecError::InvalidName(name.clone()));
            }
        }
        let name = self.primary_name().to_string();
        if self.negatable && !self.value_type.is_bool() {
            return Err(SpecError::NegatableNotBoolean(name));
        }
        if self.split.as_deref().is_some_and(str::is_empty) {
            return Err(SpecError::EmptySplit(name));
        }
        if self.fallback.is_some() && !self.arity().takes_values() {
            return Err(SpecError::FallbackWithoutValues(name));
        }
        if !self.target.fits(&self.default) {
            return Err(SpecError::DefaultShape(name));
        }
        Ok(())
    }
}

impl fmt::Display for OptionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.primary_name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionalSpec {
    label: String,
    index: Option<Arity>,
    arity: Option<Arity>,
    value_type: ValueType,
    split: Option<String>,
    target: TargetKind,
    default: Binding,
}

impl PositionalSpec {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            index: None,
            arity: None,
            value_type: ValueType::String,
            split: None,
            target: TargetKind::Scalar,
            default: Binding::Unset,
        }
    }

    /// Position range this parameter occupies; only its lower bound affects
    /// matching order.
    pub fn with_index(mut self, index: Arity) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn with_split(mut self, delimiter: impl Into<String>) -> Self {
        self.split = Some(delimiter.into());
        self
    }

    pub fn with_target(mut self, target: TargetKind) -> Self {
        self.target = target;
        self
    }

    pub fn with_default(mut self, default: Binding) -> Self {
        self.default = default;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn index(&self) -> Option<Arity> {
        self.index
    }

    /// Declared arity, or `1` for scalars and `0..*` for collections.
    pub fn arity(&self) -> Arity {
        self.arity.unwrap_or(if self.target.is_collection() {
            Arity::at_least(0)
        } else {
            Arity::exactly(1)
        })
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn split(&self) -> Option<&str> {
        self.split.as_deref()
    }

    pub fn target(&self) -> TargetKind {
        self.target
    }

    pub fn default_binding(&self) -> &Binding {
        &self.default
    }

    fn validate(&self) -> Result<(), SpecError> {
        if self.split.as_deref().is_some_and(str::is_empty) {
            return Err(SpecError::EmptySplit(self.label.clone()));
        }
        if !self.target.fits(&self.default) {
            return Err(SpecError::DefaultShape(self.label.clone()));
        }
        Ok(())
    }
}

impl fmt::Display for PositionalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.label)
    }
}

/// A validated, immutable command description.
///
/// Safe to share across threads; parsing never mutates it.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    name: String,
    options: Vec<OptionSpec>,
    positionals: Vec<PositionalSpec>,
    names: HashMap<String, usize>,
    negated: HashMap<String, usize>,
    negation_marker: String,
}

impl CommandSpec {
    pub fn builder(name: impl Into<String>) -> CommandSpecBuilder {
        CommandSpecBuilder {
            name: name.into(),
            options: Vec::new(),
            positionals: Vec::new(),
            negation_marker: "no-".to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    /// Positionals in matching order.
    pub fn positionals(&self) -> &[PositionalSpec] {
        &self.positionals
    }

    pub fn option(&self, index: usize) -> &OptionSpec {
        &self.options[index]
    }

    pub fn positional(&self, index: usize) -> &PositionalSpec {
        &self.positionals[index]
    }

    pub fn negation_marker(&self) -> &str {
        &self.negation_marker
    }

    /// Resolve an exact option name; the flag reports a negated form.
    pub fn resolve(&self, name: &str) -> Option<(usize, bool)> {
        if let Some(&idx) = self.names.get(name) {
            return Some((idx, false));
        }
        self.negated.get(name).map(|&idx| (idx, true))
    }

    pub fn is_option_name(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// The option declared as `-c`, if any.
    pub fn short_option(&self, c: char) -> Option<usize> {
        let mut buf = [0u8; 4];
        let name = format!("-{}", c.encode_utf8(&mut buf));
        self.names.get(&name).copied()
    }

    /// Human-readable identity used in errors.
    pub fn display_name(&self, id: SpecId) -> String {
        match id {
            SpecId::Option(idx) => self.options[idx].to_string(),
            SpecId::Positional(idx) => self.positionals[idx].to_string(),
        }
    }

    /// Generated negated names (`--no-verbose`) and the option each belongs to.
    pub fn negated_names(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.negated.iter().map(|(name, &idx)| (name.as_str(), idx))
    }
}

pub struct CommandSpecBuilder {
    name: String,
    options: Vec<OptionSpec>,
    positionals: Vec<PositionalSpec>,
    negation_marker: String,
}

impl CommandSpecBuilder {
    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn positional(mut self, positional: PositionalSpec) -> Self {
        self.positionals.push(positional);
        self
    }

    /// Prefix inserted after `--` to form negated names (default `no-`).
    pub fn negation_marker(mut self, marker: impl Into<String>) -> Self {
        self.negation_marker = marker.into();
        self
    }

    pub fn build(self) -> Result<CommandSpec, SpecError> {
        let mut names: HashMap<String, usize> = HashMap::new();
        for (idx, option) in self.options.iter().enumerate() {
            option.validate()?;
            for name in &option.names {
                if let Some(prev) = names.insert(name.clone(), idx) {
                    return Err(SpecError::DuplicateName {
                        name: name.clone(),
                        first: self.options[prev].to_string(),
                        second: option.to_string(),
                    });
                }
            }
        }

        let mut negated: HashMap<String, usize> = HashMap::new();
        for (idx, option) in self.options.iter().enumerate() {
            if !option.negatable {
                continue;
            }
            for name in &option.names {
                let Some(form) = negated_form(name, &self.negation_marker) else {
                    continue;
                };
                if let Some(&other) = names.get(&form) {
                    if other != idx {
                        return Err(SpecError::DuplicateName {
                            name: form,
                            first: self.options[other].to_string(),
                            second: option.to_string(),
                        });
                    }
                    continue;
                }
                negated.insert(form, idx);
            }
        }

        let mut seen: Vec<&str> = Vec::new();
        for positional in &self.positionals {
            positional.validate()?;
            if positional.label.is_empty() || seen.contains(&positional.label.as_str()) {
                return Err(SpecError::InvalidLabel(positional.label.clone()));
            }
            seen.push(&positional.label);
        }

        let mut positionals = self.positionals;
        // Stable: equal index bounds keep declaration order.
        positionals.sort_by_key(|p| p.index.map(|i| i.min()).unwrap_or(usize::MAX));

        Ok(CommandSpec {
            name: self.name,
            options: self.options,
            positionals,
            names,
            negated,
            negation_marker: self.negation_marker,
        })
    }
}

/// `--verbose` <-> `--no-verbose`. Only `--` names have a negated form.
fn negated_form(name: &str, marker: &str) -> Option<String> {
    let body = name.strip_prefix("--")?;
    if marker.is_empty() || body.is_empty() {
        return None;
    }
    match body.strip_prefix(marker) {
        Some(rest) if !rest.is_empty() => Some(format!("--{rest}")),
        _ => Some(format!("--{marker}{body}")),
    }
}
