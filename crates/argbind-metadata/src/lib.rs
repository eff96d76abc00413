//! Serializable command descriptions for argbind.
//!
//! A [`CommandDoc`] is the JSON form of a command: enum domains, options,
//! positionals and parser switches. [`CommandDoc::to_spec`] resolves type
//! names and converts default strings, producing a validated
//! [`CommandSpec`]. Nothing here inspects source code; the document is the
//! already-materialized description.

use std::collections::HashMap;
use std::sync::Arc;

use argbind::{
    Arity, Binding, CommandSpec, ConverterRegistry, EnumDomain, OptionSpec, ParserConfig,
    PositionalSpec, SpecError, TargetKind, ValueSet, ValueType,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to parse command document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("'{owner}' uses unknown type '{name}'")]
    UnknownType { owner: String, name: String },

    #[error("enum '{0}' is declared twice")]
    DuplicateEnum(String),

    #[error("invalid default '{raw}' for '{owner}': {reason}")]
    InvalidDefault {
        owner: String,
        raw: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Scalar,
    List,
    Set,
}

impl From<Target> for TargetKind {
    fn from(target: Target) -> Self {
        match target {
            Target::Scalar => TargetKind::Scalar,
            Target::List => TargetKind::List,
            Target::Set => TargetKind::Set,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct EnumDoc {
    pub name: String,
    pub variants: Vec<String>,
    #[serde(default)]
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct OptionDoc {
    pub names: Vec<String>,
    /// `"0"`, `"1"`, `"0..1"`, `"1..*"`; omitted means `0` for booleans, `1` otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arity: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default)]
    pub negatable: bool,
    #[serde(default)]
    pub target: Target,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct PositionalDoc {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arity: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
    #[serde(default)]
    pub target: Target,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default: Vec<String>,
}

/// Parser switches; unset fields keep [`ParserConfig`] defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_of_options: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_clustering: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_unmatched: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collect_all_errors: Option<bool>,
}

impl ConfigDoc {
    pub fn apply(&self, mut config: ParserConfig) -> ParserConfig {
        if let Some(marker) = &self.end_of_options {
            config = config.end_of_options(marker.clone());
        }
        if let Some(yes) = self.allow_clustering {
            config = config.allow_clustering(yes);
        }
        if let Some(yes) = self.allow_unmatched {
            config = config.allow_unmatched(yes);
        }
        if let Some(yes) = self.collect_all_errors {
            config = config.collect_all_errors(yes);
        }
        config
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct CommandDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<EnumDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positionals: Vec<PositionalDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negation_marker: Option<String>,
    #[serde(default)]
    pub config: ConfigDoc,
}

impl CommandDoc {
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parser configuration declared by the document.
    pub fn parser_config(&self) -> ParserConfig {
        self.config.apply(ParserConfig::default())
    }

    /// Build the command spec. `registry` resolves custom type names and
    /// converts default values.
    pub fn to_spec(&self, registry: &ConverterRegistry) -> Result<CommandSpec, DocumentError> {
        let types = TypeTable::new(&self.enums, registry)?;
        let mut builder = CommandSpec::builder(self.name.clone());
        if let Some(marker) = &self.negation_marker {
            builder = builder.negation_marker(marker.clone());
        }

        for doc in &self.options {
            let owner = doc.names.first().cloned().unwrap_or_default();
            let value_type = types.resolve(&owner, doc.value_type.as_deref())?;
            let target = TargetKind::from(doc.target);
            let default = convert_defaults(
                registry,
                &owner,
                &value_type,
                target,
                doc.split.as_deref(),
                &doc.default,
            )?;

            let mut option = OptionSpec::new(doc.names.iter().cloned())
                .with_type(value_type)
                .with_target(target)
                .with_default(default)
                .negatable(doc.negatable)
                .required(doc.required);
            if let Some(arity) = &doc.arity {
                option = option.with_arity(arity.parse::<Arity>()?);
            }
            if let Some(split) = &doc.split {
                option = option.with_split(split.clone());
            }
            if let Some(fallback) = &doc.fallback {
                option = option.with_fallback(fallback.clone());
            }
            if let Some(label) = &doc.label {
                option = option.with_label(label.clone());
            }
            builder = builder.option(option);
        }

        for doc in &self.positionals {
            let value_type = types.resolve(&doc.label, doc.value_type.as_deref())?;
            let target = TargetKind::from(doc.target);
            let default = convert_defaults(
                registry,
                &doc.label,
                &value_type,
                target,
                doc.split.as_deref(),
                &doc.default,
            )?;

            let mut positional = PositionalSpec::new(doc.label.clone())
                .with_type(value_type)
                .with_target(target)
                .with_default(default);
            if let Some(index) = &doc.index {
                positional = positional.with_index(index.parse::<Arity>()?);
            }
            if let Some(arity) = &doc.arity {
                positional = positional.with_arity(arity.parse::<Arity>()?);
            }
            if let Some(split) = &doc.split {
                positional = positional.with_split(split.clone());
            }
            builder = builder.positional(positional);
        }

        Ok(builder.build()?)
    }
}

struct TypeTable<'r> {
    enums: HashMap<String, Arc<EnumDomain>>,
    registry: &'r ConverterRegistry,
}

impl<'r> TypeTable<'r> {
    fn new(docs: &[EnumDoc], registry: &'r ConverterRegistry) -> Result<Self, DocumentError> {
        let mut enums = HashMap::new();
        for doc in docs {
            let domain = EnumDomain::new(doc.name.clone(), doc.variants.iter().cloned())
                .case_insensitive(doc.case_insensitive);
            if enums.insert(doc.name.clone(), Arc::new(domain)).is_some() {
                return Err(DocumentError::DuplicateEnum(doc.name.clone()));
            }
        }
        Ok(Self { enums, registry })
    }

    /// Declared enums first, then built-ins, then registered custom converters.
    fn resolve(&self, owner: &str, name: Option<&str>) -> Result<ValueType, DocumentError> {
        let Some(name) = name else {
            return Ok(ValueType::String);
        };
        if let Some(domain) = self.enums.get(name) {
            return Ok(ValueType::Enum(domain.clone()));
        }
        if let Some(builtin) = ValueType::builtin(name) {
            return Ok(builtin);
        }
        let custom = ValueType::Custom(name.to_string());
        if self.registry.has_converter(&custom) {
            return Ok(custom);
        }
        Err(DocumentError::UnknownType {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

/// Defaults are written as strings; split delimiters apply to them too.
fn convert_defaults(
    registry: &ConverterRegistry,
    owner: &str,
    value_type: &ValueType,
    target: TargetKind,
    split: Option<&str>,
    raw: &[String],
) -> Result<Binding, DocumentError> {
    if raw.is_empty() {
        return Ok(Binding::Unset);
    }
    let pieces: Vec<&str> = match split {
        Some(delimiter) => raw.iter().flat_map(|r| r.split(delimiter)).collect(),
        None => raw.iter().map(String::as_str).collect(),
    };
    let mut values = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let value = registry
            .convert(value_type, piece)
            .map_err(|reason| DocumentError::InvalidDefault {
                owner: owner.to_string(),
                raw: piece.to_string(),
                reason,
            })?;
        values.push(value);
    }

    Ok(match target {
        TargetKind::Scalar => {
            if values.len() != 1 {
                return Err(DocumentError::InvalidDefault {
                    owner: owner.to_string(),
                    raw: raw.join(" "),
                    reason: "a scalar takes exactly one default".to_string(),
                });
            }
            Binding::Scalar(values.remove(0))
        }
        TargetKind::List => Binding::List(values),
        TargetKind::Set => {
            let mut set = ValueSet::new();
            for value in values {
                set.insert(value_type, value);
            }
            Binding::Set(set)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use argbind::{ParseError, Parser, Value};

    const DEBUG_DOC: &str = r#"{
        "name": "test",
        "enums": [{"name": "DebugFacility", "variants": ["FOO", "BAR", "BAZ", "ALL"]}],
        "options": [{
            "names": ["--debug"],
            "label": "FACILITY",
            "split": ",",
            "arity": "0..1",
            "fallback": "ALL",
            "type": "DebugFacility",
            "target": "set"
        }],
        "positionals": [{"label": "paths", "arity": "1..*", "type": "path", "target": "list"}]
    }"#;

    #[test]
    fn document_materializes_into_working_spec() {
        let registry = ConverterRegistry::new();
        let doc = CommandDoc::from_json(DEBUG_DOC).unwrap();
        let spec = doc.to_spec(&registry).unwrap();
        let parser = Parser::new(&spec, &registry).with_config(doc.parser_config());

        let result = parser
            .parse_from(["--debug", "--debug", "BAR", "example.txt"])
            .unwrap();
        assert_eq!(result.get_all::<String>("--debug"), ["BAR", "ALL"]);

        let failure = parser.parse_from(Vec::<String>::new()).unwrap_err();
        assert!(matches!(failure.first(), ParseError::MissingRequiredParameter { .. }));
    }

    #[test]
    fn unknown_type_names_are_rejected_unless_registered() {
        let doc = CommandDoc {
            name: "x".into(),
            options: vec![OptionDoc {
                names: vec!["--wait".into()],
                value_type: Some("duration".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = doc.to_spec(&ConverterRegistry::new()).unwrap_err();
        assert!(matches!(err, DocumentError::UnknownType { ref name, .. } if name == "duration"));

        let registry = ConverterRegistry::new().with("duration", |raw| {
            raw.strip_suffix('s')
                .and_then(|n| n.parse::<i64>().ok())
                .map(Value::Int)
                .ok_or_else(|| "expected seconds like '5s'".to_string())
        });
        let spec = doc.to_spec(&registry).unwrap();
        let result = Parser::new(&spec, &registry).parse_from(["--wait", "5s"]).unwrap();
        assert_eq!(result.get::<i64>("wait"), Some(5));
    }

    #[test]
    fn defaults_are_converted_and_shaped() {
        let doc = CommandDoc::from_json(
            r#"{
                "name": "x",
                "enums": [{"name": "Level", "variants": ["LOW", "HIGH"], "case-insensitive": true}],
                "options": [
                    {"names": ["--levels"], "type": "Level", "target": "set", "split": ",", "default": ["high,low"]},
                    {"names": ["-n"], "type": "int", "default": ["3"]}
                ]
            }"#,
        )
        .unwrap();
        let registry = ConverterRegistry::new();
        let spec = doc.to_spec(&registry).unwrap();
        let result = Parser::new(&spec, &registry).parse_from(Vec::<String>::new()).unwrap();
        assert_eq!(result.get_all::<String>("--levels"), ["LOW", "HIGH"]);
        assert_eq!(result.get::<i64>("-n"), Some(3));
        assert!(!result.is_matched("-n"));
    }

    #[test]
    fn bad_defaults_and_arities_fail_to_load() {
        let registry = ConverterRegistry::new();
        let bad_default = CommandDoc::from_json(
            r#"{"name": "x", "options": [{"names": ["-n"], "type": "int", "default": ["many"]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            bad_default.to_spec(&registry),
            Err(DocumentError::InvalidDefault { .. })
        ));

        let bad_arity = CommandDoc::from_json(
            r#"{"name": "x", "positionals": [{"label": "f", "arity": "2..1"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            bad_arity.to_spec(&registry),
            Err(DocumentError::Spec(SpecError::InvalidArity(_)))
        ));
    }

    #[test]
    fn config_section_overrides_defaults() {
        let doc = CommandDoc::from_json(
            r#"{"name": "x", "config": {"collect-all-errors": true, "end-of-options": "::"}}"#,
        )
        .unwrap();
        let config = doc.parser_config();
        assert!(config.collect_all_errors);
        assert!(config.allow_clustering);
        assert_eq!(config.end_of_options, "::");
    }

    #[test]
    fn documents_serialize_back_to_json() {
        let doc = CommandDoc::from_json(DEBUG_DOC).unwrap();
        let json = doc.to_json_pretty().unwrap();
        assert!(json.contains("\"fallback\": \"ALL\""));
        assert!(json.contains("\"target\": \"set\""));
        let again = CommandDoc::from_json(&json).unwrap();
        assert_eq!(again.options[0].names, ["--debug"]);
    }
}
