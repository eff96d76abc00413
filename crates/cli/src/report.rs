use argbind::{Binding, CommandSpec, ParseFailure, ParseResult, TargetKind, Value};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParseReport {
    pub command: String,
    pub ok: bool,
    pub entries: Vec<EntryReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmatched: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ErrorReport {
    pub message: String,
    /// Position in the parsed arguments, when the error is tied to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg_index: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct EntryReport {
    pub name: String,
    pub matched: bool,
    pub occurrences: usize,
    pub fallback_used: bool,
    pub errored: bool,
    pub value: serde_json::Value,
}

impl ParseReport {
    pub fn from_result(result: &ParseResult) -> Self {
        let entries = result
            .entries()
            .map(|(_, entry)| EntryReport {
                name: entry.name().to_string(),
                matched: entry.matched(),
                occurrences: entry.occurrences(),
                fallback_used: entry.fallback_used(),
                errored: entry.errored(),
                value: binding_json(entry.binding()),
            })
            .collect();
        Self {
            command: result.command().to_string(),
            ok: !result.has_errors(),
            entries,
            unmatched: result.unmatched().iter().map(|u| u.text.clone()).collect(),
            errors: result
                .errors()
                .iter()
                .map(|error| ErrorReport {
                    message: error.to_string(),
                    arg_index: error.arg_index(),
                })
                .collect(),
        }
    }

    pub fn from_failure(failure: &ParseFailure) -> Self {
        Self::from_result(failure.partial())
    }

    pub fn print_human(&self) {
        println!("command: {}", self.command);
        for entry in &self.entries {
            let mut marks = Vec::new();
            if entry.occurrences > 1 {
                marks.push(format!("x{}", entry.occurrences));
            }
            if entry.fallback_used {
                marks.push("fallback".to_string());
            }
            if entry.errored {
                marks.push("errored".to_string());
            }
            if !entry.matched {
                marks.push("default".to_string());
            }
            let marks = if marks.is_empty() {
                String::new()
            } else {
                format!("  ({})", marks.join(", "))
            };
            println!("  {} = {}{marks}", entry.name, entry.value);
        }
        if !self.unmatched.is_empty() {
            println!("unmatched: {}", self.unmatched.join(" "));
        }
    }
}

fn binding_json(binding: &Binding) -> serde_json::Value {
    match binding {
        Binding::Unset => serde_json::Value::Null,
        Binding::Scalar(value) => value_json(value),
        Binding::List(values) => values.iter().map(value_json).collect(),
        Binding::Set(set) => set.iter().map(value_json).collect(),
    }
}

fn value_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(b) => (*b).into(),
        Value::Int(n) => (*n).into(),
        // NaN and infinities become null
        Value::Float(f) => (*f).into(),
        other => other.to_string().into(),
    }
}

/// Summary of a loaded command document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CheckReport {
    pub command: String,
    pub negation_marker: String,
    pub options: Vec<SpecSummary>,
    pub positionals: Vec<SpecSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SpecSummary {
    pub name: String,
    pub arity: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub target: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

impl CheckReport {
    pub fn from_spec(spec: &CommandSpec) -> Self {
        let options = spec
            .options()
            .iter()
            .map(|option| SpecSummary {
                name: option.names().join(", "),
                arity: option.arity().to_string(),
                value_type: option.value_type().to_string(),
                target: target_name(option.target()),
                index: None,
                fallback: option.fallback().map(str::to_string),
                required: option.is_required(),
            })
            .collect();
        let positionals = spec
            .positionals()
            .iter()
            .map(|positional| SpecSummary {
                name: positional.to_string(),
                arity: positional.arity().to_string(),
                value_type: positional.value_type().to_string(),
                target: target_name(positional.target()),
                index: positional.index().map(|index| index.to_string()),
                fallback: None,
                required: positional.arity().min() > 0,
            })
            .collect();
        Self {
            command: spec.name().to_string(),
            negation_marker: spec.negation_marker().to_string(),
            options,
            positionals,
        }
    }

    pub fn print_human(&self) {
        eprintln!("=== Command: {} ===", self.command);
        eprintln!("Options: {}", self.options.len());
        for option in &self.options {
            eprintln!("  {}", summary_line(option));
        }
        eprintln!("Positionals: {}", self.positionals.len());
        for positional in &self.positionals {
            eprintln!("  {}", summary_line(positional));
        }
    }
}

fn summary_line(summary: &SpecSummary) -> String {
    let mut line = format!(
        "{}  arity={} type={} target={}",
        summary.name, summary.arity, summary.value_type, summary.target
    );
    if let Some(index) = &summary.index {
        line.push_str(&format!(" index={index}"));
    }
    if let Some(fallback) = &summary.fallback {
        line.push_str(&format!(" fallback={fallback}"));
    }
    if summary.required {
        line.push_str(" required");
    }
    line
}

fn target_name(target: TargetKind) -> &'static str {
    match target {
        TargetKind::Scalar => "scalar",
        TargetKind::List => "list",
        TargetKind::Set => "set",
    }
}
