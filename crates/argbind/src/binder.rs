//! Converts matched raw values and accumulates them per target kind.

use std::ops::ControlFlow;

use indexmap::IndexMap;

use crate::convert::ConverterRegistry;
use crate::error::{ErrorSink, ParseError};
use crate::matcher::MatchedArg;
use crate::result::ParseResult;
use crate::spec::{CommandSpec, SpecId, TargetKind};
use crate::value::{Binding, Value, ValueSet, ValueType};

/// Bind every matched spec into `result`.
///
/// Specs are bound one at a time. A spec with any failed conversion keeps its
/// default and is marked errored; other specs are still bound unless the sink
/// asks to stop.
pub(crate) fn bind(
    spec: &CommandSpec,
    registry: &ConverterRegistry,
    matched: &[MatchedArg],
    result: &mut ParseResult,
    sink: &mut ErrorSink,
) -> ControlFlow<()> {
    let mut groups: IndexMap<SpecId, Vec<&MatchedArg>> = IndexMap::new();
    for arg in matched {
        groups.entry(arg.spec).or_default().push(arg);
    }

    for (id, occurrences) in groups {
        let (value_type, target) = match id {
            SpecId::Option(idx) => {
                let option = spec.option(idx);
                (option.value_type(), option.target())
            }
            SpecId::Positional(idx) => {
                let positional = spec.positional(idx);
                (positional.value_type(), positional.target())
            }
        };
        let accumulator = Accumulator::new(value_type, target);
        let name = spec.display_name(id);
        let bound = accumulator.run(registry, &name, &occurrences, sink);

        let Some(entry) = result.entry_mut(id) else {
            continue;
        };
        let fallback_used = occurrences.iter().any(|o| o.fallback_used);
        entry.record_match(occurrences.len(), fallback_used);
        match bound {
            Bound::Failed => entry.mark_errored(),
            Bound::Untouched => {}
            Bound::Value(binding) => entry.replace_binding(binding),
        }
        tracing::debug!(spec = %name, errored = entry.errored(), "bound");
        if sink.stopped() {
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

enum Bound {
    /// Matched only as bare flags with nothing to store.
    Untouched,
    Failed,
    Value(Binding),
}

/// Scratch binding for one spec. Collections start empty, so the first
/// match replaces the declared default rather than extending it.
struct Accumulator<'a> {
    value_type: &'a ValueType,
    binding: Binding,
    stored: bool,
}

impl<'a> Accumulator<'a> {
    fn new(value_type: &'a ValueType, target: TargetKind) -> Self {
        let binding = match target {
            TargetKind::Scalar => Binding::Unset,
            TargetKind::List => Binding::List(Vec::new()),
            TargetKind::Set => Binding::Set(ValueSet::new()),
        };
        Self {
            value_type,
            binding,
            stored: false,
        }
    }

    fn run(
        mut self,
        registry: &ConverterRegistry,
        name: &str,
        occurrences: &[&MatchedArg],
        sink: &mut ErrorSink,
    ) -> Bound {
        let mut failed = false;
        for occurrence in occurrences {
            if occurrence.raw_values.is_empty() {
                if self.value_type.is_bool() {
                    self.store(Value::Bool(!occurrence.negated));
                }
                continue;
            }
            for raw in &occurrence.raw_values {
                match registry.convert(self.value_type, raw) {
                    Ok(value) => self.store(negate_if(occurrence.negated, value)),
                    Err(reason) => {
                        failed = true;
                        let flow = sink.push(ParseError::TypeConversion {
                            target: name.to_string(),
                            raw: raw.clone(),
                            type_name: self.value_type.to_string(),
                            reason,
                        });
                        if flow.is_break() {
                            return Bound::Failed;
                        }
                    }
                }
            }
        }
        if failed {
            Bound::Failed
        } else if self.stored {
            Bound::Value(self.binding)
        } else {
            Bound::Untouched
        }
    }

    fn store(&mut self, value: Value) {
        self.stored = true;
        match &mut self.binding {
            Binding::List(values) => values.push(value),
            Binding::Set(set) => {
                set.insert(self.value_type, value);
            }
            scalar => *scalar = Binding::Scalar(value),
        }
    }
}

fn negate_if(negated: bool, value: Value) -> Value {
    match value {
        Value::Bool(b) if negated => Value::Bool(!b),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arity::Arity;
    use crate::spec::{OptionSpec, PositionalSpec};

    fn occurrence(spec: SpecId, raw: &[&str]) -> MatchedArg {
        MatchedArg {
            spec,
            raw_values: raw.iter().map(|s| s.to_string()).collect(),
            fallback_used: false,
            negated: false,
            arg_index: 0,
        }
    }

    fn bind_all(spec: &CommandSpec, matched: &[MatchedArg], collect_all: bool) -> (ParseResult, Vec<ParseError>) {
        let mut result = ParseResult::seeded(spec);
        let mut sink = ErrorSink::new(collect_all);
        let _ = bind(spec, &ConverterRegistry::new(), matched, &mut result, &mut sink);
        (result, sink.into_errors())
    }

    #[test]
    fn scalar_last_wins_and_list_keeps_duplicates() {
        let spec = CommandSpec::builder("x")
            .option(OptionSpec::new(["--level"]).with_type(ValueType::Int))
            .option(OptionSpec::new(["--tag"]).with_target(TargetKind::List))
            .build()
            .unwrap();
        let level = SpecId::Option(0);
        let tag = SpecId::Option(1);
        let matched = [
            occurrence(level, &["1"]),
            occurrence(tag, &["a"]),
            occurrence(level, &["3"]),
            occurrence(tag, &["a"]),
        ];
        let (result, errors) = bind_all(&spec, &matched, false);
        assert!(errors.is_empty());
        assert_eq!(result.get::<i64>("--level"), Some(3));
        assert_eq!(result.get_all::<String>("--tag"), ["a", "a"]);
        assert_eq!(result.entry("--level").unwrap().occurrences(), 2);
    }

    #[test]
    fn failed_conversion_keeps_default_and_marks_errored() {
        let spec = CommandSpec::builder("x")
            .option(
                OptionSpec::new(["--n"])
                    .with_type(ValueType::Int)
                    .with_default(Binding::Scalar(Value::Int(10))),
            )
            .option(OptionSpec::new(["--m"]).with_type(ValueType::Int))
            .build()
            .unwrap();
        let matched = [
            occurrence(SpecId::Option(0), &["5"]),
            occurrence(SpecId::Option(0), &["five"]),
            occurrence(SpecId::Option(1), &["x"]),
        ];
        let (result, errors) = bind_all(&spec, &matched, true);
        assert_eq!(errors.len(), 2);
        let n = result.entry("--n").unwrap();
        assert!(n.errored() && n.matched());
        assert_eq!(n.binding(), &Binding::Scalar(Value::Int(10)));
        assert!(matches!(
            &errors[0],
            ParseError::TypeConversion { raw, target, .. } if raw == "five" && target == "--n"
        ));
    }

    #[test]
    fn fail_fast_stops_after_first_bad_value() {
        let spec = CommandSpec::builder("x")
            .option(OptionSpec::new(["--a"]).with_type(ValueType::Int))
            .option(OptionSpec::new(["--b"]).with_type(ValueType::Int))
            .build()
            .unwrap();
        let matched = [
            occurrence(SpecId::Option(0), &["bad"]),
            occurrence(SpecId::Option(1), &["2"]),
        ];
        let (result, errors) = bind_all(&spec, &matched, false);
        assert_eq!(errors.len(), 1);
        assert!(!result.is_matched("--b"));
    }

    #[test]
    fn bare_flags_and_negation() {
        let spec = CommandSpec::builder("x")
            .option(OptionSpec::flag(["--color"]).negatable(true))
            .option(
                OptionSpec::new(["--cache"])
                    .with_type(ValueType::Bool)
                    .with_arity(Arity::optional())
                    .negatable(true),
            )
            .option(OptionSpec::new(["--name"]).with_arity(Arity::optional()))
            .build()
            .unwrap();
        let mut color = occurrence(SpecId::Option(0), &[]);
        color.negated = true;
        let mut cache = occurrence(SpecId::Option(1), &["false"]);
        cache.negated = true;
        let name = occurrence(SpecId::Option(2), &[]);
        let (result, errors) = bind_all(&spec, &[color, cache, name], false);
        assert!(errors.is_empty());
        assert_eq!(result.get::<bool>("--color"), Some(false));
        assert_eq!(result.get::<bool>("--cache"), Some(true));
        assert!(result.is_matched("--name"));
        assert!(result.binding("--name").unwrap().is_unset());
    }

    #[test]
    fn collections_replace_default_on_first_match() {
        let spec = CommandSpec::builder("x")
            .positional(
                PositionalSpec::new("files")
                    .with_target(TargetKind::List)
                    .with_default(Binding::List(vec![Value::Str("-".into())])),
            )
            .build()
            .unwrap();
        let (untouched, _) = bind_all(&spec, &[], false);
        assert_eq!(untouched.get_all::<String>("files"), ["-"]);

        let matched = [occurrence(SpecId::Positional(0), &["a", "b"])];
        let (result, _) = bind_all(&spec, &matched, false);
        assert_eq!(result.get_all::<String>("files"), ["a", "b"]);
    }
}
