use crate::binder;
use crate::config::ParserConfig;
use crate::convert::ConverterRegistry;
use crate::error::{ErrorSink, ParseFailure};
use crate::matcher;
use crate::result::ParseResult;
use crate::spec::CommandSpec;
use crate::token::Tokenizer;

/// Runs the tokenizer, matcher and binder for one command.
///
/// Holds only shared references, so one parser (or many) can serve
/// concurrent parses of independent argument lists.
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    spec: &'a CommandSpec,
    registry: &'a ConverterRegistry,
    config: ParserConfig,
}

impl<'a> Parser<'a> {
    pub fn new(spec: &'a CommandSpec, registry: &'a ConverterRegistry) -> Self {
        Self {
            spec,
            registry,
            config: ParserConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `args` (without the program name).
    pub fn parse(&self, args: &[String]) -> Result<ParseResult, ParseFailure> {
        tracing::debug!(command = self.spec.name(), args = args.len(), "parsing arguments");

        let mut sink = ErrorSink::new(self.config.collect_all_errors);
        let mut result = ParseResult::seeded(self.spec);

        let tokens = Tokenizer::new(self.spec, &self.config, args);
        let outcome = matcher::match_tokens(self.spec, &self.config, self.registry, tokens, &mut sink);
        if !sink.stopped() {
            let _ = binder::bind(
                self.spec,
                self.registry,
                &outcome.matched,
                &mut result,
                &mut sink,
            );
        }

        result.finish(outcome.unmatched, sink.into_errors());
        if result.has_errors() {
            Err(ParseFailure::new(result))
        } else {
            Ok(result)
        }
    }

    /// Convenience for anything that yields strings.
    pub fn parse_from<I, S>(&self, args: I) -> Result<ParseResult, ParseFailure>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        self.parse(&args)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::arity::Arity;
    use crate::error::ParseError;
    use crate::spec::{OptionSpec, PositionalSpec, TargetKind};
    use crate::value::{Binding, EnumDomain, Value, ValueSet, ValueType};

    fn facility() -> ValueType {
        ValueType::Enum(Arc::new(EnumDomain::new(
            "DebugFacility",
            ["FOO", "BAR", "BAZ", "ALL"],
        )))
    }

    fn debug_command() -> CommandSpec {
        CommandSpec::builder("test")
            .option(
                OptionSpec::new(["--debug"])
                    .with_label("FACILITY")
                    .with_split(",")
                    .with_arity(Arity::optional())
                    .with_fallback("ALL")
                    .with_type(facility())
                    .with_target(TargetKind::Set)
                    .with_default(Binding::Set(ValueSet::new())),
            )
            .positional(
                PositionalSpec::new("paths")
                    .with_arity(Arity::at_least(1))
                    .with_type(ValueType::Path)
                    .with_target(TargetKind::List),
            )
            .build()
            .unwrap()
    }

    fn facilities(result: &ParseResult) -> Vec<String> {
        result.get_all::<String>("--debug")
    }

    fn parse(args: &[&str]) -> Result<ParseResult, ParseFailure> {
        let spec = debug_command();
        let registry = ConverterRegistry::new();
        Parser::new(&spec, &registry).parse_from(args.iter().copied())
    }

    fn paths(result: &ParseResult) -> Vec<PathBuf> {
        result.get_all::<PathBuf>("paths")
    }

    #[test]
    fn single_option() {
        let result = parse(&["--debug", "ALL", "example.txt"]).unwrap();
        assert_eq!(facilities(&result), ["ALL"]);
        assert_eq!(paths(&result), [PathBuf::from("example.txt")]);
        assert!(!result.fallback_used("--debug"));
    }

    #[test]
    fn single_option_with_comma_separated_values() {
        let result = parse(&["--debug", "FOO,BAR", "example.txt"]).unwrap();
        assert_eq!(facilities(&result), ["FOO", "BAR"]);
        assert_eq!(paths(&result), [PathBuf::from("example.txt")]);
    }

    #[test]
    fn single_option_with_fallback() {
        let result = parse(&["--debug", "example.txt"]).unwrap();
        assert_eq!(facilities(&result), ["ALL"]);
        assert_eq!(paths(&result), [PathBuf::from("example.txt")]);
        assert!(result.fallback_used("--debug"));
    }

    #[test]
    fn multiple_options() {
        let result = parse(&["--debug", "FOO", "--debug", "BAR", "example.txt"]).unwrap();
        assert_eq!(facilities(&result), ["FOO", "BAR"]);
        assert_eq!(paths(&result), [PathBuf::from("example.txt")]);
        assert_eq!(result.entry("--debug").unwrap().occurrences(), 2);
    }

    #[test]
    fn multiple_options_with_fallback() {
        let result = parse(&["--debug", "--debug", "BAR", "example.txt"]).unwrap();
        assert_eq!(facilities(&result), ["BAR", "ALL"]);
        assert_eq!(paths(&result), [PathBuf::from("example.txt")]);
    }

    #[test]
    fn no_arguments_misses_paths() {
        let failure = parse(&[]).unwrap_err();
        assert_eq!(failure.errors().len(), 1);
        assert!(matches!(
            failure.first(),
            ParseError::MissingRequiredParameter { parameter, .. } if parameter == "<paths>"
        ));
        assert!(!failure.partial().is_matched("--debug"));
    }

    #[test]
    fn fallback_at_end_of_input_or_before_option() {
        let spec = CommandSpec::builder("t")
            .option(
                OptionSpec::new(["--level"])
                    .with_arity(Arity::optional())
                    .with_fallback("F")
                    .with_target(TargetKind::Set),
            )
            .option(OptionSpec::flag(["-q"]))
            .build()
            .unwrap();
        let registry = ConverterRegistry::new();
        let parser = Parser::new(&spec, &registry);
        for args in [vec!["--level"], vec!["--level", "-q"]] {
            let result = parser.parse_from(args).unwrap();
            assert_eq!(result.values("--level"), [Value::Str("F".into())]);
        }
    }

    #[test]
    fn split_equals_repetition_for_sets() {
        let a = parse(&["--debug", "BAZ,FOO", "x"]).unwrap();
        let b = parse(&["--debug", "FOO", "--debug", "BAZ", "x"]).unwrap();
        assert_eq!(a.binding("--debug"), b.binding("--debug"));
    }

    #[test]
    fn reparsing_is_value_equal() {
        let spec = debug_command();
        let registry = ConverterRegistry::new();
        let parser = Parser::new(&spec, &registry);
        let args: Vec<String> = ["--debug", "FOO", "a", "b"].map(String::from).to_vec();
        assert_eq!(parser.parse(&args).unwrap(), parser.parse(&args).unwrap());
    }

    #[test]
    fn defaults_are_not_shared_between_parses() {
        let spec = debug_command();
        let registry = ConverterRegistry::new();
        let parser = Parser::new(&spec, &registry);
        let first = parser.parse_from(["--debug", "FOO", "a"]).unwrap();
        let second = parser.parse_from(["a"]).unwrap();
        assert_eq!(facilities(&first), ["FOO"]);
        assert!(facilities(&second).is_empty());
        assert!(!second.is_matched("--debug"));
        assert_eq!(spec.option(0).default_binding(), &Binding::Set(ValueSet::new()));
    }

    #[test]
    fn collect_all_reports_every_error() {
        let spec = debug_command();
        let registry = ConverterRegistry::new();
        let parser = Parser::new(&spec, &registry)
            .with_config(ParserConfig::default().collect_all_errors(true));
        let failure = parser
            .parse_from(["--debug=QUX", "--verbose"])
            .unwrap_err();
        let kinds: Vec<&str> = failure
            .errors()
            .iter()
            .map(|e| match e {
                ParseError::UnknownOption { .. } => "unknown",
                ParseError::MissingRequiredParameter { .. } => "missing",
                ParseError::TypeConversion { .. } => "convert",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, ["unknown", "missing", "convert"]);
        assert!(failure.partial().entry("--debug").unwrap().errored());
        assert!(failure.to_string().contains("and 2 more errors"));
    }

    #[test]
    fn unmatched_arguments_are_surfaced_when_allowed() {
        let spec = debug_command();
        let registry = ConverterRegistry::new();
        let parser = Parser::new(&spec, &registry)
            .with_config(ParserConfig::default().allow_unmatched(true));
        let result = parser.parse_from(["--verbose", "a.txt"]).unwrap();
        assert_eq!(result.unmatched().len(), 1);
        assert_eq!(result.unmatched()[0].text, "--verbose");
        assert_eq!(paths(&result), [PathBuf::from("a.txt")]);
    }

    #[test]
    fn one_to_many_positional_fails_only_without_values() {
        let spec = CommandSpec::builder("t")
            .option(OptionSpec::new(["-o"]))
            .positional(
                PositionalSpec::new("inputs")
                    .with_arity(Arity::at_least(1))
                    .with_target(TargetKind::List),
            )
            .build()
            .unwrap();
        let registry = ConverterRegistry::new();
        let parser = Parser::new(&spec, &registry);
        assert!(parser.parse_from(["-o", "out"]).is_err());
        assert!(parser.parse_from(["-o", "out", "in"]).is_ok());
        assert!(parser.parse_from(["--", "-o"]).is_ok());
    }

    fn verbose_command() -> CommandSpec {
        CommandSpec::builder("t")
            .option(OptionSpec::flag(["-v", "--verbose"]).negatable(true))
            .option(OptionSpec::flag(["-x"]))
            .build()
            .unwrap()
    }

    #[test]
    fn negated_name_binds_false() {
        let spec = verbose_command();
        let registry = ConverterRegistry::new();
        let parser = Parser::new(&spec, &registry);

        let result = parser.parse_from(["--no-verbose"]).unwrap();
        assert_eq!(result.get::<bool>("--verbose"), Some(false));
        assert_eq!(result.get::<bool>("--no-verbose"), Some(false));
        assert!(result.is_matched("-v"));

        let result = parser.parse_from(["--no-verbose", "-v"]).unwrap();
        assert_eq!(result.get::<bool>("--verbose"), Some(true));
    }

    #[test]
    fn broken_cluster_reports_offending_character() {
        let spec = verbose_command();
        let registry = ConverterRegistry::new();
        let failure = Parser::new(&spec, &registry).parse_from(["-vq"]).unwrap_err();
        assert_eq!(
            failure.errors(),
            [ParseError::AmbiguousClusterExpansion {
                token: "-vq".into(),
                arg_index: 0,
                at: 'q',
            }]
        );
        assert!(!failure.partial().is_matched("-v"));
    }

    #[test]
    fn spelled_out_float_is_an_unknown_option() {
        let spec = debug_command();
        let registry = ConverterRegistry::new();
        let failure = Parser::new(&spec, &registry)
            .parse_from(["a.txt", "-inf"])
            .unwrap_err();
        assert!(matches!(
            failure.first(),
            ParseError::UnknownOption { token, arg_index: 1 } if token == "-inf"
        ));
    }

    #[test]
    fn parser_is_shareable_across_threads() {
        let spec = debug_command();
        let registry = ConverterRegistry::new();
        let parser = Parser::new(&spec, &registry);
        std::thread::scope(|scope| {
            let handles: Vec<_> = ["FOO", "BAR"]
                .into_iter()
                .map(|facility| {
                    let parser = &parser;
                    scope.spawn(move || parser.parse_from(["--debug", facility, "x"]).unwrap())
                })
                .collect();
            let results: Vec<ParseResult> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert_eq!(facilities(&results[0]), ["FOO"]);
            assert_eq!(facilities(&results[1]), ["BAR"]);
        });
    }
}
