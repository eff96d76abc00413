//! Argument matching and value binding for declarative command specs.
//!
//! A [`CommandSpec`] describes options and positional parameters (names,
//! arity, value type, split delimiter, fallback value, target kind). A
//! [`Parser`] runs three stages over an argument list:
//!
//! - [`Tokenizer`]: classifies each argument (option name, attached value,
//!   plain value, end-of-options marker) and expands short-option clusters
//! - matcher: assigns values to options greedily within their arity, then
//!   distributes the remaining values to positionals
//! - binder: converts raw values through a [`ConverterRegistry`] and
//!   accumulates them as scalar, list or set
//!
//! The result is a [`ParseResult`], or a [`ParseFailure`] holding every
//! error (or only the first, in fail-fast mode).
//!
//! ```
//! use argbind::{Arity, CommandSpec, ConverterRegistry, OptionSpec, Parser, PositionalSpec, TargetKind, ValueType};
//!
//! let spec = CommandSpec::builder("grep")
//!     .option(OptionSpec::flag(["-i", "--ignore-case"]))
//!     .option(OptionSpec::new(["-m", "--max-count"]).with_type(ValueType::Int))
//!     .positional(PositionalSpec::new("pattern"))
//!     .positional(PositionalSpec::new("files").with_arity(Arity::at_least(0)).with_target(TargetKind::List))
//!     .build()
//!     .unwrap();
//! let registry = ConverterRegistry::new();
//! let result = Parser::new(&spec, &registry)
//!     .parse_from(["-im", "3", "needle", "a.txt", "b.txt"])
//!     .unwrap();
//!
//! assert_eq!(result.get::<bool>("--ignore-case"), Some(true));
//! assert_eq!(result.get::<i64>("--max-count"), Some(3));
//! assert_eq!(result.get_all::<String>("files"), ["a.txt", "b.txt"]);
//! ```

pub mod arity;
pub mod config;
pub mod convert;
pub mod error;
pub mod matcher;
pub mod parser;
pub mod result;
pub mod spec;
pub mod token;
pub mod value;

mod binder;

pub use arity::Arity;
pub use config::ParserConfig;
pub use convert::{ConvertFn, ConverterRegistry};
pub use error::{ParseError, ParseFailure};
pub use matcher::{MatchedArg, UnmatchedToken};
pub use parser::Parser;
pub use result::{Entry, ParseResult};
pub use spec::{CommandSpec, CommandSpecBuilder, OptionSpec, PositionalSpec, SpecError, SpecId, TargetKind};
pub use token::{Token, TokenKind, Tokenizer};
pub use value::{Binding, EnumDomain, EnumValue, FromValue, Value, ValueSet, ValueType};

/// Parse `args` against `spec` with the given configuration.
pub fn parse(
    spec: &CommandSpec,
    registry: &ConverterRegistry,
    config: ParserConfig,
    args: &[String],
) -> Result<ParseResult, ParseFailure> {
    Parser::new(spec, registry).with_config(config).parse(args)
}
