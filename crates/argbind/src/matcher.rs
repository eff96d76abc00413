//! Assigns tokens to options and positionals.
//!
//! One forward pass over the token stream. Each option occurrence takes its
//! values greedily, bounded by its arity; values left over are distributed
//! to positionals after the pass, reserving enough of them for every later
//! positional's minimum.

use std::collections::HashSet;
use std::iter::Peekable;
use std::ops::ControlFlow;

use crate::config::ParserConfig;
use crate::convert::ConverterRegistry;
use crate::error::{ErrorSink, ParseError};
use crate::spec::{CommandSpec, OptionSpec, SpecId};
use crate::token::{Token, TokenKind, Tokenizer};

/// The raw values one occurrence of an option (or one positional) received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedArg {
    pub spec: SpecId,
    /// Values after splitting; empty for a bare flag.
    pub raw_values: Vec<String>,
    pub fallback_used: bool,
    /// Matched through the negated name (`--no-x`).
    pub negated: bool,
    pub arg_index: usize,
}

/// An argument that was neither an option nor a positional value, kept
/// because unmatched arguments are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedToken {
    pub text: String,
    pub arg_index: usize,
}

#[derive(Debug, Default)]
pub(crate) struct MatchOutcome {
    pub matched: Vec<MatchedArg>,
    pub unmatched: Vec<UnmatchedToken>,
}

pub(crate) fn match_tokens(
    spec: &CommandSpec,
    config: &ParserConfig,
    registry: &ConverterRegistry,
    tokens: Tokenizer<'_>,
    sink: &mut ErrorSink,
) -> MatchOutcome {
    let mut matcher = Matcher {
        spec,
        config,
        registry,
        tokens: tokens.peekable(),
        sink,
        outcome: MatchOutcome::default(),
        positional_values: Vec::new(),
        seen_options: HashSet::new(),
    };
    // A break means fail-fast tripped; the sink holds the reason.
    let _ = matcher.run();
    matcher.outcome.unmatched.sort_by_key(|u| u.arg_index);
    matcher.outcome
}

struct Matcher<'a, 's> {
    spec: &'a CommandSpec,
    config: &'a ParserConfig,
    registry: &'a ConverterRegistry,
    tokens: Peekable<Tokenizer<'a>>,
    sink: &'s mut ErrorSink,
    outcome: MatchOutcome,
    positional_values: Vec<(String, usize)>,
    seen_options: HashSet<usize>,
}

impl<'a> Matcher<'a, '_> {
    fn run(&mut self) -> ControlFlow<()> {
        while let Some(token) = self.tokens.next() {
            match token.kind {
                TokenKind::OptionName => self.match_option(token)?,
                TokenKind::PlainValue | TokenKind::AttachedValue => {
                    self.positional_values
                        .push((token.text.into_owned(), token.arg_index));
                }
                TokenKind::EndOfOptions => {}
                TokenKind::Unrecognized { cluster_at } => self.unrecognized(token, cluster_at)?,
            }
        }
        self.assign_positionals()?;
        self.check_required_options()
    }

    fn unrecognized(&mut self, token: Token<'a>, cluster_at: Option<char>) -> ControlFlow<()> {
        if self.config.allow_unmatched {
            self.outcome.unmatched.push(UnmatchedToken {
                text: token.text.into_owned(),
                arg_index: token.arg_index,
            });
            return ControlFlow::Continue(());
        }
        let token_text = token.text.into_owned();
        self.sink.push(match cluster_at {
            Some(at) => ParseError::AmbiguousClusterExpansion {
                token: token_text,
                arg_index: token.arg_index,
                at,
            },
            None => ParseError::UnknownOption {
                token: token_text,
                arg_index: token.arg_index,
            },
        })
    }

    fn match_option(&mut self, token: Token<'a>) -> ControlFlow<()> {
        let Some((idx, negated)) = self.spec.resolve(&token.text) else {
            return self.unrecognized(token, None);
        };
        self.seen_options.insert(idx);
        let option = self.spec.option(idx);
        let arity = option.arity();
        let mut values: Vec<String> = Vec::new();

        if let Some(attached) = self
            .tokens
            .next_if(|t| t.kind == TokenKind::AttachedValue)
        {
            if !arity.takes_values() {
                return self.sink.push(ParseError::UnexpectedValue {
                    option: token.text.into_owned(),
                    value: attached.text.into_owned(),
                });
            }
            values.push(attached.text.into_owned());
        }

        let registry = self.registry;
        while arity.accepts_more(values.len()) {
            let mandatory = arity.needs_more(values.len());
            let next = self.tokens.next_if(|t| match t.kind {
                TokenKind::PlainValue => mandatory || optional_value_fits(registry, option, &t.text),
                TokenKind::Unrecognized { .. } => mandatory,
                _ => false,
            });
            match next {
                Some(value) => values.push(value.text.into_owned()),
                None => break,
            }
        }

        let found = values.len();
        let mut fallback_used = false;
        let raw_values = if found == 0 {
            match option.fallback() {
                Some(fallback) => {
                    fallback_used = true;
                    vec![fallback.to_string()]
                }
                None if arity.min() > 0 => {
                    return self.sink.push(ParseError::MissingRequiredValue {
                        option: token.text.into_owned(),
                        arity,
                        found,
                    });
                }
                None => Vec::new(),
            }
        } else if arity.needs_more(found) {
            return self.sink.push(ParseError::MissingRequiredValue {
                option: token.text.into_owned(),
                arity,
                found,
            });
        } else {
            split_values(option.split(), values)
        };

        tracing::debug!(
            option = %token.text,
            values = ?raw_values,
            fallback_used,
            negated,
            "matched option"
        );
        self.outcome.matched.push(MatchedArg {
            spec: SpecId::Option(idx),
            raw_values,
            fallback_used,
            negated,
            arg_index: token.arg_index,
        });
        ControlFlow::Continue(())
    }

    fn assign_positionals(&mut self) -> ControlFlow<()> {
        let values = std::mem::take(&mut self.positional_values);
        let positionals = self.spec.positionals();
        let mut cursor = 0usize;

        for (i, positional) in positionals.iter().enumerate() {
            let arity = positional.arity();
            let remaining = values.len() - cursor;
            let reserve: usize = positionals[i + 1..].iter().map(|p| p.arity().min()).sum();
            let room = remaining.saturating_sub(reserve);
            let take = arity
                .max()
                .map_or(room, |max| room.min(max))
                .max(arity.min().min(remaining));

            if !arity.contains(take) {
                self.sink.push(ParseError::MissingRequiredParameter {
                    parameter: positional.to_string(),
                    arity,
                    found: take,
                })?;
                cursor += take;
                continue;
            }
            if take == 0 {
                continue;
            }

            let taken = &values[cursor..cursor + take];
            cursor += take;
            let raw: Vec<String> = taken.iter().map(|(v, _)| v.clone()).collect();
            tracing::debug!(parameter = %positional, values = ?raw, "matched positional");
            self.outcome.matched.push(MatchedArg {
                spec: SpecId::Positional(i),
                raw_values: split_values(positional.split(), raw),
                fallback_used: false,
                negated: false,
                arg_index: taken[0].1,
            });
        }

        for (text, arg_index) in values.into_iter().skip(cursor) {
            if self.config.allow_unmatched {
                self.outcome.unmatched.push(UnmatchedToken { text, arg_index });
            } else {
                self.sink.push(ParseError::UnmatchedArgument {
                    token: text,
                    arg_index,
                })?;
            }
        }
        ControlFlow::Continue(())
    }

    fn check_required_options(&mut self) -> ControlFlow<()> {
        for (idx, option) in self.spec.options().iter().enumerate() {
            if option.is_required() && !self.seen_options.contains(&idx) {
                self.sink.push(ParseError::MissingRequiredOption {
                    option: option.to_string(),
                })?;
            }
        }
        ControlFlow::Continue(())
    }
}

/// Optional values are only taken when every split piece converts;
/// otherwise the token is left for positionals.
fn optional_value_fits(registry: &ConverterRegistry, option: &OptionSpec, raw: &str) -> bool {
    let ty = option.value_type();
    match option.split() {
        Some(delimiter) => raw.split(delimiter).all(|piece| registry.accepts(ty, piece)),
        None => registry.accepts(ty, raw),
    }
}

/// Split happens after arity counting: one consumed value may yield several.
fn split_values(delimiter: Option<&str>, values: Vec<String>) -> Vec<String> {
    match delimiter {
        None => values,
        Some(delimiter) => values
            .iter()
            .flat_map(|v| v.split(delimiter).map(str::to_string))
            .collect(),
    }
}
