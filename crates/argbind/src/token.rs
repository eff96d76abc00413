//! Classification of raw arguments into tokens.

use std::borrow::Cow;
use std::collections::VecDeque;

use crate::config::ParserConfig;
use crate::spec::CommandSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A declared option name, possibly negated or expanded from a cluster.
    OptionName,
    /// Text glued to the preceding option name (`--opt=value`, `-ovalue`).
    AttachedValue,
    PlainValue,
    EndOfOptions,
    /// Looks like an option but matches no declared name. `cluster_at` is
    /// set when a cluster broke part way through at that character.
    Unrecognized { cluster_at: Option<char> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: Cow<'a, str>,
    /// Position of the raw argument this token came from.
    pub arg_index: usize,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, text: impl Into<Cow<'a, str>>, arg_index: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            arg_index,
        }
    }

    /// Whether this token can serve as a value for an option or positional.
    pub fn is_value(&self) -> bool {
        matches!(self.kind, TokenKind::PlainValue | TokenKind::AttachedValue)
    }
}

enum Cluster<'a> {
    Expanded(Vec<Token<'a>>),
    /// The first character is not a short option.
    NotCluster,
    /// Expansion stopped at an unknown character.
    Broken(char),
}

/// Lazy tokenizer over one argument list.
///
/// Each raw argument is classified when the previous one's tokens have been
/// drained. Build a new tokenizer to start over.
pub struct Tokenizer<'a> {
    spec: &'a CommandSpec,
    config: &'a ParserConfig,
    args: &'a [String],
    next_arg: usize,
    pending: VecDeque<Token<'a>>,
    options_ended: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(spec: &'a CommandSpec, config: &'a ParserConfig, args: &'a [String]) -> Self {
        Self {
            spec,
            config,
            args,
            next_arg: 0,
            pending: VecDeque::new(),
            options_ended: false,
        }
    }

    fn classify(&mut self, arg_index: usize) {
        let args = self.args;
        let arg = args[arg_index].as_str();

        if self.options_ended {
            self.push(TokenKind::PlainValue, arg, arg_index);
            return;
        }
        if arg == self.config.end_of_options {
            self.options_ended = true;
            self.push(TokenKind::EndOfOptions, arg, arg_index);
            return;
        }
        if self.spec.is_option_name(arg) {
            self.push(TokenKind::OptionName, arg, arg_index);
            return;
        }
        if let Some((name, value)) = self.split_attached(arg) {
            self.push(TokenKind::OptionName, name, arg_index);
            self.push(TokenKind::AttachedValue, value, arg_index);
            return;
        }
        if arg.len() < 2 || !arg.starts_with('-') {
            self.push(TokenKind::PlainValue, arg, arg_index);
            return;
        }

        let cluster = if arg.starts_with("--") {
            Cluster::NotCluster
        } else {
            self.expand_cluster(arg, arg_index)
        };
        match cluster {
            Cluster::Expanded(tokens) => self.pending.extend(tokens),
            Cluster::NotCluster if looks_numeric(arg) => {
                self.push(TokenKind::PlainValue, arg, arg_index)
            }
            Cluster::NotCluster => {
                self.push(TokenKind::Unrecognized { cluster_at: None }, arg, arg_index)
            }
            Cluster::Broken(c) => self.push(
                TokenKind::Unrecognized {
                    cluster_at: Some(c),
                },
                arg,
                arg_index,
            ),
        }
    }

    fn push(&mut self, kind: TokenKind, text: &'a str, arg_index: usize) {
        self.pending.push_back(Token::new(kind, text, arg_index));
    }

    /// `name=value` or `name:value` where `name` is declared.
    fn split_attached(&self, arg: &'a str) -> Option<(&'a str, &'a str)> {
        arg.char_indices()
            .filter(|&(_, c)| c == '=' || c == ':')
            .map(|(at, _)| (&arg[..at], &arg[at + 1..]))
            .find(|(name, _)| self.spec.is_option_name(name))
    }

    fn expand_cluster(&self, arg: &'a str, arg_index: usize) -> Cluster<'a> {
        let body = &arg[1..];
        let mut tokens = Vec::new();

        for (at, c) in body.char_indices() {
            let Some(idx) = self.spec.short_option(c) else {
                return if tokens.is_empty() {
                    Cluster::NotCluster
                } else {
                    Cluster::Broken(c)
                };
            };
            tokens.push(Token::new(TokenKind::OptionName, format!("-{c}"), arg_index));

            let rest = &body[at + c.len_utf8()..];
            if rest.is_empty() {
                return Cluster::Expanded(tokens);
            }
            let arity = self.spec.option(idx).arity();
            if arity.takes_values() {
                // An optional value yields to a run of further short options.
                if arity.min() == 0 && self.config.allow_clustering && self.is_cluster(rest) {
                    continue;
                }
                let value = rest.strip_prefix('=').unwrap_or(rest);
                tokens.push(Token::new(TokenKind::AttachedValue, value, arg_index));
                return Cluster::Expanded(tokens);
            }
            if !self.config.allow_clustering {
                return Cluster::NotCluster;
            }
        }
        Cluster::Expanded(tokens)
    }

    fn is_cluster(&self, chars: &str) -> bool {
        chars.chars().all(|c| self.spec.short_option(c).is_some())
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pending.is_empty() {
            if self.next_arg >= self.args.len() {
                return None;
            }
            let idx = self.next_arg;
            self.next_arg += 1;
            self.classify(idx);
        }
        let token = self.pending.pop_front();
        if let Some(t) = &token {
            tracing::trace!(kind = ?t.kind, text = %t.text, arg = t.arg_index, "token");
        }
        token
    }
}

/// `-5`, `-0.25`, `-.5`, `-1e3`: negative numbers are values, not options.
/// Spelled-out floats such as `-inf` or `-NaN` are not.
fn looks_numeric(arg: &str) -> bool {
    let Some(body) = arg.strip_prefix('-') else {
        return false;
    };
    let digits = body.strip_prefix('.').unwrap_or(body);
    digits.starts_with(|c: char| c.is_ascii_digit()) && arg.parse::<f64>().is_ok()
}
