use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::ParseError;
use crate::matcher::UnmatchedToken;
use crate::spec::{CommandSpec, SpecId};
use crate::value::{Binding, FromValue, Value};

/// What one option or positional ended up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    matched: bool,
    occurrences: usize,
    fallback_used: bool,
    errored: bool,
    binding: Binding,
}

impl Entry {
    fn seeded(name: String, default: &Binding) -> Self {
        Self {
            name,
            matched: false,
            occurrences: 0,
            fallback_used: false,
            errored: false,
            binding: default.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Present on the command line, even if with no value.
    pub fn matched(&self) -> bool {
        self.matched
    }

    pub fn occurrences(&self) -> usize {
        self.occurrences
    }

    /// At least one occurrence had no explicit value and took the fallback.
    pub fn fallback_used(&self) -> bool {
        self.fallback_used
    }

    /// A value failed to convert; the binding is still the declared default.
    pub fn errored(&self) -> bool {
        self.errored
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub(crate) fn record_match(&mut self, occurrences: usize, fallback_used: bool) {
        self.matched = true;
        self.occurrences = occurrences;
        self.fallback_used = fallback_used;
    }

    pub(crate) fn mark_errored(&mut self) {
        self.errored = true;
    }

    pub(crate) fn replace_binding(&mut self, binding: Binding) {
        self.binding = binding;
    }
}

/// Everything one parse matched and bound.
///
/// Entries are keyed by [`SpecId`] and can also be looked up by any option
/// name (negated forms included) or positional label.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    command: String,
    entries: IndexMap<SpecId, Entry>,
    keys: HashMap<String, SpecId>,
    unmatched: Vec<UnmatchedToken>,
    errors: Vec<ParseError>,
}

impl ParseResult {
    /// One entry per spec, holding a fresh copy of its default.
    pub(crate) fn seeded(spec: &CommandSpec) -> Self {
        let mut entries = IndexMap::new();
        let mut keys = HashMap::new();
        for (idx, option) in spec.options().iter().enumerate() {
            let id = SpecId::Option(idx);
            entries.insert(id, Entry::seeded(option.to_string(), option.default_binding()));
            for name in option.names() {
                keys.insert(name.clone(), id);
            }
        }
        for (name, idx) in spec.negated_names() {
            keys.insert(name.to_string(), SpecId::Option(idx));
        }
        for (idx, positional) in spec.positionals().iter().enumerate() {
            let id = SpecId::Positional(idx);
            entries.insert(
                id,
                Entry::seeded(positional.to_string(), positional.default_binding()),
            );
            keys.entry(positional.label().to_string()).or_insert(id);
        }
        Self {
            command: spec.name().to_string(),
            entries,
            keys,
            unmatched: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn entry_mut(&mut self, id: SpecId) -> Option<&mut Entry> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn finish(&mut self, unmatched: Vec<UnmatchedToken>, errors: Vec<ParseError>) {
        self.unmatched = unmatched;
        self.errors = errors;
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Resolve `--name`, `-n`, a negated `--no-name`, a positional label, or
    /// a bare long name.
    pub fn id(&self, key: &str) -> Option<SpecId> {
        self.keys
            .get(key)
            .or_else(|| self.keys.get(&format!("--{key}")))
            .copied()
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.id(key).and_then(|id| self.entries.get(&id))
    }

    pub fn entry_by_id(&self, id: SpecId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (SpecId, &Entry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn is_matched(&self, key: &str) -> bool {
        self.entry(key).is_some_and(Entry::matched)
    }

    pub fn fallback_used(&self, key: &str) -> bool {
        self.entry(key).is_some_and(Entry::fallback_used)
    }

    pub fn binding(&self, key: &str) -> Option<&Binding> {
        self.entry(key).map(Entry::binding)
    }

    /// The scalar value, or the last element of a collection.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.binding(key).and_then(Binding::value)
    }

    pub fn values(&self, key: &str) -> &[Value] {
        self.binding(key).map(Binding::values).unwrap_or_default()
    }

    pub fn get<T: FromValue>(&self, key: &str) -> Option<T> {
        self.value(key).and_then(T::from_value)
    }

    /// Every value that converts to `T`.
    pub fn get_all<T: FromValue>(&self, key: &str) -> Vec<T> {
        self.values(key).iter().filter_map(T::from_value).collect()
    }

    /// Arguments kept aside because unmatched arguments were allowed.
    pub fn unmatched(&self) -> &[UnmatchedToken] {
        &self.unmatched
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
