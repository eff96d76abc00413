/// Parser behavior switches, independent of any one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Everything after this argument is positional.
    pub end_of_options: String,
    /// Expand `-abc` into `-a -b -c`.
    pub allow_clustering: bool,
    /// Record unknown options and surplus positionals instead of failing.
    pub allow_unmatched: bool,
    /// Keep going after the first error and report all of them.
    pub collect_all_errors: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            end_of_options: "--".to_string(),
            allow_clustering: true,
            allow_unmatched: false,
            collect_all_errors: false,
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn end_of_options(mut self, marker: impl Into<String>) -> Self {
        self.end_of_options = marker.into();
        self
    }

    pub fn allow_clustering(mut self, yes: bool) -> Self {
        self.allow_clustering = yes;
        self
    }

    pub fn allow_unmatched(mut self, yes: bool) -> Self {
        self.allow_unmatched = yes;
        self
    }

    pub fn collect_all_errors(mut self, yes: bool) -> Self {
        self.collect_all_errors = yes;
        self
    }
}
