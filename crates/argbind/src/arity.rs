use std::fmt;
use std::str::FromStr;

use crate::spec::SpecError;

/// How many values an option or positional parameter accepts.
///
/// Written as `N`, `N..M`, `N..*` or `*` (shorthand for `0..*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arity {
    min: usize,
    max: Option<usize>,
}

impl Arity {
    /// Bounded range. Fails when `min > max`.
    pub fn new(min: usize, max: usize) -> Result<Self, SpecError> {
        if min > max {
            return Err(SpecError::InvalidArity(format!("{min}..{max}")));
        }
        Ok(Self {
            min,
            max: Some(max),
        })
    }

    pub const fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    /// `0`: a flag that never takes a value.
    pub const fn zero() -> Self {
        Self::exactly(0)
    }

    /// `0..1`: a value may follow.
    pub const fn optional() -> Self {
        Self {
            min: 0,
            max: Some(1),
        }
    }

    pub fn min(&self) -> usize {
        self.min
    }

    /// `None` means unbounded.
    pub fn max(&self) -> Option<usize> {
        self.max
    }

    pub fn contains(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }

    /// Whether `count` values still leave the minimum unmet.
    pub fn needs_more(&self, count: usize) -> bool {
        count < self.min
    }

    /// Whether another value may be taken after `count` values.
    pub fn accepts_more(&self, count: usize) -> bool {
        self.max.is_none_or(|max| count < max)
    }

    pub fn takes_values(&self) -> bool {
        self.max != Some(0)
    }
}

impl Default for Arity {
    fn default() -> Self {
        Self::exactly(1)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", self.min),
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..*", self.min),
        }
    }
}

impl FromStr for Arity {
    type Err = SpecError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let text = raw.trim();
        let invalid = || SpecError::InvalidArity(raw.to_string());
        let bound = |s: &str| s.trim().parse::<usize>().map_err(|_| invalid());

        if text == "*" {
            return Ok(Self::at_least(0));
        }
        match text.split_once("..") {
            None => Ok(Self::exactly(bound(text)?)),
            Some((min, max)) => {
                let min = bound(min)?;
                if max.trim() == "*" {
                    Ok(Self::at_least(min))
                } else {
                    Self::new(min, bound(max)?).map_err(|_| invalid())
                }
            }
        }
    }
}
