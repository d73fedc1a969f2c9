use std::fmt;

use fancy_regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::RuleError;

/// How free-form editor input should be interpreted by
/// [`Rule::from_input()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleKind {
    /// Plain text matched against the hostname or the full address.
    #[default]
    Domain,
    /// A regular expression; wrapped in `/…/` if the input is not already.
    Regex,
}

/// A single match condition attached to an entity.
///
/// Rules are parsed once from their raw string form: `/pattern/` becomes a
/// case-insensitive regex (lookaround and backreferences included), anything
/// else a literal substring. A delimited
/// pattern that fails to compile is kept as [`Rule::InvalidRegex`] and never
/// matches, so one malformed rule cannot block evaluation of the others.
#[derive(Debug, Clone)]
pub enum Rule {
    Regex { source: String, regex: Regex },
    InvalidRegex { source: String, reason: String },
    Substring { needle: String },
}

impl Rule {
    /// Parse a stored rule string. Never fails.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match regex_body(raw) {
            Some(pattern) => match compile_pattern(pattern) {
                Ok(regex) => Rule::Regex {
                    source: raw.to_owned(),
                    regex,
                },
                Err(reason) => Rule::InvalidRegex {
                    source: raw.to_owned(),
                    reason,
                },
            },
            None => Rule::Substring {
                needle: raw.to_owned(),
            },
        }
    }

    /// Parse user input from the rule editor.
    ///
    /// Input is trimmed; empty input and regexes that do not compile are
    /// rejected. With [`RuleKind::Regex`] an undelimited pattern is wrapped
    /// in slashes first.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::EmptyRule`] or [`RuleError::InvalidPattern`].
    pub fn from_input(input: &str, kind: RuleKind) -> Result<Self, RuleError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RuleError::EmptyRule);
        }

        let raw = match kind {
            RuleKind::Regex if regex_body(trimmed).is_none() => format!("/{trimmed}/"),
            _ => trimmed.to_owned(),
        };

        match Self::parse(&raw) {
            Rule::InvalidRegex { source, reason } => Err(RuleError::InvalidPattern {
                pattern: source,
                reason,
            }),
            rule => Ok(rule),
        }
    }

    /// The raw string this rule was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Rule::Regex { source, .. } | Rule::InvalidRegex { source, .. } => source,
            Rule::Substring { needle } => needle,
        }
    }

    #[must_use]
    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Regex { .. } | Rule::InvalidRegex { .. } => RuleKind::Regex,
            Rule::Substring { .. } => RuleKind::Domain,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        !matches!(self, Rule::InvalidRegex { .. })
    }
}

/// The interior of a `/…/` delimited rule, if it is one.
fn regex_body(raw: &str) -> Option<&str> {
    if raw.len() > 2 && raw.starts_with('/') && raw.ends_with('/') {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, String> {
    Regex::new(&format!("(?i){pattern}")).map_err(|e| e.to_string())
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.as_str() == other.as_str()
    }
}

impl Eq for Rule {}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Domain => write!(f, "DOMAIN"),
            RuleKind::Regex => write!(f, "REGEX"),
        }
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Rule::parse(&raw))
    }
}
