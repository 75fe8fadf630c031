use std::collections::BTreeMap;
use std::fmt;

use crate::SelectorError;

const MAX_NAME_LENGTH: usize = 63;
const MAX_PREFIX_LENGTH: usize = 253;

/// Comparison of a single selector term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Equals,
    NotEquals,
}

/// One `key=value` or `key!=value` term of a selector
#[derive(Debug, Clone, PartialEq, Eq)]
struct Requirement {
    key: String,
    operator: Operator,
    value: String,
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let actual = labels.get(&self.key);
        match self.operator {
            Operator::Equals => actual == Some(&self.value),
            Operator::NotEquals => actual != Some(&self.value),
        }
    }
}

/// Node label selector, a conjunction of equality terms.
///
/// Accepts `key=value`, `key==value` and `key!=value` terms separated by
/// commas. The empty selector matches every node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        if selector.trim().is_empty() {
            return Ok(Self::default());
        }

        let requirements = selector
            .split(',')
            .map(|term| parse_term(selector, term))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { requirements })
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Evaluate the selector against a label set. A `!=` term matches when
    /// the label is absent.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, requirement) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            let operator = match requirement.operator {
                Operator::Equals => "=",
                Operator::NotEquals => "!=",
            };
            write!(f, "{}{}{}", requirement.key, operator, requirement.value)?;
        }
        Ok(())
    }
}

fn parse_term(selector: &str, term: &str) -> Result<Requirement, SelectorError> {
    let missing_operator = || SelectorError::MissingOperator {
        selector: selector.to_string(),
        term: term.to_string(),
    };

    // First operator position wins; `!=` and `==` are tried before `=`.
    let (key, operator, value) = term
        .char_indices()
        .find_map(|(i, _)| {
            let rest = &term[i..];
            if rest.starts_with("!=") {
                Some((&term[..i], Operator::NotEquals, &term[i + 2..]))
            } else if rest.starts_with("==") {
                Some((&term[..i], Operator::Equals, &term[i + 2..]))
            } else if rest.starts_with('=') {
                Some((&term[..i], Operator::Equals, &term[i + 1..]))
            } else {
                None
            }
        })
        .ok_or_else(missing_operator)?;

    let key = key.trim();
    let value = value.trim();
    validate_key(key)?;
    validate_value(key, value)?;

    Ok(Requirement {
        key: key.to_string(),
        operator,
        value: value.to_string(),
    })
}

fn validate_key(key: &str) -> Result<(), SelectorError> {
    let invalid = |reason: &str| SelectorError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() || prefix.len() > MAX_PREFIX_LENGTH {
            return Err(invalid("prefix must be a DNS subdomain of at most 253 characters"));
        }
        if !is_dns_subdomain(prefix) {
            return Err(invalid("prefix must be a lowercase DNS subdomain"));
        }
    }

    if name.is_empty() {
        return Err(invalid("name part must not be empty"));
    }
    check_name(name).map_err(invalid)
}

fn validate_value(key: &str, value: &str) -> Result<(), SelectorError> {
    if value.is_empty() {
        return Ok(());
    }
    check_name(value).map_err(|reason| SelectorError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

/// Shared rule for label names and values
fn check_name(name: &str) -> Result<(), &'static str> {
    if name.len() > MAX_NAME_LENGTH {
        return Err("must be at most 63 characters");
    }
    let bytes = name.as_bytes();
    let alphanumeric_ends = bytes.first().is_some_and(u8::is_ascii_alphanumeric)
        && bytes.last().is_some_and(u8::is_ascii_alphanumeric);
    if !alphanumeric_ends {
        return Err("must start and end with an alphanumeric character");
    }
    if !bytes
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Err("may only contain alphanumerics, '-', '_' or '.'");
    }
    Ok(())
}

fn is_dns_subdomain(prefix: &str) -> bool {
    prefix.split('.').all(|label| {
        let bytes = label.as_bytes();
        !bytes.is_empty()
            && bytes.len() <= MAX_NAME_LENGTH
            && bytes[0].is_ascii_alphanumeric()
            && bytes[bytes.len() - 1].is_ascii_alphanumeric()
            && bytes
                .iter()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
    })
}
