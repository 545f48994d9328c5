use crate::error::{FieldError, FieldPath};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Max length of the name part of a label key.
const LABEL_KEY_NAME_MAX_LEN: usize = 63;
/// Max length of the optional DNS-subdomain prefix of a label key.
const LABEL_KEY_PREFIX_MAX_LEN: usize = 253;

/// Operators understood by label requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
    GreaterThan,
    LessThan,
}

/// A single validated label constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    key: String,
    operator: Operator,
    values: BTreeSet<String>,
}

impl Requirement {
    /// Build a validated requirement. Every defect found is reported,
    /// not just the first; all errors are attributed to `path`.
    pub fn new(
        key: &str,
        operator: Operator,
        values: Vec<String>,
        path: &FieldPath,
    ) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();

        for violation in validate_label_key(key) {
            errors.push(FieldError::invalid(
                path,
                format!("invalid label key {:?}: {}", key, violation),
            ));
        }

        match operator {
            Operator::In | Operator::NotIn => {
                if values.is_empty() {
                    errors.push(FieldError::invalid(
                        path,
                        "for 'in', 'notin' operators, values set can't be empty",
                    ));
                }
            }
            Operator::Exists | Operator::DoesNotExist => {
                if !values.is_empty() {
                    errors.push(FieldError::invalid(
                        path,
                        "values set must be empty for exists and does not exist",
                    ));
                }
            }
            Operator::GreaterThan | Operator::LessThan => {
                if values.len() != 1 {
                    errors.push(FieldError::invalid(
                        path,
                        "for 'Gt', 'Lt' operators, exactly one value is required",
                    ));
                }
                for value in &values {
                    if value.parse::<i64>().is_err() {
                        errors.push(FieldError::invalid(
                            path,
                            "for 'Gt', 'Lt' operators, the value must be an integer",
                        ));
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            key: key.to_string(),
            operator,
            values: values.into_iter().collect(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn values(&self) -> &BTreeSet<String> {
        &self.values
    }

    /// Whether the given label map satisfies this requirement.
    ///
    /// `NotIn` is satisfied by an absent key. `Gt`/`Lt` require the
    /// label value to parse as an integer; anything else is no match.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self.operator {
            Operator::In => labels
                .get(&self.key)
                .is_some_and(|value| self.values.contains(value)),
            Operator::NotIn => labels
                .get(&self.key)
                .map_or(true, |value| !self.values.contains(value)),
            Operator::Exists => labels.contains_key(&self.key),
            Operator::DoesNotExist => !labels.contains_key(&self.key),
            Operator::GreaterThan | Operator::LessThan => {
                let Some(label_value) = labels.get(&self.key) else {
                    return false;
                };
                let Ok(lhs) = label_value.parse::<i64>() else {
                    return false;
                };
                // Validated to hold exactly one integer value.
                let Some(rhs) = self
                    .values
                    .iter()
                    .next()
                    .and_then(|value| value.parse::<i64>().ok())
                else {
                    return false;
                };
                match self.operator {
                    Operator::GreaterThan => lhs > rhs,
                    _ => lhs < rhs,
                }
            }
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = || {
            self.values
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(",")
        };
        match self.operator {
            Operator::In => write!(f, "{} in ({})", self.key, joined()),
            Operator::NotIn => write!(f, "{} notin ({})", self.key, joined()),
            Operator::Exists => write!(f, "{}", self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
            Operator::GreaterThan => write!(f, "{}>{}", self.key, joined()),
            Operator::LessThan => write!(f, "{}<{}", self.key, joined()),
        }
    }
}

/// A label selector: either a conjunction of requirements or the
/// match-nothing sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Matches no label map at all, not even the empty one.
    Nothing,
    /// Matches label maps satisfying every requirement. The empty
    /// conjunction matches everything.
    Requirements(Vec<Requirement>),
}

impl Selector {
    /// The selector that matches every label map.
    pub fn everything() -> Self {
        Selector::Requirements(Vec::new())
    }

    /// The selector that matches no label map.
    pub fn nothing() -> Self {
        Selector::Nothing
    }

    /// A selector requiring every key of the map to equal its value.
    /// Keys are taken as-is without syntax validation.
    pub fn from_label_map(map: &BTreeMap<String, String>) -> Self {
        let requirements = map
            .iter()
            .map(|(key, value)| Requirement {
                key: key.clone(),
                operator: Operator::In,
                values: BTreeSet::from([value.clone()]),
            })
            .collect();
        Selector::Requirements(requirements)
    }

    /// Whether the given label map satisfies the selector.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Selector::Nothing => false,
            Selector::Requirements(requirements) => {
                requirements.iter().all(|requirement| requirement.matches(labels))
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Nothing => Ok(()),
            Selector::Requirements(requirements) => {
                let rendered = requirements
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "{}", rendered)
            }
        }
    }
}

/// Validate a label key: a name part with an optional DNS-subdomain
/// prefix, separated by a single '/'. Returns every rule violation.
pub fn validate_label_key(key: &str) -> Vec<String> {
    let mut violations = Vec::new();

    let (prefix, name) = match key.split_once('/') {
        Some((_, rest)) if rest.contains('/') => {
            return vec![
                "must consist of a name part and an optional prefix part separated by a single '/'"
                    .to_string(),
            ];
        }
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() {
            violations.push("prefix part must be non-empty".to_string());
        } else if prefix.len() > LABEL_KEY_PREFIX_MAX_LEN {
            violations.push(format!(
                "prefix part must be no more than {} characters",
                LABEL_KEY_PREFIX_MAX_LEN
            ));
        } else if !is_dns_subdomain(prefix) {
            violations.push(
                "prefix part must be a lowercase DNS subdomain (alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character)"
                    .to_string(),
            );
        }
    }

    if name.is_empty() {
        violations.push("name part must be non-empty".to_string());
    } else {
        if name.len() > LABEL_KEY_NAME_MAX_LEN {
            violations.push(format!(
                "name part must be no more than {} characters",
                LABEL_KEY_NAME_MAX_LEN
            ));
        }
        if !is_qualified_name_part(name) {
            violations.push(
                "name part must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character"
                    .to_string(),
            );
        }
    }

    violations
}

/// Name part of a label key: alphanumeric, '-', '_' or '.', with
/// alphanumeric at both ends. Callers guarantee non-empty input.
fn is_qualified_name_part(name: &str) -> bool {
    let chars: Vec<char> = name.chars().collect();

    if !chars[0].is_ascii_alphanumeric() || !chars[chars.len() - 1].is_ascii_alphanumeric() {
        return false;
    }

    chars
        .iter()
        .all(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
}

/// DNS-1123 subdomain: lowercase alphanumeric, '-' or '.', with
/// alphanumeric at both ends. Callers guarantee non-empty input.
fn is_dns_subdomain(prefix: &str) -> bool {
    let chars: Vec<char> = prefix.chars().collect();
    let alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();

    if !alnum(chars[0]) || !alnum(chars[chars.len() - 1]) {
        return false;
    }

    chars.iter().all(|c| alnum(*c) || *c == '-' || *c == '.')
}
