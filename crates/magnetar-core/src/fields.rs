use std::collections::BTreeMap;
use std::fmt;

/// Operators supported for structured-field requirements. Identity
/// fields are single-valued, so only equality and inequality apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOperator {
    Equals,
    NotEquals,
}

/// A single structured-field constraint: one field key compared
/// against one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRequirement {
    key: String,
    operator: FieldOperator,
    value: String,
}

impl FieldRequirement {
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: FieldOperator::Equals,
            value: value.into(),
        }
    }

    pub fn not_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: FieldOperator::NotEquals,
            value: value.into(),
        }
    }

    /// Whether the given field map satisfies this requirement. An
    /// absent field reads as the empty string.
    pub fn matches(&self, fields: &BTreeMap<String, String>) -> bool {
        let actual = fields.get(&self.key).map(String::as_str).unwrap_or("");
        match self.operator {
            FieldOperator::Equals => actual == self.value,
            FieldOperator::NotEquals => actual != self.value,
        }
    }
}

impl fmt::Display for FieldRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            FieldOperator::Equals => write!(f, "{}={}", self.key, self.value),
            FieldOperator::NotEquals => write!(f, "{}!={}", self.key, self.value),
        }
    }
}

/// A predicate over a structured-field map: either a conjunction of
/// requirements or the match-nothing sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelector {
    /// Matches no field map at all.
    Nothing,
    /// Matches field maps satisfying every requirement.
    Requirements(Vec<FieldRequirement>),
}

impl FieldSelector {
    /// The selector that matches no field map.
    pub fn nothing() -> Self {
        FieldSelector::Nothing
    }

    /// Whether the given field map satisfies the selector.
    pub fn matches(&self, fields: &BTreeMap<String, String>) -> bool {
        match self {
            FieldSelector::Nothing => false,
            FieldSelector::Requirements(requirements) => {
                requirements.iter().all(|requirement| requirement.matches(fields))
            }
        }
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSelector::Nothing => Ok(()),
            FieldSelector::Requirements(requirements) => {
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
