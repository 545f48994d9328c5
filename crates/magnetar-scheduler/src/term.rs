use k8s_openapi::api::core::v1 as corev1;
use magnetar_core::fields::{FieldRequirement, FieldSelector};
use magnetar_core::labels::{Operator, Requirement, Selector};
use magnetar_core::{FieldError, FieldPath, Node};
use std::collections::BTreeMap;

/// The only structured node field addressable from a selector.
pub const NODE_FIELD_NAME: &str = "metadata.name";

const VALID_SELECTOR_OPERATORS: &[&str] =
    &["In", "NotIn", "Exists", "DoesNotExist", "Gt", "Lt"];
const VALID_FIELD_SELECTOR_OPERATORS: &[&str] = &["In", "NotIn"];

/// Convert label-oriented requirements into a label selector.
///
/// An empty requirement list yields the match-nothing selector;
/// callers that want "no constraint" must skip the conversion instead
/// of passing an empty list.
///
/// All validation defects across all requirements are collected and
/// returned together, attributed under `path`.
pub fn requirements_as_label_selector(
    requirements: &[corev1::NodeSelectorRequirement],
    path: &FieldPath,
) -> Result<Selector, Vec<FieldError>> {
    if requirements.is_empty() {
        return Ok(Selector::nothing());
    }

    let mut errors = Vec::new();
    let mut parsed = Vec::with_capacity(requirements.len());

    for (i, requirement) in requirements.iter().enumerate() {
        let p = path.index(i);
        let operator = match requirement.operator.as_str() {
            "In" => Operator::In,
            "NotIn" => Operator::NotIn,
            "Exists" => Operator::Exists,
            "DoesNotExist" => Operator::DoesNotExist,
            "Gt" => Operator::GreaterThan,
            "Lt" => Operator::LessThan,
            other => {
                errors.push(FieldError::not_supported(
                    &p.child("operator"),
                    other,
                    VALID_SELECTOR_OPERATORS,
                ));
                continue;
            }
        };
        let values = requirement.values.clone().unwrap_or_default();
        match Requirement::new(&requirement.key, operator, values, &p) {
            Ok(parsed_requirement) => parsed.push(parsed_requirement),
            Err(errs) => errors.extend(errs),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(Selector::Requirements(parsed))
}

/// Convert field-oriented requirements into a structured-field
/// selector. Only `metadata.name` is a recognized key, identity
/// fields hold exactly one value, and only `In`/`NotIn` apply.
///
/// An empty requirement list yields the match-nothing selector, like
/// [`requirements_as_label_selector`].
pub fn requirements_as_field_selector(
    requirements: &[corev1::NodeSelectorRequirement],
    path: &FieldPath,
) -> Result<FieldSelector, Vec<FieldError>> {
    if requirements.is_empty() {
        return Ok(FieldSelector::nothing());
    }

    let mut errors = Vec::new();
    let mut parsed = Vec::with_capacity(requirements.len());

    for (i, requirement) in requirements.iter().enumerate() {
        let p = path.index(i);

        if requirement.key != NODE_FIELD_NAME {
            errors.push(FieldError::invalid(
                &p.child("key"),
                format!("not a valid field selector key: {:?}", requirement.key),
            ));
            continue;
        }

        let values = requirement.values.as_deref().unwrap_or_default();
        match requirement.operator.as_str() {
            "In" => {
                if values.len() != 1 {
                    errors.push(FieldError::invalid(&p.child("values"), "must have one element"));
                } else {
                    parsed.push(FieldRequirement::equals(NODE_FIELD_NAME, &values[0]));
                }
            }
            "NotIn" => {
                if values.len() != 1 {
                    errors.push(FieldError::invalid(&p.child("values"), "must have one element"));
                } else {
                    parsed.push(FieldRequirement::not_equals(NODE_FIELD_NAME, &values[0]));
                }
            }
            other => {
                errors.push(FieldError::not_supported(
                    &p.child("operator"),
                    other,
                    VALID_FIELD_SELECTOR_OPERATORS,
                ));
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(FieldSelector::Requirements(parsed))
}

/// A conjunctive selector unit: an optional label predicate and an
/// optional structured-field predicate. A predicate is only present
/// when the corresponding requirement list was non-empty; an absent
/// predicate imposes no constraint.
#[derive(Debug, Clone)]
pub(crate) struct SelectorTerm {
    label_exprs: Option<Selector>,
    field_exprs: Option<FieldSelector>,
}

impl SelectorTerm {
    /// Build both predicates of the term. Both branches are converted
    /// even when the first fails, so the caller sees every defect in
    /// one pass.
    pub(crate) fn new(
        term: &corev1::NodeSelectorTerm,
        path: &FieldPath,
    ) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut label_exprs = None;
        let mut field_exprs = None;

        if let Some(exprs) = non_empty(term.match_expressions.as_deref()) {
            match requirements_as_label_selector(exprs, &path.child("matchExpressions")) {
                Ok(selector) => label_exprs = Some(selector),
                Err(errs) => errors.extend(errs),
            }
        }
        if let Some(exprs) = non_empty(term.match_fields.as_deref()) {
            match requirements_as_field_selector(exprs, &path.child("matchFields")) {
                Ok(selector) => field_exprs = Some(selector),
                Err(errs) => errors.extend(errs),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self { label_exprs, field_exprs })
    }

    /// AND of the present predicates over the node's labels and
    /// structured fields.
    pub(crate) fn matches(
        &self,
        labels: &BTreeMap<String, String>,
        fields: &BTreeMap<String, String>,
    ) -> bool {
        if let Some(selector) = &self.label_exprs {
            if !selector.matches(labels) {
                return false;
            }
        }
        if let Some(selector) = &self.field_exprs {
            if !selector.matches(fields) {
                return false;
            }
        }
        true
    }
}

/// A term with neither expressions nor fields selects nothing;
/// callers skip it instead of building it.
pub(crate) fn is_empty_term(term: &corev1::NodeSelectorTerm) -> bool {
    term.match_expressions.as_ref().map_or(true, |exprs| exprs.is_empty())
        && term.match_fields.as_ref().map_or(true, |exprs| exprs.is_empty())
}

fn non_empty(
    requirements: Option<&[corev1::NodeSelectorRequirement]>,
) -> Option<&[corev1::NodeSelectorRequirement]> {
    requirements.filter(|reqs| !reqs.is_empty())
}

/// The structured fields a selector can address, extracted from a
/// node.
pub(crate) fn node_fields(node: &Node) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    if let Some(name) = node.metadata.name.as_deref() {
        if !name.is_empty() {
            fields.insert(NODE_FIELD_NAME.to_string(), name.to_string());
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use magnetar_core::ErrorKind;

    fn requirement(key: &str, operator: &str, values: &[&str]) -> corev1::NodeSelectorRequirement {
        corev1::NodeSelectorRequirement {
            key: key.to_string(),
            operator: operator.to_string(),
            values: Some(values.iter().map(ToString::to_string).collect()),
        }
    }

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_requirements_match_nothing() {
        let selector = requirements_as_label_selector(&[], &FieldPath::new("root")).unwrap();
        assert_eq!(selector, Selector::nothing());
        assert!(!selector.matches(&labels(&[])));
        assert!(!selector.matches(&labels(&[("a", "b")])));

        let selector = requirements_as_field_selector(&[], &FieldPath::new("root")).unwrap();
        assert_eq!(selector, FieldSelector::nothing());
        assert!(!selector.matches(&labels(&[])));
    }

    #[test]
    fn test_label_selector_textual_equivalence() {
        let selector = requirements_as_label_selector(
            &[requirement("foo", "In", &["bar", "baz"])],
            &FieldPath::new("root"),
        )
        .unwrap();
        assert_eq!(selector.to_string(), "foo in (bar,baz)");

        let selector = requirements_as_label_selector(
            &[requirement("foo", "Gt", &["1"])],
            &FieldPath::new("root"),
        )
        .unwrap();
        assert_eq!(selector.to_string(), "foo>1");

        let selector = requirements_as_label_selector(
            &[requirement("bar", "Lt", &["7"])],
            &FieldPath::new("root"),
        )
        .unwrap();
        assert_eq!(selector.to_string(), "bar<7");
    }

    #[test]
    fn test_label_selector_exists_rejects_values() {
        let errs = requirements_as_label_selector(
            &[requirement("foo", "Exists", &["bar", "baz"])],
            &FieldPath::new("root"),
        )
        .unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path.to_string(), "root[0]");
        assert_eq!(errs[0].detail, "values set must be empty for exists and does not exist");
    }

    #[test]
    fn test_label_selector_unknown_operator() {
        let errs = requirements_as_label_selector(
            &[requirement("foo", "Equals", &["bar"])],
            &FieldPath::new("root"),
        )
        .unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path.to_string(), "root[0].operator");
        assert_eq!(errs[0].kind, ErrorKind::NotSupported);
    }

    #[test]
    fn test_label_selector_collects_all_errors() {
        let errs = requirements_as_label_selector(
            &[
                requirement("invalid key", "In", &["x"]),
                requirement("foo", "Gt", &["one"]),
            ],
            &FieldPath::new("root"),
        )
        .unwrap_err();
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].path.to_string(), "root[0]");
        assert_eq!(errs[1].path.to_string(), "root[1]");
    }

    #[test]
    fn test_field_selector_requires_single_value() {
        let errs = requirements_as_field_selector(
            &[requirement("metadata.name", "In", &["host-1", "host-2"])],
            &FieldPath::new("root"),
        )
        .unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path.to_string(), "root[0].values");
        assert_eq!(errs[0].detail, "must have one element");
    }

    #[test]
    fn test_field_selector_rejects_unknown_key() {
        let errs = requirements_as_field_selector(
            &[requirement("metadata.namespace", "In", &["default"])],
            &FieldPath::new("root"),
        )
        .unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path.to_string(), "root[0].key");
        assert!(errs[0].detail.contains("not a valid field selector key"));
    }

    #[test]
    fn test_field_selector_rejects_unsupported_operator() {
        let errs = requirements_as_field_selector(
            &[requirement("metadata.name", "Exists", &["host-1"])],
            &FieldPath::new("root"),
        )
        .unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path.to_string(), "root[0].operator");
        assert_eq!(errs[0].kind, ErrorKind::NotSupported);
    }

    #[test]
    fn test_field_selector_not_in() {
        let selector = requirements_as_field_selector(
            &[requirement("metadata.name", "NotIn", &["host-1"])],
            &FieldPath::new("root"),
        )
        .unwrap();
        assert!(!selector.matches(&labels(&[("metadata.name", "host-1")])));
        assert!(selector.matches(&labels(&[("metadata.name", "host-2")])));
    }

    #[test]
    fn test_term_reports_defects_from_both_branches() {
        let term = corev1::NodeSelectorTerm {
            match_expressions: Some(vec![requirement("invalid key", "In", &["x"])]),
            match_fields: Some(vec![requirement("metadata.name", "In", &["h1", "h2"])]),
        };
        let errs = SelectorTerm::new(&term, &FieldPath::new("terms").index(0)).unwrap_err();
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].path.to_string(), "terms[0].matchExpressions[0]");
        assert_eq!(errs[1].path.to_string(), "terms[0].matchFields[0].values");
    }

    #[test]
    fn test_term_and_semantics() {
        let term = corev1::NodeSelectorTerm {
            match_expressions: Some(vec![requirement("env", "In", &["prod"])]),
            match_fields: Some(vec![requirement("metadata.name", "In", &["host-1"])]),
        };
        let term = SelectorTerm::new(&term, &FieldPath::root()).unwrap();

        let node_fields = labels(&[("metadata.name", "host-1")]);
        assert!(term.matches(&labels(&[("env", "prod")]), &node_fields));
        assert!(!term.matches(&labels(&[("env", "dev")]), &node_fields));
        assert!(!term.matches(&labels(&[("env", "prod")]), &labels(&[("metadata.name", "host-2")])));
    }

    #[test]
    fn test_term_absent_predicate_is_vacuous() {
        let term = corev1::NodeSelectorTerm {
            match_expressions: Some(vec![requirement("env", "In", &["prod"])]),
            match_fields: None,
        };
        let term = SelectorTerm::new(&term, &FieldPath::root()).unwrap();
        // No field constraint: any field map passes.
        assert!(term.matches(&labels(&[("env", "prod")]), &labels(&[])));
    }

    #[test]
    fn test_is_empty_term() {
        assert!(is_empty_term(&corev1::NodeSelectorTerm::default()));
        assert!(is_empty_term(&corev1::NodeSelectorTerm {
            match_expressions: Some(vec![]),
            match_fields: Some(vec![]),
        }));
        assert!(!is_empty_term(&corev1::NodeSelectorTerm {
            match_expressions: Some(vec![requirement("env", "Exists", &[])]),
            match_fields: None,
        }));
    }

    #[test]
    fn test_node_fields() {
        let mut node = Node::default();
        assert!(node_fields(&node).is_empty());

        node.metadata.name = Some("host-1".to_string());
        let fields = node_fields(&node);
        assert_eq!(fields.get(NODE_FIELD_NAME).map(String::as_str), Some("host-1"));
    }
}
