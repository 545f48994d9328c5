use crate::error::{Result, ValidationErrors};
use crate::term::{is_empty_term, node_fields, SelectorTerm};
use k8s_openapi::api::core::v1 as corev1;
use magnetar_core::{FieldPath, Node};
use std::collections::BTreeMap;
use tracing::debug;

/// Validated preferred scheduling terms. Each matching term adds its
/// weight to a node's score.
#[derive(Debug, Clone)]
pub struct PreferredSchedulingTerms {
    terms: Vec<WeightedTerm>,
}

#[derive(Debug, Clone)]
struct WeightedTerm {
    weight: i64,
    term: SelectorTerm,
}

impl PreferredSchedulingTerms {
    /// Validate and compile preferred scheduling terms, reporting
    /// every defect across all retained entries.
    ///
    /// An entry with weight 0 can never change a score and is dropped
    /// without being parsed or validated, so an inert malformed entry
    /// does not block the rest.
    pub fn new(terms: &[corev1::PreferredSchedulingTerm]) -> Result<Self> {
        Self::new_at(terms, &FieldPath::root())
    }

    /// Like [`PreferredSchedulingTerms::new`], attributing errors
    /// below `path`.
    pub fn new_at(terms: &[corev1::PreferredSchedulingTerm], path: &FieldPath) -> Result<Self> {
        let mut errors = Vec::new();
        let mut parsed = Vec::with_capacity(terms.len());

        for (i, term) in terms.iter().enumerate() {
            if term.weight == 0 || is_empty_term(&term.preference) {
                continue;
            }
            match SelectorTerm::new(&term.preference, &path.index(i)) {
                Ok(selector_term) => parsed.push(WeightedTerm {
                    weight: i64::from(term.weight),
                    term: selector_term,
                }),
                Err(errs) => errors.extend(errs),
            }
        }

        if !errors.is_empty() {
            return Err(ValidationErrors::new(errors));
        }
        Ok(Self { terms: parsed })
    }

    /// Sum of the weights of the terms the node matches. A missing
    /// node scores 0.
    pub fn score(&self, node: Option<&Node>) -> i64 {
        let Some(node) = node else {
            return 0;
        };
        let no_labels = BTreeMap::new();
        let labels = node.metadata.labels.as_ref().unwrap_or(&no_labels);
        let fields = node_fields(node);

        let score = self
            .terms
            .iter()
            .filter(|weighted| weighted.term.matches(labels, &fields))
            .map(|weighted| weighted.weight)
            .sum();

        debug!(
            "Node {} preferred-terms score: {}",
            node.metadata.name.as_deref().unwrap_or("unknown"),
            score
        );
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::NODE_FIELD_NAME;

    fn requirement(key: &str, operator: &str, values: &[&str]) -> corev1::NodeSelectorRequirement {
        corev1::NodeSelectorRequirement {
            key: key.to_string(),
            operator: operator.to_string(),
            values: Some(values.iter().map(ToString::to_string).collect()),
        }
    }

    fn create_test_node(name: &str, labels: &[(&str, &str)]) -> Node {
        let mut node = Node::default();
        node.metadata.name = Some(name.to_string());
        if !labels.is_empty() {
            node.metadata.labels = Some(
                labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            );
        }
        node
    }

    fn weighted_name_term(weight: i32, names: &[&str]) -> corev1::PreferredSchedulingTerm {
        corev1::PreferredSchedulingTerm {
            weight,
            preference: corev1::NodeSelectorTerm {
                match_fields: Some(vec![requirement(NODE_FIELD_NAME, "In", names)]),
                ..Default::default()
            },
        }
    }

    fn weighted_label_term(weight: i32, key: &str, value: &str) -> corev1::PreferredSchedulingTerm {
        corev1::PreferredSchedulingTerm {
            weight,
            preference: corev1::NodeSelectorTerm {
                match_expressions: Some(vec![requirement(key, "In", &[value])]),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_construction_reports_all_defects() {
        let terms = vec![
            weighted_name_term(1, &["host-1", "host-2"]),
            corev1::PreferredSchedulingTerm {
                weight: 1,
                preference: corev1::NodeSelectorTerm {
                    match_expressions: Some(vec![requirement("label-1", "In", &["value-1"])]),
                    match_fields: Some(vec![requirement(NODE_FIELD_NAME, "In", &["host-1"])]),
                },
            },
            weighted_label_term(1, "invalid key", "value"),
        ];

        let errs = PreferredSchedulingTerms::new(&terms).unwrap_err();
        assert_eq!(errs.errors().len(), 2);
        assert_eq!(errs.errors()[0].path.to_string(), "[0].matchFields[0].values");
        assert_eq!(errs.errors()[0].detail, "must have one element");
        assert_eq!(errs.errors()[1].path.to_string(), "[2].matchExpressions[0]");
        assert!(errs.errors()[1].detail.starts_with("invalid label key \"invalid key\""));
    }

    #[test]
    fn test_zero_weight_suppresses_validation() {
        // The malformed term is inert, so it is never validated.
        let terms = vec![weighted_name_term(0, &["host-1", "host-2"])];
        let scorer = PreferredSchedulingTerms::new(&terms).unwrap();
        assert_eq!(scorer.score(Some(&create_test_node("host-1", &[]))), 0);
    }

    #[test]
    fn test_score_sums_matching_weights() {
        let terms = vec![
            weighted_name_term(5, &["host-1"]),
            weighted_label_term(7, "unknown-label", "unknown-value"),
            weighted_label_term(11, "label-1", "value-1"),
        ];
        let scorer = PreferredSchedulingTerms::new(&terms).unwrap();

        let node = create_test_node("host-1", &[("label-1", "value-1")]);
        assert_eq!(scorer.score(Some(&node)), 16);

        let node = create_test_node("host-2", &[]);
        assert_eq!(scorer.score(Some(&node)), 0);
    }

    #[test]
    fn test_missing_node_scores_zero() {
        let terms = vec![weighted_name_term(5, &["host-1"])];
        let scorer = PreferredSchedulingTerms::new(&terms).unwrap();
        assert_eq!(scorer.score(None), 0);
    }

    #[test]
    fn test_empty_preference_terms_are_skipped() {
        let terms = vec![corev1::PreferredSchedulingTerm {
            weight: 9,
            preference: corev1::NodeSelectorTerm::default(),
        }];
        let scorer = PreferredSchedulingTerms::new(&terms).unwrap();
        assert_eq!(scorer.score(Some(&create_test_node("host-1", &[]))), 0);
    }
}
