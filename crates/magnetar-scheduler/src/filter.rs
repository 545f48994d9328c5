use crate::error::{Result, ValidationErrors};
use crate::term::{is_empty_term, node_fields, SelectorTerm};
use k8s_openapi::api::core::v1 as corev1;
use magnetar_core::labels::Selector;
use magnetar_core::{FieldPath, Node, Pod};
use std::collections::BTreeMap;
use tracing::debug;

/// A validated required node selector: an ordered list of terms with
/// OR semantics. Immutable once built; queries cannot fail.
#[derive(Debug, Clone)]
pub struct NodeSelector {
    terms: Vec<SelectorTerm>,
}

impl NodeSelector {
    /// Validate and compile a node selector, reporting every defect
    /// across all terms.
    pub fn new(node_selector: &corev1::NodeSelector) -> Result<Self> {
        Self::new_at(node_selector, &FieldPath::root())
    }

    /// Like [`NodeSelector::new`], attributing errors below `path`.
    pub fn new_at(node_selector: &corev1::NodeSelector, path: &FieldPath) -> Result<Self> {
        let terms_path = path.child("nodeSelectorTerms");
        let mut errors = Vec::new();
        let mut terms = Vec::with_capacity(node_selector.node_selector_terms.len());

        for (i, term) in node_selector.node_selector_terms.iter().enumerate() {
            // An empty term selects no nodes and can never match.
            if is_empty_term(term) {
                continue;
            }
            match SelectorTerm::new(term, &terms_path.index(i)) {
                Ok(parsed) => terms.push(parsed),
                Err(errs) => errors.extend(errs),
            }
        }

        if !errors.is_empty() {
            return Err(ValidationErrors::new(errors));
        }
        Ok(Self { terms })
    }

    /// Whether the node satisfies at least one selector term. A
    /// missing node never matches.
    pub fn matches(&self, node: Option<&Node>) -> bool {
        let Some(node) = node else {
            return false;
        };
        let no_labels = BTreeMap::new();
        let labels = node.metadata.labels.as_ref().unwrap_or(&no_labels);
        let fields = node_fields(node);
        self.terms.iter().any(|term| term.matches(labels, &fields))
    }
}

/// The combined required placement constraints of a pod: its plain
/// `nodeSelector` label map and the required node affinity from its
/// affinity stanza. Both must hold for a node to be eligible.
#[derive(Debug, Clone, Default)]
pub struct RequiredNodeAffinity {
    label_selector: Option<Selector>,
    node_selector: Option<NodeSelector>,
}

impl RequiredNodeAffinity {
    /// Parse the pod's required node placement constraints. A pod
    /// without a spec, or without either constraint, matches any node.
    pub fn from_pod(pod: &Pod) -> Result<Self> {
        let Some(spec) = pod.spec.as_ref() else {
            return Ok(Self::default());
        };

        let label_selector = spec
            .node_selector
            .as_ref()
            .filter(|map| !map.is_empty())
            .map(Selector::from_label_map);

        let required = spec
            .affinity
            .as_ref()
            .and_then(|affinity| affinity.node_affinity.as_ref())
            .and_then(|node_affinity| {
                node_affinity
                    .required_during_scheduling_ignored_during_execution
                    .as_ref()
            });
        let node_selector = match required {
            Some(selector) => Some(NodeSelector::new_at(
                selector,
                &FieldPath::new("spec")
                    .child("affinity")
                    .child("nodeAffinity")
                    .child("requiredDuringSchedulingIgnoredDuringExecution"),
            )?),
            None => None,
        };

        Ok(Self {
            label_selector,
            node_selector,
        })
    }

    /// Whether the node satisfies both the label map and the affinity
    /// selector. A missing node never matches.
    pub fn matches(&self, node: Option<&Node>) -> bool {
        let Some(node) = node else {
            return false;
        };

        if let Some(selector) = &self.label_selector {
            let no_labels = BTreeMap::new();
            let labels = node.metadata.labels.as_ref().unwrap_or(&no_labels);
            if !selector.matches(labels) {
                debug!(
                    "Node {} rejected by nodeSelector labels",
                    node.metadata.name.as_deref().unwrap_or("unknown")
                );
                return false;
            }
        }

        match &self.node_selector {
            Some(selector) => selector.matches(Some(node)),
            None => true,
        }
    }
}
