use crate::graph::{NodeId, PackageGraph};

/// Outcome of the license check for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseVerdict {
    /// In-scope nodes whose license must be accepted, in graph order.
    pub licensed: Vec<NodeId>,
    /// Licensed nodes exist and the licenses were not accepted.
    pub blocked: bool,
}

impl LicenseVerdict {
    pub fn requires_acceptance(&self) -> bool {
        !self.licensed.is_empty()
    }
}

/// The nodes subject to the license check: the root alone, or the whole graph when recursing.
pub fn candidate_set(graph: &PackageGraph, recurse: bool) -> Vec<NodeId> {
    if recurse {
        graph.ids().collect()
    } else {
        vec![graph.root()]
    }
}

/// Evaluate the license gate over `candidates`.
///
/// A node counts whether or not it has analyzers of its own.
pub fn evaluate(graph: &PackageGraph, candidates: &[NodeId], accept_licenses: bool) -> LicenseVerdict {
    let licensed: Vec<NodeId> = candidates
        .iter()
        .copied()
        .filter(|&id| graph.node(id).license_required())
        .collect();
    let blocked = !licensed.is_empty() && !accept_licenses;

    LicenseVerdict {
        licensed,
        blocked,
    }
}
