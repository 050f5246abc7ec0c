//! Dependency graph resolution.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`], so shared and
//! cyclic dependencies need no back-pointers. Arena order is depth-first
//! pre-order over declared dependency order, which is also the order used for
//! license warnings and artifact generation.

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::log::{LogSink, MessageCode};
use crate::models::{Language, NodeKey, PackageMetadata, PackageVersion};
use crate::repository::{PackageRepository, ResolvedPackage};
use crate::scanner::{AnalyzerInventory, AnalyzerScanner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
pub struct PackageNode {
    pub package: ResolvedPackage,
    pub inventory: AnalyzerInventory,
    pub dependencies: Vec<NodeId>,
}

impl PackageNode {
    pub fn metadata(&self) -> &PackageMetadata {
        &self.package.metadata
    }

    pub fn id(&self) -> &str {
        &self.package.metadata.id
    }

    pub fn version(&self) -> &PackageVersion {
        &self.package.metadata.version
    }

    pub fn license_required(&self) -> bool {
        self.package.metadata.require_license_acceptance
    }

    pub fn has_analyzers(&self) -> bool {
        self.inventory.has_analyzers()
    }
}

#[derive(Debug, Default)]
pub struct PackageGraph {
    nodes: Vec<PackageNode>,
}

impl PackageGraph {
    /// The package the run was started for. Always the first node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &PackageNode {
        &self.nodes[id.0]
    }

    /// Every node in graph order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }
}

/// Walks the repository from a root package, scanning each node once.
pub struct GraphResolver<'a> {
    repository: &'a dyn PackageRepository,
    scanner: &'a AnalyzerScanner<'a>,
    language: Language,
    log: &'a dyn LogSink,
}

#[derive(Default)]
struct Walk {
    graph: PackageGraph,
    by_key: HashMap<NodeKey, NodeId>,
    by_request: HashMap<(String, Option<PackageVersion>), NodeId>,
}

impl<'a> GraphResolver<'a> {
    pub fn new(
        repository: &'a dyn PackageRepository,
        scanner: &'a AnalyzerScanner<'a>,
        language: Language,
        log: &'a dyn LogSink,
    ) -> Self {
        Self {
            repository,
            scanner,
            language,
            log,
        }
    }

    /// Resolve the root package and, when `recurse` is set, everything it
    /// transitively depends on. Without `recurse` dependencies are never
    /// fetched.
    pub fn resolve(
        &self,
        id: &str,
        version: Option<&PackageVersion>,
        recurse: bool,
    ) -> Result<PackageGraph> {
        let mut walk = Walk::default();
        self.visit(&mut walk, id, version, recurse)?;
        Ok(walk.graph)
    }

    fn visit(
        &self,
        walk: &mut Walk,
        id: &str,
        version: Option<&PackageVersion>,
        recurse: bool,
    ) -> Result<NodeId> {
        let request = (id.to_ascii_lowercase(), version.cloned());
        if let Some(&existing) = walk.by_request.get(&request) {
            return Ok(existing);
        }

        let package = self.repository.resolve(id, version).with_context(|| match version {
            Some(v) => format!("could not resolve {} {}", id, v),
            None => format!("could not resolve {}", id),
        })?;
        let key = NodeKey::new(&package.metadata.id, &package.metadata.version);
        if let Some(&existing) = walk.by_key.get(&key) {
            walk.by_request.insert(request, existing);
            return Ok(existing);
        }

        self.log.info(
            MessageCode::PackageResolved,
            &format!("Resolved {} {}", package.metadata.id, package.metadata.version),
        );
        let inventory = self.scanner.scan(self.language, &package.assembly_paths());
        if inventory.has_analyzers() {
            self.log.info(
                MessageCode::AnalyzersFound,
                &format!(
                    "Found {} analyzer(s) in {}",
                    inventory.analyzers.len(),
                    package.metadata.id
                ),
            );
        }

        let declared = package.metadata.dependencies.clone();
        let node_id = NodeId(walk.graph.nodes.len());
        walk.graph.nodes.push(PackageNode {
            package,
            inventory,
            dependencies: Vec::new(),
        });
        walk.by_key.insert(key, node_id);
        walk.by_request.insert(request, node_id);

        if recurse {
            let mut children = Vec::with_capacity(declared.len());
            for dep in &declared {
                let child = self.visit(walk, &dep.id, dep.version.as_ref(), recurse)?;
                if !children.contains(&child) {
                    children.push(child);
                }
            }
            walk.graph.nodes[node_id.0].dependencies = children;
        }

        Ok(node_id)
    }
}
