//! Run orchestration.
//!
//! A run goes through: toolchain pre-flight, rules file validation, graph
//! resolution and scanning, the analyzer success gate, the license gate, and
//! finally per-node assembly. Every failure ends up in the log; the only other
//! signal is [`GenerationOutcome::success`].

use serde::Serialize;

use crate::config::RunConfig;
use crate::graph::{GraphResolver, NodeId, PackageGraph};
use crate::license::gate::{candidate_set, evaluate};
use crate::log::{LogSink, MessageCode};
use crate::models::PluginArtifact;
use crate::plugin::rules::load_rule_file;
use crate::plugin::{ArtifactAssembler, ArtifactRequest, RuleOverride};
use crate::repository::PackageRepository;
use crate::scanner::{AnalyzerFactory, AnalyzerScanner, PayloadLoader};
use crate::toolchain::Toolchain;

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationOutcome {
    pub success: bool,
    pub artifacts: Vec<PluginArtifact>,
}

impl GenerationOutcome {
    fn failed() -> Self {
        Self::default()
    }
}

pub struct PluginGenerator<'a> {
    repository: &'a dyn PackageRepository,
    loader: &'a dyn PayloadLoader,
    factory: &'a dyn AnalyzerFactory,
    toolchain: &'a dyn Toolchain,
    log: &'a dyn LogSink,
}

impl<'a> PluginGenerator<'a> {
    pub fn new(
        repository: &'a dyn PackageRepository,
        loader: &'a dyn PayloadLoader,
        factory: &'a dyn AnalyzerFactory,
        toolchain: &'a dyn Toolchain,
        log: &'a dyn LogSink,
    ) -> Self {
        Self {
            repository,
            loader,
            factory,
            toolchain,
            log,
        }
    }

    pub fn run(&self, config: &RunConfig) -> GenerationOutcome {
        if !self.toolchain.is_available() {
            self.log.error(
                MessageCode::ToolchainUnavailable,
                &format!(
                    "The {} toolchain is not available; cannot build plugins",
                    self.toolchain.name()
                ),
            );
            return GenerationOutcome::failed();
        }

        let rule_override = match &config.rule_file {
            Some(path) => match load_rule_file(path) {
                Ok(rules) => Some(RuleOverride {
                    path: path.clone(),
                    rules,
                }),
                Err(e) => {
                    self.log.error(MessageCode::InvalidRuleFile, &e.to_string());
                    return GenerationOutcome::failed();
                }
            },
            None => None,
        };

        let scanner = AnalyzerScanner::new(self.loader, self.factory, self.log);
        let resolver = GraphResolver::new(self.repository, &scanner, config.language, self.log);
        let graph = match resolver.resolve(&config.package_id, config.version.as_ref(), config.recurse) {
            Ok(graph) => graph,
            Err(e) => {
                self.log
                    .error(MessageCode::PackageResolutionFailed, &format!("{:#}", e));
                return GenerationOutcome::failed();
            }
        };

        let candidates = candidate_set(&graph, config.recurse);
        if !self.check_analyzers(&graph, &candidates, config.recurse) {
            return GenerationOutcome::failed();
        }
        if !self.check_licenses(&graph, &candidates, config.accept_licenses) {
            return GenerationOutcome::failed();
        }

        if config.recurse && rule_override.is_none() {
            self.log.warn(
                MessageCode::RuleCustomizationUnavailable,
                "Rule customization is not available when generating plugins for dependencies; \
                 each plugin gets a generated rule template",
            );
        }

        self.assemble_all(&graph, &candidates, config, rule_override.as_ref())
    }

    /// Success gate: at least one in-scope node has analyzers.
    fn check_analyzers(&self, graph: &PackageGraph, candidates: &[NodeId], recurse: bool) -> bool {
        let root = graph.node(graph.root());
        if !root.has_analyzers() {
            self.log.warn(
                MessageCode::NoAnalyzersFound,
                &format!("No analyzers were found in package {}", root.id()),
            );
            if !recurse {
                self.log.warn(
                    MessageCode::NoAnalyzersSuggestRecurse,
                    "Its dependencies may contain analyzers; run with --recurse to search them",
                );
            }
        }
        candidates.iter().any(|&id| graph.node(id).has_analyzers())
    }

    /// License gate; returns false when generation is blocked.
    fn check_licenses(&self, graph: &PackageGraph, candidates: &[NodeId], accept: bool) -> bool {
        let verdict = evaluate(graph, candidates, accept);
        if !verdict.requires_acceptance() {
            return true;
        }

        let root = graph.node(graph.root());
        if verdict.blocked {
            self.log.error(
                MessageCode::LicenseAcceptanceRequired,
                &format!(
                    "Package {} {} or one of its dependencies requires license acceptance; \
                     review the licenses and run again with --accept-licenses",
                    root.id(),
                    root.version()
                ),
            );
        } else {
            self.log.warn(
                MessageCode::LicensesAccepted,
                "The licenses of the following packages were accepted",
            );
        }

        for &id in &verdict.licensed {
            let node = graph.node(id);
            let license = node.metadata().license_display().unwrap_or("no license information");
            self.log.warn(
                MessageCode::PackageRequiresLicense,
                &format!(
                    "Package {} {} requires license acceptance: {}",
                    node.id(),
                    node.version(),
                    license
                ),
            );
        }

        !verdict.blocked
    }

    fn assemble_all(
        &self,
        graph: &PackageGraph,
        candidates: &[NodeId],
        config: &RunConfig,
        rule_override: Option<&RuleOverride>,
    ) -> GenerationOutcome {
        let assembler =
            ArtifactAssembler::new(self.toolchain, &config.output_dir, config.language, self.log);
        let mut outcome = GenerationOutcome {
            success: true,
            artifacts: Vec::new(),
        };

        for &id in candidates {
            let node = graph.node(id);
            if !node.has_analyzers() {
                continue;
            }
            let is_root = id == graph.root();
            let built = ArtifactRequest::new(node, is_root, rule_override.filter(|_| is_root))
                .map_err(anyhow::Error::from)
                .and_then(|request| assembler.assemble(&request));
            match built {
                Ok(artifact) => outcome.artifacts.push(artifact),
                Err(e) => {
                    self.log.error(
                        MessageCode::PluginGenerationFailed,
                        &format!(
                            "Failed to generate a plugin for {} {}: {:#}",
                            node.id(),
                            node.version(),
                            e
                        ),
                    );
                    outcome.success = false;
                }
            }
        }

        outcome
    }
}
