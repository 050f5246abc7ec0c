//! Analyzer discovery inside package payloads.
//!
//! A payload is loaded into a closed [`ComponentTable`]; each exported type is
//! matched against the analyzer capability contract, and qualifying types are
//! instantiated through an [`AnalyzerFactory`]. One bad payload or one bad
//! type never aborts the scan.

pub mod component;

use std::path::PathBuf;

use serde::Serialize;

use crate::log::{LogSink, MessageCode};
use crate::models::{AnalyzerDescriptor, Language};

pub use component::{
    AnalyzerFactory, ComponentTable, ComponentTableLoader, ComponentType,
    DefaultConstructorFactory, PayloadLoader, Visibility,
};

/// Analyzers found in one package's own payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalyzerInventory {
    pub analyzers: Vec<AnalyzerDescriptor>,
}

impl AnalyzerInventory {
    pub fn has_analyzers(&self) -> bool {
        !self.analyzers.is_empty()
    }
}

pub struct AnalyzerScanner<'a> {
    loader: &'a dyn PayloadLoader,
    factory: &'a dyn AnalyzerFactory,
    log: &'a dyn LogSink,
}

impl<'a> AnalyzerScanner<'a> {
    pub fn new(
        loader: &'a dyn PayloadLoader,
        factory: &'a dyn AnalyzerFactory,
        log: &'a dyn LogSink,
    ) -> Self {
        Self {
            loader,
            factory,
            log,
        }
    }

    /// Discover every analyzer for `language` in the given payloads.
    pub fn scan(&self, language: Language, payloads: &[PathBuf]) -> AnalyzerInventory {
        let mut analyzers = Vec::new();

        for path in payloads {
            let table = match self.loader.load(path) {
                Ok(table) => table,
                Err(e) => {
                    self.log.warn(
                        MessageCode::PayloadLoadFailed,
                        &format!("Skipping {}: {:#}", path.display(), e),
                    );
                    continue;
                }
            };

            for component in table.types.iter().filter(|t| is_candidate(t, language)) {
                match self.factory.instantiate(path, &table.assembly, component) {
                    Ok(analyzer) => analyzers.push(analyzer),
                    Err(e) => self.log.warn(
                        MessageCode::AnalyzerInstantiationFailed,
                        &format!("Could not create analyzer {}: {:#}", component.name, e),
                    ),
                }
            }
        }

        AnalyzerInventory { analyzers }
    }
}

/// Public, concrete, implements the analyzer entry points, and is marked for `language`.
fn is_candidate(component: &ComponentType, language: Language) -> bool {
    component.visibility == Visibility::Public
        && !component.is_abstract
        && component.implements_analyzer_contract()
        && component.languages.as_ref().is_some_and(|langs| {
            langs.iter().any(|l| {
                l.eq_ignore_ascii_case(language.analyzer_name()) || l.eq_ignore_ascii_case(language.tag())
            })
        })
}
