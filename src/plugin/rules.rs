use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use quick_xml::events::Event;
use quick_xml::se::Serializer;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::error::RuleFileError;
use crate::models::{AnalyzerDescriptor, DiagnosticSeverity};

pub const SEVERITIES: [&str; 5] = ["INFO", "MINOR", "MAJOR", "CRITICAL", "BLOCKER"];

/// A rules definition document: `<rules><rule>…</rule>…</rules>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rules {
    #[serde(rename = "rule", default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "internalKey", default, skip_serializing_if = "Option::is_none")]
    pub internal_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,
    #[serde(rename = "tag", default)]
    pub tags: Vec<String>,
}

impl Rules {
    /// Build a rule template from the diagnostics the analyzers support.
    ///
    /// One rule per diagnostic id, sorted by key; the first analyzer declaring
    /// an id wins.
    pub fn from_analyzers(analyzers: &[AnalyzerDescriptor]) -> Self {
        let mut seen = HashSet::new();
        let mut rules: Vec<Rule> = analyzers
            .iter()
            .flat_map(|a| a.diagnostics.iter())
            .filter(|d| seen.insert(d.id.clone()))
            .map(|d| {
                let name = if d.title.trim().is_empty() {
                    d.id.clone()
                } else {
                    d.title.clone()
                };
                let description = if d.description.trim().is_empty() {
                    name.clone()
                } else {
                    d.description.clone()
                };
                let mut tags = Vec::new();
                if !d.category.trim().is_empty() {
                    tags.push(tag_from_category(&d.category));
                }
                Rule {
                    key: d.id.clone(),
                    name,
                    internal_key: Some(d.id.clone()),
                    description: Some(description),
                    severity: Some(severity_for(d.severity).to_string()),
                    cardinality: Some("SINGLE".to_string()),
                    status: Some("READY".to_string()),
                    rule_type: Some("CODE_SMELL".to_string()),
                    tags,
                }
            })
            .collect();
        rules.sort_by(|a, b| a.key.cmp(&b.key));
        Rules { rules }
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut body = String::new();
        let mut ser = Serializer::with_root(&mut body, Some("rules"))?;
        ser.indent(' ', 2);
        self.serialize(ser)?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{}\n", body))
    }

    /// Check the document against the rules schema.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut keys = HashSet::new();
        for (index, rule) in self.rules.iter().enumerate() {
            let position = index + 1;
            if rule.key.trim().is_empty() {
                return Err(format!("rule #{} has no key", position));
            }
            if rule.name.trim().is_empty() {
                return Err(format!("rule '{}' has no name", rule.key));
            }
            if !keys.insert(rule.key.as_str()) {
                return Err(format!("duplicate rule key '{}'", rule.key));
            }
            if let Some(severity) = &rule.severity {
                if !SEVERITIES.contains(&severity.trim()) {
                    return Err(format!(
                        "rule '{}' has unknown severity '{}'",
                        rule.key, severity
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Read, parse and validate a user-supplied rules file.
pub fn load_rule_file(path: &Path) -> std::result::Result<Rules, RuleFileError> {
    let xml = std::fs::read_to_string(path).map_err(|source| RuleFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let malformed = |reason: String| RuleFileError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    check_document(&xml).map_err(malformed)?;
    let rules: Rules = quick_xml::de::from_str(&xml).map_err(|e| malformed(e.to_string()))?;
    rules.validate().map_err(|reason| RuleFileError::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(rules)
}

/// Well-formedness and root element check.
fn check_document(xml: &str) -> std::result::Result<(), String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut root: Option<String> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if depth == 0 {
                    if root.is_some() {
                        return Err("more than one root element".to_string());
                    }
                    root = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
                depth += 1;
            }
            Ok(Event::Empty(ref e)) => {
                if depth == 0 {
                    if root.is_some() {
                        return Err("more than one root element".to_string());
                    }
                    root = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Text(_)) if depth == 0 => {
                return Err("text outside the root element".to_string());
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!("position {}: {}", reader.buffer_position(), e));
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err("unexpected end of document".to_string());
    }
    match root.as_deref() {
        Some("rules") => Ok(()),
        Some(other) => Err(format!("root element is <{}>, expected <rules>", other)),
        None => Err("document has no root element".to_string()),
    }
}

fn severity_for(severity: DiagnosticSeverity) -> &'static str {
    match severity {
        DiagnosticSeverity::Error => "CRITICAL",
        DiagnosticSeverity::Warning => "MAJOR",
        DiagnosticSeverity::Info => "MINOR",
        DiagnosticSeverity::Hidden => "INFO",
    }
}

/// Rule tags are lower-case words joined by dashes.
fn tag_from_category(category: &str) -> String {
    category
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
