//! Shared fixtures for unit tests: package feeds on disk, graph builders and
//! toolchain fakes.

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::graph::{GraphResolver, PackageGraph};
use crate::log::MemorySink;
use crate::models::{Language, PackageMetadata, PackageVersion};
use crate::repository::local::LocalFeed;
use crate::repository::{PackageRepository, ResolvedPackage};
use crate::scanner::{AnalyzerScanner, ComponentTableLoader, DefaultConstructorFactory};
use crate::toolchain::Toolchain;

pub fn metadata(id: &str, version: &str) -> PackageMetadata {
    PackageMetadata {
        id: id.to_string(),
        version: PackageVersion::parse(version).unwrap(),
        title: None,
        authors: "Test Author".to_string(),
        owners: None,
        description: "Test package".to_string(),
        project_url: None,
        license_url: None,
        license_names: None,
        require_license_acceptance: false,
        dependencies: vec![],
    }
}

/// Write `content` to `dir/name`, creating `dir` as needed.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Component table with one C#/VB analyzer type `<assembly>.Analyzer`.
pub fn analyzer_table(assembly: &str, language: &str) -> String {
    let diagnostic: String = assembly
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();
    format!(
        r#"assembly = "{assembly}"

[[types]]
name = "{assembly}.Analyzer"
entry_points = ["initialize", "supported_diagnostics"]
languages = ["{language}"]

[[types.diagnostics]]
id = "{diagnostic}001"
title = "Example rule"
category = "Usage"
severity = "warning"
"#
    )
}

/// Component table whose only type is not an analyzer.
fn helper_table(assembly: &str) -> String {
    format!(
        r#"assembly = "{assembly}"

[[types]]
name = "{assembly}.Helper"
"#
    )
}

/// Write `<feed>/<id>.<version>.nupkg` with a nuspec and the given content files.
pub fn write_nupkg(
    feed: &Path,
    id: &str,
    version: &str,
    license_required: bool,
    dependencies: &[(&str, &str)],
    files: &[(&str, &str)],
) -> PathBuf {
    fs::create_dir_all(feed).unwrap();
    let path = feed.join(format!("{}.{}.nupkg", id, version));

    let deps: String = dependencies
        .iter()
        .map(|(dep, ver)| format!(r#"      <dependency id="{}" version="{}" />"#, dep, ver))
        .collect::<Vec<_>>()
        .join("\n");
    let license = if license_required {
        "    <license type=\"expression\">Foo-1.0</license>\n    <licenseUrl>http://foo.bar/license</licenseUrl>\n"
    } else {
        ""
    };
    let nuspec = format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://schemas.microsoft.com/packaging/2013/05/nuspec.xsd">
  <metadata>
    <id>{id}</id>
    <version>{version}</version>
    <authors>Test Author</authors>
    <description>Test package {id}</description>
    <requireLicenseAcceptance>{license_required}</requireLicenseAcceptance>
{license}    <dependencies>
{deps}
    </dependencies>
  </metadata>
</package>
"#
    );

    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default();
    zip.start_file(format!("{}.nuspec", id), options).unwrap();
    zip.write_all(nuspec.as_bytes()).unwrap();
    for (name, content) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum License {
    Required,
    NotRequired,
}

/// A local feed plus download cache in a scratch directory.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("feed")).unwrap();
        Self { dir }
    }

    pub fn feed_dir(&self) -> PathBuf {
        self.dir.path().join("feed")
    }

    /// Publish a package whose payload either contains a C# analyzer or only a helper type.
    pub fn package(
        &self,
        id: &str,
        version: &str,
        license: License,
        has_analyzers: bool,
        dependencies: &[(&str, &str)],
    ) -> PathBuf {
        let payload = if has_analyzers {
            analyzer_table(id, "C#")
        } else {
            helper_table(id)
        };
        let dll = format!("analyzers/dotnet/cs/{}.dll", id);
        write_nupkg(
            &self.feed_dir(),
            id,
            version,
            license == License::Required,
            dependencies,
            &[(dll.as_str(), payload.as_str())],
        )
    }

    pub fn feed(&self) -> LocalFeed {
        LocalFeed::new(self.feed_dir(), self.dir.path().join("cache"))
    }
}

/// Resolve `root` from the fixture feed for C#.
pub fn resolve_graph(fx: &Fixture, root: &str, recurse: bool) -> PackageGraph {
    let log = MemorySink::new();
    let scanner = AnalyzerScanner::new(&ComponentTableLoader, &DefaultConstructorFactory, &log);
    let feed = fx.feed();
    GraphResolver::new(&feed, &scanner, Language::CSharp, &log)
        .resolve(root, None, recurse)
        .unwrap()
}

/// Graph of analyzer packages where the first depends directly on all the others, in order.
pub fn graph_of(packages: &[(&str, License)]) -> PackageGraph {
    let fx = Fixture::new();
    let (root, rest) = packages.split_first().unwrap();
    let deps: Vec<(&str, &str)> = rest.iter().map(|(id, _)| (*id, "1.0")).collect();
    for (id, license) in rest {
        fx.package(id, "1.0", *license, true, &[]);
    }
    fx.package(root.0, "1.0", root.1, true, &deps);
    resolve_graph(&fx, root.0, true)
}

/// Records which ids were requested from the wrapped repository.
pub struct CountingRepository<R> {
    inner: R,
    requests: RefCell<Vec<String>>,
}

impl<R: PackageRepository> CountingRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl<R: PackageRepository> PackageRepository for CountingRepository<R> {
    fn resolve(&self, id: &str, version: Option<&PackageVersion>) -> Result<ResolvedPackage> {
        self.requests.borrow_mut().push(id.to_string());
        self.inner.resolve(id, version)
    }
}

/// Toolchain fake that captures the staged manifest and rules and writes an empty archive.
pub struct RecordingToolchain {
    available: bool,
    fail_for: Option<String>,
    manifests: RefCell<Vec<String>>,
    rules: RefCell<Vec<String>>,
}

impl RecordingToolchain {
    pub fn new() -> Self {
        Self {
            available: true,
            fail_for: None,
            manifests: RefCell::new(Vec::new()),
            rules: RefCell::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Fails every archive.
    pub fn failing() -> Self {
        Self::failing_for("")
    }

    /// Fails archives whose file name starts with `<id>.`; an empty id fails all.
    pub fn failing_for(id: &str) -> Self {
        Self {
            fail_for: Some(id.to_string()),
            ..Self::new()
        }
    }

    pub fn staged_manifests(&self) -> Vec<String> {
        self.manifests.borrow().clone()
    }

    pub fn staged_rules(&self) -> Vec<String> {
        self.rules.borrow().clone()
    }
}

impl Toolchain for RecordingToolchain {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn compile_archive(&self, staging: &Path, manifest: &Path, archive: &Path) -> Result<()> {
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(id) = &self.fail_for {
            if id.is_empty() || file_name.starts_with(&format!("{}.", id)) {
                bail!("simulated toolchain failure");
            }
        }

        self.manifests.borrow_mut().push(fs::read_to_string(manifest)?);
        for entry in fs::read_dir(staging.join("resources"))? {
            let rules = entry?.path().join("rules.xml");
            if rules.exists() {
                self.rules.borrow_mut().push(fs::read_to_string(rules)?);
            }
        }
        fs::write(archive, b"")?;
        Ok(())
    }
}
