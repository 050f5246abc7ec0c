//! Package repository clients.
//!
//! - [`local`] — a directory of `.nupkg` files.
//! - [`remote`] — a NuGet v3 flat-container feed over HTTP, cached as a local feed.
//! - [`nuspec`] — `.nuspec` manifest parsing shared by both.

pub mod local;
pub mod nuspec;
pub mod remote;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::models::{PackageMetadata, PackageVersion};

/// A package resolved and unpacked on local disk.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub metadata: PackageMetadata,
    /// Directory the package content was extracted to.
    pub content_dir: PathBuf,
    /// Content files in archive order, relative to `content_dir`.
    pub files: Vec<PathBuf>,
}

impl ResolvedPackage {
    /// Absolute paths of the assembly payloads offered to the analyzer scanner.
    pub fn assembly_paths(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|f| is_assembly(f))
            .map(|f| self.content_dir.join(f))
            .collect()
    }
}

fn is_assembly(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("dll"))
}

/// Resolves package ids to metadata and content.
///
/// `version` is the lowest acceptable version; `None` asks for the latest.
/// Implementations must return the same package for the same request within a
/// run, and must keep declared dependencies in their declared order.
pub trait PackageRepository {
    fn resolve(&self, id: &str, version: Option<&PackageVersion>) -> Result<ResolvedPackage>;
}

/// Open the feed named in configuration: an `http(s)` URL is a remote feed,
/// anything else a local feed directory.
pub fn open(feed: &str, cache_dir: &Path) -> Result<Box<dyn PackageRepository>> {
    if feed.starts_with("http://") || feed.starts_with("https://") {
        Ok(Box::new(remote::RemoteFeed::new(feed, cache_dir)?))
    } else {
        Ok(Box::new(local::LocalFeed::new(feed, cache_dir.join("packages"))))
    }
}

/// Pick the version to use from those available.
///
/// An exact match wins, else the lowest version above the request. Without a
/// request the highest stable version wins, falling back to the highest
/// pre-release.
pub fn select_version<'a>(
    available: &'a [PackageVersion],
    requested: Option<&PackageVersion>,
) -> Option<&'a PackageVersion> {
    match requested {
        Some(req) => available
            .iter()
            .find(|v| *v == req)
            .or_else(|| available.iter().filter(|v| *v > req).min()),
        None => available
            .iter()
            .filter(|v| !v.is_prerelease())
            .max()
            .or_else(|| available.iter().max()),
    }
}
