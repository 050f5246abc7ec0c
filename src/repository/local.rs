use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use zip::ZipArchive;

use super::nuspec::parse_nuspec;
use super::{select_version, PackageRepository, ResolvedPackage};
use crate::models::{PackageMetadata, PackageVersion};

/// A feed directory of `<id>.<version>.nupkg` files.
///
/// Resolved packages are extracted under `cache_dir/<id>/<version>/`.
pub struct LocalFeed {
    feed_dir: PathBuf,
    cache_dir: PathBuf,
}

impl LocalFeed {
    pub fn new(feed_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            feed_dir: feed_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// All versions of `id` present in the feed, with their archive paths.
    ///
    /// File names only narrow the search: `Foo.2.1.0.nupkg` may be `Foo` 2.1.0
    /// or `Foo.2` 1.0, so the id and version come from the archive's nuspec.
    fn available(&self, id: &str) -> Result<Vec<(PackageVersion, PathBuf)>> {
        let prefix = format!("{}.", id.to_ascii_lowercase());
        let entries = fs::read_dir(&self.feed_dir)
            .with_context(|| format!("cannot read package feed {}", self.feed_dir.display()))?;

        let mut found = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let lower = name.to_ascii_lowercase();
            if !lower.starts_with(&prefix) || !lower.ends_with(".nupkg") {
                continue;
            }
            let metadata = read_metadata(&mut open_archive(&path)?, &path)?;
            if metadata.id.eq_ignore_ascii_case(id) {
                found.push((metadata.version, path));
            }
        }
        Ok(found)
    }

    fn extract(&self, archive_path: &Path) -> Result<ResolvedPackage> {
        let mut archive = open_archive(archive_path)?;
        let metadata = read_metadata(&mut archive, archive_path)?;

        let content_dir = self
            .cache_dir
            .join(metadata.id.to_ascii_lowercase())
            .join(metadata.version.as_str());
        if content_dir.exists() {
            fs::remove_dir_all(&content_dir)?;
        }
        fs::create_dir_all(&content_dir)?;

        let mut files = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let Some(relative) = entry.enclosed_name() else {
                bail!(
                    "{} contains an unsafe entry '{}'",
                    archive_path.display(),
                    entry.name()
                );
            };
            if entry.is_dir() || is_packaging_part(&relative) {
                continue;
            }
            let target = content_dir.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            std::io::copy(&mut entry, &mut out)?;
            files.push(relative);
        }

        Ok(ResolvedPackage {
            metadata,
            content_dir,
            files,
        })
    }
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    ZipArchive::new(file).with_context(|| format!("{} is not a valid package archive", path.display()))
}

/// Parse the top-level `.nuspec` of a package archive.
fn read_metadata(archive: &mut ZipArchive<File>, path: &Path) -> Result<PackageMetadata> {
    let nuspec_name = archive
        .file_names()
        .find(|n| !n.contains('/') && n.to_ascii_lowercase().ends_with(".nuspec"))
        .map(str::to_string)
        .ok_or_else(|| anyhow!("{} contains no .nuspec", path.display()))?;
    let mut xml = String::new();
    archive.by_name(&nuspec_name)?.read_to_string(&mut xml)?;
    parse_nuspec(&xml).with_context(|| format!("invalid manifest in {}", path.display()))
}

/// Archive entries that belong to the package format rather than its content.
fn is_packaging_part(path: &Path) -> bool {
    let text = path.to_string_lossy().replace('\\', "/").to_ascii_lowercase();
    let top_level = !text.contains('/');
    (top_level && text.ends_with(".nuspec"))
        || text == "[content_types].xml"
        || text.starts_with("_rels/")
        || text.starts_with("package/services/")
}

impl PackageRepository for LocalFeed {
    fn resolve(&self, id: &str, version: Option<&PackageVersion>) -> Result<ResolvedPackage> {
        let available = self.available(id)?;
        let versions: Vec<PackageVersion> = available.iter().map(|(v, _)| v.clone()).collect();
        let chosen = select_version(&versions, version).ok_or_else(|| match version {
            Some(v) => anyhow!("package {} {} not found in {}", id, v, self.feed_dir.display()),
            None => anyhow!("package {} not found in {}", id, self.feed_dir.display()),
        })?;

        let (_, path) = available
            .iter()
            .find(|(v, _)| v == chosen)
            .ok_or_else(|| anyhow!("package {} {} vanished from feed", id, chosen))?;
        self.extract(path)
    }
}
