use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::Toolchain;

/// Packs the staged layout directly, without a JDK.
///
/// Sources are shipped uncompiled under `src/`, so the archive is a staging
/// artifact: the class named by `Plugin-Class` is not in it. Entries are
/// sorted and carry a fixed timestamp, so identical inputs give identical
/// archives.
pub struct BundledToolchain;

impl Toolchain for BundledToolchain {
    fn name(&self) -> &str {
        "bundled"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn compile_archive(&self, staging: &Path, manifest: &Path, archive: &Path) -> Result<()> {
        let file = File::create(archive)
            .with_context(|| format!("cannot create {}", archive.display()))?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        zip.start_file("META-INF/MANIFEST.MF", options)?;
        zip.write_all(&fs::read(manifest).with_context(|| format!("cannot read {}", manifest.display()))?)?;

        add_tree(&mut zip, &staging.join("resources"), "", options)?;
        add_tree(&mut zip, &staging.join("src"), "src/", options)?;

        zip.finish()?;
        Ok(())
    }
}

/// Add every file below `root`, named `<prefix><path relative to root>`.
fn add_tree(
    zip: &mut ZipWriter<File>,
    root: &Path,
    prefix: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    if !root.exists() {
        return Ok(());
    }
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("cannot walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        zip.start_file(format!("{}{}", prefix, name), options)?;
        zip.write_all(&fs::read(entry.path())?)?;
    }
    Ok(())
}
