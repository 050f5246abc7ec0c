use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use super::Toolchain;

/// `javac` + `jar` from a local JDK.
pub struct JdkToolchain {
    javac: PathBuf,
    jar: PathBuf,
}

impl JdkToolchain {
    /// Use `$JAVA_HOME/bin` when set, else whatever is on `PATH`.
    pub fn from_env() -> Self {
        match std::env::var_os("JAVA_HOME") {
            Some(home) if !home.is_empty() => {
                let bin = PathBuf::from(home).join("bin");
                Self::new(bin.join("javac"), bin.join("jar"))
            }
            _ => Self::new("javac", "jar"),
        }
    }

    pub fn new(javac: impl Into<PathBuf>, jar: impl Into<PathBuf>) -> Self {
        Self {
            javac: javac.into(),
            jar: jar.into(),
        }
    }
}

impl Toolchain for JdkToolchain {
    fn name(&self) -> &str {
        "jdk"
    }

    fn is_available(&self) -> bool {
        probe(&self.javac, "-version") && probe(&self.jar, "--version")
    }

    fn compile_archive(&self, staging: &Path, manifest: &Path, archive: &Path) -> Result<()> {
        let sources = java_sources(&staging.join("src"))?;
        if sources.is_empty() {
            bail!("no Java sources staged under {}", staging.display());
        }

        let classes = staging.join("classes");
        fs::create_dir_all(&classes)?;

        let mut javac = Command::new(&self.javac);
        javac
            .arg("-encoding")
            .arg("UTF-8")
            .arg("-d")
            .arg(&classes)
            .args(&sources);
        run(javac, "javac")?;

        let mut jar = Command::new(&self.jar);
        jar.arg("cfm")
            .arg(archive)
            .arg(manifest)
            .arg("-C")
            .arg(&classes)
            .arg(".")
            .arg("-C")
            .arg(staging.join("resources"))
            .arg(".");
        run(jar, "jar")
    }
}

fn probe(program: &Path, flag: &str) -> bool {
    Command::new(program)
        .arg(flag)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn java_sources(src: &Path) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.with_context(|| format!("cannot walk {}", src.display()))?;
        if entry.file_type().is_file() && entry.path().extension() == Some(OsStr::new("java")) {
            sources.push(entry.into_path());
        }
    }
    Ok(sources)
}

fn run(mut command: Command, what: &str) -> Result<()> {
    let output = command
        .output()
        .with_context(|| format!("failed to start {}", what))?;
    if !output.status.success() {
        bail!(
            "{} exited with {}: {}",
            what,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
