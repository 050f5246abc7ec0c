use std::path::PathBuf;

use clap::Parser;

use crate::models::Language;
use crate::toolchain::ToolchainKind;

#[derive(Parser, Debug)]
#[command(
    name = "analyzer-plugin-gen",
    about = "Generate code-analysis plugins from NuGet analyzer packages",
    version
)]
pub struct Cli {
    /// Id of the package to generate a plugin for
    pub package_id: String,

    /// Package version [default: latest stable]
    #[arg(long = "package-version", value_name = "VERSION")]
    pub package_version: Option<String>,

    /// Target language of the analyzers [default: cs]
    #[arg(long, value_name = "LANG")]
    pub language: Option<LanguageArg>,

    /// Accept the licenses of packages that require it
    #[arg(long)]
    pub accept_licenses: bool,

    /// Also generate plugins for dependencies that contain analyzers
    #[arg(long)]
    pub recurse: bool,

    /// Rules XML file to use instead of the generated template (root package only)
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Directory for generated plugins [default: current directory]
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Package feed: flat-container URL or local directory of .nupkg files [default: nuget.org]
    #[arg(long, value_name = "DIR|URL")]
    pub feed: Option<String>,

    /// How archives are built; `bundled` skips compilation [default: jdk]
    #[arg(long, value_name = "KIND")]
    pub toolchain: Option<ToolchainArg>,

    /// Config file [default: ./.analyzer-plugin-gen/config.toml, fallback ~/.config/analyzer-plugin-gen/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Only print warnings, errors and the summary line
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum LanguageArg {
    Cs,
    Vb,
}

impl From<&LanguageArg> for Language {
    fn from(arg: &LanguageArg) -> Self {
        match arg {
            LanguageArg::Cs => Language::CSharp,
            LanguageArg::Vb => Language::VisualBasic,
        }
    }
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum ToolchainArg {
    /// Compile with javac and pack with jar
    Jdk,
    /// Zip the uncompiled sources, no JDK needed
    Bundled,
}

impl From<&ToolchainArg> for ToolchainKind {
    fn from(arg: &ToolchainArg) -> Self {
        match arg {
            ToolchainArg::Jdk => ToolchainKind::Jdk,
            ToolchainArg::Bundled => ToolchainKind::Bundled,
        }
    }
}
