use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;

use super::local::LocalFeed;
use super::{select_version, PackageRepository, ResolvedPackage};
use crate::models::PackageVersion;

pub const NUGET_ORG: &str = "https://api.nuget.org/v3-flatcontainer";

/// A NuGet v3 flat-container feed.
///
/// Downloaded archives are kept in `cache_dir/feed/` and then read through a
/// [`LocalFeed`], so a package is fetched at most once per cache.
pub struct RemoteFeed {
    base_url: String,
    client: Client,
    local: LocalFeed,
    download_dir: PathBuf,
}

#[derive(Deserialize)]
struct VersionIndex {
    versions: Vec<String>,
}

impl RemoteFeed {
    pub fn new(base_url: &str, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        let download_dir = cache_dir.join("feed");
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("analyzer-plugin-gen/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            local: LocalFeed::new(&download_dir, cache_dir.join("packages")),
            download_dir,
        })
    }

    fn index_url(&self, id: &str) -> String {
        format!("{}/{}/index.json", self.base_url, id.to_ascii_lowercase())
    }

    fn package_url(&self, id: &str, version: &PackageVersion) -> String {
        let id = id.to_ascii_lowercase();
        let version = version.as_str().to_ascii_lowercase();
        format!("{}/{id}/{version}/{id}.{version}.nupkg", self.base_url)
    }

    fn published_versions(&self, id: &str) -> Result<Vec<PackageVersion>> {
        let response = self
            .client
            .get(self.index_url(id))
            .header("Accept", "application/json")
            .send()
            .with_context(|| format!("cannot reach package feed {}", self.base_url))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            bail!("package {} not found on {}", id, self.base_url);
        }
        if !response.status().is_success() {
            bail!("package feed returned {} for {}", response.status(), id);
        }

        let index: VersionIndex = response.json()?;
        Ok(index
            .versions
            .iter()
            .filter_map(|v| PackageVersion::parse(v).ok())
            .collect())
    }

    fn download(&self, id: &str, version: &PackageVersion) -> Result<()> {
        let target = self.download_dir.join(format!(
            "{}.{}.nupkg",
            id.to_ascii_lowercase(),
            version.as_str().to_ascii_lowercase()
        ));
        if target.exists() {
            return Ok(());
        }

        let url = self.package_url(id, version);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("failed to download {}", url))?;
        if !response.status().is_success() {
            bail!("download of {} failed with {}", url, response.status());
        }
        let bytes = response.bytes()?;

        fs::create_dir_all(&self.download_dir)?;
        fs::write(&target, &bytes)
            .with_context(|| format!("cannot write {}", target.display()))?;
        Ok(())
    }
}

impl PackageRepository for RemoteFeed {
    fn resolve(&self, id: &str, version: Option<&PackageVersion>) -> Result<ResolvedPackage> {
        let published = self.published_versions(id)?;
        let chosen = select_version(&published, version)
            .ok_or_else(|| anyhow!("no matching version of {} on {}", id, self.base_url))?
            .clone();

        self.download(id, &chosen)?;
        self.local.resolve(id, Some(&chosen))
    }
}
