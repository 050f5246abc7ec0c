use anyhow::{bail, Result};
use regex::Regex;
use serde::Serialize;

use crate::models::PackageMetadata;

/// Maximum length in bytes of a physical line in a JAR manifest, line break excluded.
const MANIFEST_LINE_LIMIT: usize = 72;

/// Descriptive fields of a generated plugin, derived from package metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginManifest {
    pub key: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub organization: String,
    pub homepage: Option<String>,
    pub developers: String,
    pub license: Option<String>,
    pub terms_conditions_url: Option<String>,
}

impl PluginManifest {
    /// Build the manifest for a package.
    ///
    /// Missing fields fall back as follows: name ← title, else the id with
    /// separators turned into spaces; organization ← owners, else authors;
    /// license ← license names, else license URL.
    pub fn from_metadata(metadata: &PackageMetadata) -> Result<Self> {
        let name = non_empty(metadata.title.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| metadata.id.replace(['.', '-', '_'], " "));
        let organization = non_empty(metadata.owners.as_deref())
            .unwrap_or(metadata.authors.as_str())
            .to_string();

        Ok(Self {
            key: plugin_key(&metadata.id)?,
            name,
            description: metadata.description.clone(),
            version: metadata.version.to_string(),
            organization,
            homepage: non_empty(metadata.project_url.as_deref()).map(str::to_string),
            developers: metadata.authors.clone(),
            license: metadata.license_display().map(str::to_string),
            terms_conditions_url: non_empty(metadata.license_url.as_deref()).map(str::to_string),
        })
    }

    /// Render `META-INF/MANIFEST.MF`.
    ///
    /// Attributes are written in a fixed order with CRLF line endings, so the
    /// output depends only on the manifest fields.
    pub fn to_manifest_mf(&self, plugin_class: &str) -> String {
        let mut attributes: Vec<(&str, &str)> = vec![
            ("Manifest-Version", "1.0"),
            ("Plugin-Key", self.key.as_str()),
            ("Plugin-Name", self.name.as_str()),
            ("Plugin-Description", self.description.as_str()),
            ("Plugin-Version", self.version.as_str()),
            ("Plugin-Organization", self.organization.as_str()),
            ("Plugin-Developers", self.developers.as_str()),
        ];
        if let Some(homepage) = &self.homepage {
            attributes.push(("Plugin-Homepage", homepage.as_str()));
        }
        if let Some(license) = &self.license {
            attributes.push(("Plugin-License", license.as_str()));
        }
        if let Some(terms) = &self.terms_conditions_url {
            attributes.push(("Plugin-TermsConditionsUrl", terms.as_str()));
        }
        attributes.push(("Plugin-Class", plugin_class));

        let mut out = String::new();
        for (name, value) in attributes {
            // Manifest values are single-line.
            let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
            write_wrapped(&mut out, &format!("{}: {}", name, value));
        }
        out.push_str("\r\n");
        out
    }
}

/// Plugin key: the lower-cased package id with every character outside `[a-z0-9]` removed.
pub fn plugin_key(package_id: &str) -> Result<String> {
    let re = Regex::new("[^a-z0-9]")?;
    let key = re.replace_all(&package_id.to_ascii_lowercase(), "").into_owned();
    if key.is_empty() {
        bail!("cannot derive a plugin key from package id '{}'", package_id);
    }
    Ok(key)
}

/// Java class name for the plugin entry point, e.g. `Foo.Bar-Baz` → `FooBarBazPlugin`.
pub fn plugin_class_name(package_id: &str) -> String {
    let mut name: String = package_id
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "Package");
    }
    name.push_str("Plugin");
    name
}

/// Java package holding a plugin's generated sources.
pub fn java_package(key: &str) -> String {
    if key.starts_with(|c: char| c.is_ascii_digit()) {
        format!("org.analyzerplugins.p{}", key)
    } else {
        format!("org.analyzerplugins.{}", key)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Append one manifest header, continuing long lines with a leading space.
fn write_wrapped(out: &mut String, line: &str) {
    let mut rest = line;
    let mut limit = MANIFEST_LINE_LIMIT;
    loop {
        if rest.len() <= limit {
            out.push_str(rest);
            out.push_str("\r\n");
            return;
        }
        let mut split = limit;
        while !rest.is_char_boundary(split) {
            split -= 1;
        }
        out.push_str(&rest[..split]);
        out.push_str("\r\n ");
        rest = &rest[split..];
        limit = MANIFEST_LINE_LIMIT - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::metadata;

    #[test]
    fn test_fallbacks_when_optional_fields_missing() {
        let meta = metadata("Foo.Bar-Baz_Qux", "1.2.3");
        let manifest = PluginManifest::from_metadata(&meta).unwrap();

        assert_eq!(manifest.name, "Foo Bar Baz Qux");
        assert_eq!(manifest.organization, meta.authors);
        assert_eq!(manifest.developers, meta.authors);
        assert_eq!(manifest.license, None);
        assert_eq!(manifest.homepage, None);
        assert_eq!(manifest.version, "1.2.3");
        assert_eq!(manifest.key, "foobarbazqux");
    }

    #[test]
    fn test_explicit_fields_win() {
        let mut meta = metadata("Foo.Bar", "1.0");
        meta.title = Some("Foo Analyzers".into());
        meta.owners = Some("Foo Corp".into());
        meta.license_names = Some("Foo License".into());
        meta.license_url = Some("http://foo.bar/license".into());
        meta.project_url = Some("http://foo.bar".into());

        let manifest = PluginManifest::from_metadata(&meta).unwrap();

        assert_eq!(manifest.name, "Foo Analyzers");
        assert_eq!(manifest.organization, "Foo Corp");
        assert_eq!(manifest.license.as_deref(), Some("Foo License"));
        assert_eq!(manifest.terms_conditions_url.as_deref(), Some("http://foo.bar/license"));
        assert_eq!(manifest.homepage.as_deref(), Some("http://foo.bar"));
    }

    #[test]
    fn test_license_url_used_without_name() {
        let mut meta = metadata("Foo.Bar", "1.0");
        meta.license_url = Some("http://foo.bar/license".into());
        let manifest = PluginManifest::from_metadata(&meta).unwrap();
        assert_eq!(manifest.license.as_deref(), Some("http://foo.bar/license"));
    }

    #[test]
    fn test_plugin_key_sanitization() {
        assert_eq!(plugin_key("My.Package-Id_2").unwrap(), "mypackageid2");
        assert!(plugin_key("...").is_err());
    }

    #[test]
    fn test_plugin_class_name() {
        assert_eq!(plugin_class_name("foo.bar-baz"), "FooBarBazPlugin");
        assert_eq!(plugin_class_name("7zip.analyzers"), "Package7zipAnalyzersPlugin");
        assert_eq!(java_package("7zip"), "org.analyzerplugins.p7zip");
    }

    #[test]
    fn test_manifest_lines_are_wrapped() {
        let mut meta = metadata("Foo.Bar", "1.0");
        meta.description = "x".repeat(200);
        let mf = PluginManifest::from_metadata(&meta).unwrap().to_manifest_mf("a.B");

        assert!(mf.starts_with("Manifest-Version: 1.0\r\n"));
        assert!(mf.ends_with("Plugin-Class: a.B\r\n\r\n"));
        for line in mf.split("\r\n") {
            assert!(line.len() <= MANIFEST_LINE_LIMIT, "line too long: {}", line);
        }
        let unwrapped = mf.replace("\r\n ", "");
        assert!(unwrapped.contains(&format!("Plugin-Description: {}", "x".repeat(200))));
    }

    #[test]
    fn test_manifest_is_deterministic() {
        let meta = metadata("Foo.Bar", "1.0");
        let a = PluginManifest::from_metadata(&meta).unwrap().to_manifest_mf("a.B");
        let b = PluginManifest::from_metadata(&meta).unwrap().to_manifest_mf("a.B");
        assert_eq!(a, b);
    }
}
