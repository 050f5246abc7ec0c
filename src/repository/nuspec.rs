use anyhow::{anyhow, bail, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::models::{DependencyRef, PackageMetadata, PackageVersion};

/// Parse a `.nuspec` manifest into [`PackageMetadata`].
///
/// Dependencies are collected from both the flat `<dependencies>` list and
/// framework `<group>` elements, keeping the first occurrence of each id.
pub fn parse_nuspec(xml: &str) -> Result<PackageMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut fields = Fields::default();
    let mut license_is_expression = true;
    let mut dependencies: Vec<DependencyRef> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let tag = local_name(e);
                if tag == "dependency" {
                    push_dependency(e, &mut dependencies)?;
                }
                if tag == "license" && in_metadata(&stack) {
                    license_is_expression = attribute(e, "type").as_deref() != Some("file");
                }
                stack.push(tag);
            }
            Ok(Event::Empty(ref e)) => {
                if local_name(e) == "dependency" {
                    push_dependency(e, &mut dependencies)?;
                }
            }
            Ok(Event::Text(ref t)) => {
                if stack.len() == 3 && in_metadata(&stack[..2]) {
                    let text = t.unescape()?.into_owned();
                    fields.set(&stack[2], text);
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!(
                "malformed nuspec at position {}: {}",
                reader.buffer_position(),
                e
            ),
            _ => {}
        }
    }

    let id = fields.id.ok_or_else(|| anyhow!("nuspec is missing <id>"))?;
    let version = fields
        .version
        .ok_or_else(|| anyhow!("nuspec for '{}' is missing <version>", id))?;
    let version = PackageVersion::parse(&version)?;

    Ok(PackageMetadata {
        id,
        version,
        title: fields.title,
        authors: fields.authors.unwrap_or_default(),
        owners: fields.owners,
        description: fields.description.unwrap_or_default(),
        project_url: fields.project_url,
        license_url: fields.license_url,
        license_names: fields.license.filter(|_| license_is_expression),
        require_license_acceptance: fields
            .require_license_acceptance
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
        dependencies,
    })
}

#[derive(Default)]
struct Fields {
    id: Option<String>,
    version: Option<String>,
    title: Option<String>,
    authors: Option<String>,
    owners: Option<String>,
    description: Option<String>,
    project_url: Option<String>,
    license_url: Option<String>,
    license: Option<String>,
    require_license_acceptance: Option<String>,
}

impl Fields {
    fn set(&mut self, tag: &str, value: String) {
        let slot = match tag {
            "id" => &mut self.id,
            "version" => &mut self.version,
            "title" => &mut self.title,
            "authors" => &mut self.authors,
            "owners" => &mut self.owners,
            "description" => &mut self.description,
            "projectUrl" => &mut self.project_url,
            "licenseUrl" => &mut self.license_url,
            "license" => &mut self.license,
            "requireLicenseAcceptance" => &mut self.require_license_acceptance,
            _ => return,
        };
        *slot = Some(value).filter(|v| !v.trim().is_empty());
    }
}

fn in_metadata(stack: &[String]) -> bool {
    stack.len() >= 2 && stack[0] == "package" && stack[1] == "metadata"
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        (key == name).then(|| attr.unescape_value().unwrap_or_default().into_owned())
    })
}

fn push_dependency(e: &BytesStart<'_>, deps: &mut Vec<DependencyRef>) -> Result<()> {
    let Some(id) = attribute(e, "id").filter(|id| !id.is_empty()) else {
        return Ok(());
    };
    if deps.iter().any(|d| d.id.eq_ignore_ascii_case(&id)) {
        return Ok(());
    }
    let version = match attribute(e, "version") {
        Some(range) => range_lower_bound(&range)?,
        None => None,
    };
    deps.push(DependencyRef { id, version });
    Ok(())
}

/// Lower bound of a NuGet version range: `1.0`, `[1.0]`, `[1.0, 2.0)` all give `1.0`.
/// Ranges without a lower bound (`(, 2.0]`) give `None`.
pub fn range_lower_bound(range: &str) -> Result<Option<PackageVersion>> {
    let inner = range
        .trim()
        .trim_start_matches(['[', '('])
        .trim_end_matches([']', ')']);
    let lower = inner.split(',').next().unwrap_or("").trim();
    if lower.is_empty() {
        return Ok(None);
    }
    Ok(Some(PackageVersion::parse(lower)?))
}
