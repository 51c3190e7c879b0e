use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// A multi-part article series as declared under `series:` in quire.yaml.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SeriesConfig {
    pub title: String,
    pub description: Option<String>,
    pub parts: Vec<SeriesPart>,
    pub resources: Vec<SeriesLink>,
}

/// One entry of a series. Parts without `href` are announced but not yet published.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SeriesPart {
    pub title: String,
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SeriesLink {
    pub title: String,
    pub href: String,
}

pub(super) fn validate_series(series: &BTreeMap<String, SeriesConfig>, origin: &Path) -> Result<()> {
    for (key, entry) in series {
        if key.trim().is_empty() {
            bail!("{}: series keys must not be empty", origin.display());
        }
        if entry.title.trim().is_empty() {
            bail!("{}: series '{}' needs a title", origin.display(), key);
        }
        if entry.parts.is_empty() {
            bail!(
                "{}: series '{}' must list at least one part",
                origin.display(),
                key
            );
        }
        for resource in &entry.resources {
            if resource.href.trim().is_empty() {
                bail!(
                    "{}: resource '{}' in series '{}' has an empty href",
                    origin.display(),
                    resource.title,
                    key
                );
            }
        }
    }
    Ok(())
}
