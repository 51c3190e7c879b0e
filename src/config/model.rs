use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use time::UtcOffset;
use url::Url;

use super::dates::{parse_offset, validate_date_format};
use super::redirects::{Redirect, validate_redirects};
use super::series::{SeriesConfig, validate_series};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub title: Option<String>,
    pub base_url: String,
    pub date_format: String,
    pub default_timezone: String,
    pub components: ComponentsConfig,
    pub newsletter: NewsletterConfig,
    pub series: BTreeMap<String, SeriesConfig>,
    pub redirects: Vec<Redirect>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ComponentsConfig {
    pub strategy: ComponentStrategy,
}

/// How component shortcodes in documents are turned into HTML.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStrategy {
    /// Generic HTML renderers compiled into quire.
    #[default]
    Builtin,
    /// One theme template per component under `templates/components/`.
    Templates,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NewsletterConfig {
    pub action: Option<String>,
    pub button_label: Option<String>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&raw).with_context(|| invalid_yaml_message(path))?;
        config.validate(path)?;
        Ok(config)
    }

    pub fn validate(&self, origin: &Path) -> Result<()> {
        validate_url(&self.base_url, origin)?;
        validate_date_format(&self.date_format).with_context(|| {
            format!(
                "{}: date_format '{}' is invalid (see https://docs.rs/time/latest/time/format_description)",
                origin.display(),
                self.date_format
            )
        })?;
        parse_offset(&self.default_timezone).with_context(|| {
            format!(
                "{}: default_timezone '{}' is invalid (expected offset like +00:00)",
                origin.display(),
                self.default_timezone
            )
        })?;
        validate_series(&self.series, origin)?;
        validate_redirects(&self.redirects, origin)?;
        if let Some(action) = self.newsletter.action.as_deref()
            && action.trim().is_empty()
        {
            bail!("{}: newsletter.action must not be empty", origin.display());
        }
        Ok(())
    }

    pub fn default_offset(&self) -> Result<UtcOffset> {
        parse_offset(&self.default_timezone)
    }

    pub fn series(&self, key: &str) -> Option<&SeriesConfig> {
        self.series.get(key)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: None,
            base_url: "https://example.com".to_string(),
            date_format: "[month repr:long] [day padding:none], [year]".to_string(),
            default_timezone: "+00:00".to_string(),
            components: ComponentsConfig::default(),
            newsletter: NewsletterConfig::default(),
            series: BTreeMap::new(),
            redirects: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

fn invalid_yaml_message(path: &Path) -> String {
    format!("{}: invalid YAML", path.display())
}

fn validate_url(value: &str, origin: &Path) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{}: base_url must not be empty", origin.display());
    }
    let url = Url::parse(value)
        .with_context(|| format!("{}: base_url must be an absolute URL", origin.display()))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{}: base_url must use http or https", origin.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quire.yaml");
        let config = Config::load(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.components.strategy, ComponentStrategy::Builtin);
    }

    #[test]
    fn load_valid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quire.yaml");
        fs::write(
            &path,
            r#"title: "Dan Does Code"
base_url: "https://example.com/blog"
default_timezone: "+05:30"
components:
  strategy: templates
newsletter:
  action: "https://newsletter.example.com/subscribe"
series:
  bicep:
    title: "Bicep"
    parts:
      - title: "Part 1: Introduction"
        href: "/blog/bicep/part-one"
      - title: "Part 2: Coming Soon"
    resources:
      - title: "Bicep Repo"
        href: "https://github.com/Azure/bicep"
redirects:
  - source: /blog/bicep-part-one
    destination: /blog/bicep/part-one
  - source: /blog/old-draft
    destination: /blog/new-draft
    permanent: false
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.title.as_deref(), Some("Dan Does Code"));
        assert_eq!(config.components.strategy, ComponentStrategy::Templates);
        let bicep = config.series("bicep").unwrap();
        assert_eq!(bicep.parts.len(), 2);
        assert!(bicep.parts[1].href.is_none());
        assert_eq!(bicep.resources[0].href, "https://github.com/Azure/bicep");
        assert_eq!(config.redirects.len(), 2);
        assert!(config.redirects[0].permanent);
        assert!(!config.redirects[1].permanent);
        assert_eq!(config.default_offset().unwrap().whole_minutes(), 330);
    }

    #[test]
    fn extra_keys_are_retained() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quire.yaml");
        fs::write(&path, "author: Dan\nsocial:\n  github: example\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.extra.get("author"),
            Some(&JsonValue::String("Dan".to_string()))
        );
    }

    #[test]
    fn reject_invalid_url() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quire.yaml");
        fs::write(&path, "base_url: \"ftp://example.com\"\n").unwrap();

        let error = Config::load(&path).unwrap_err();
        assert!(format!("{error}").contains("base_url must use http or https"));
    }

    #[test]
    fn reject_unknown_component_strategy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quire.yaml");
        fs::write(&path, "components:\n  strategy: dynamic\n").unwrap();

        let error = Config::load(&path).unwrap_err();
        assert!(format!("{error}").contains("invalid YAML"));
    }

    #[test]
    fn reject_invalid_timezone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quire.yaml");
        fs::write(&path, "default_timezone: \"Mars/Station\"\n").unwrap();

        let error = Config::load(&path).unwrap_err();
        assert!(format!("{error}").contains("default_timezone"));
    }

    #[test]
    fn reject_invalid_redirect() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quire.yaml");
        fs::write(
            &path,
            "redirects:\n  - source: blog/old\n    destination: /blog/new\n",
        )
        .unwrap();

        let error = Config::load(&path).unwrap_err();
        assert!(format!("{error}").contains("must start with '/'"));
    }
}
