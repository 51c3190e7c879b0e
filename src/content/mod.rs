use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use serde_yaml::Mapping;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use walkdir::WalkDir;

use crate::config::{Config, parse_offset};

#[cfg(test)]
mod tests;

const DOCUMENT_EXTENSIONS: &[&str] = &["md", "mdx"];

/// An authored article, parsed from one Markdown file under `posts/`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub slug: String,
    pub date: OffsetDateTime,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub series: Option<String>,
    pub layout: Layout,
    pub draft: bool,
    pub body: String,
    pub content_path: PathBuf,
    pub permalink: String,
    pub extra: JsonMap<String, JsonValue>,
}

/// Page layouts a document can ask for in its front matter.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub enum Layout {
    PostSimple,
    #[default]
    PostLayout,
    PostBanner,
}

impl Layout {
    pub fn template_name(self) -> &'static str {
        match self {
            Layout::PostSimple => "layouts/post_simple.html",
            Layout::PostLayout => "layouts/post_layout.html",
            Layout::PostBanner => "layouts/post_banner.html",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub date: Option<String>,
    #[serde(deserialize_with = "deserialize_string_or_list")]
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub series: Option<String>,
    pub layout: Option<Layout>,
    pub draft: bool,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// Loads every document below `root`, drafts excluded, oldest first.
pub fn discover_documents(root: impl AsRef<Path>, config: &Config) -> Result<Vec<Document>> {
    let root = root.as_ref();
    if !root.exists() {
        bail!("posts directory {} does not exist", root.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() && is_document_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    let mut documents: Vec<Document> = Vec::new();
    for path in files {
        let document = load_document(root, &path, config)?;
        if document.draft {
            continue;
        }
        if let Some(existing) = documents.iter().find(|known| known.slug == document.slug) {
            bail!(
                "{} and {} both resolve to slug '{}'",
                existing.content_path.display(),
                document.content_path.display(),
                document.slug
            );
        }
        documents.push(document);
    }

    documents.sort_by(|left, right| {
        left.date
            .cmp(&right.date)
            .then_with(|| left.slug.cmp(&right.slug))
    });
    Ok(documents)
}

fn load_document(root: &Path, path: &Path, config: &Config) -> Result<Document> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let (front, body) = parse_front_matter(&raw)
        .with_context(|| format!("{}: missing or invalid front matter", path.display()))?;

    let title = front
        .title
        .filter(|title| !title.trim().is_empty())
        .with_context(|| format!("{}: title is required", path.display()))?;

    let date_str = front
        .date
        .as_ref()
        .with_context(|| format!("{}: date is required", path.display()))?;
    let date = parse_document_date(date_str, config, path)?;

    let slug = determine_slug(root, path, front.slug.as_deref())?;
    let permalink = format!("/blog/{slug}/");

    let extra = mapping_to_json_map(&front.extra)
        .with_context(|| format!("{}: front matter keys must be strings", path.display()))?;

    let series = front
        .series
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    Ok(Document {
        title,
        slug,
        date,
        tags: front.tags,
        summary: front.summary,
        series,
        layout: front.layout.unwrap_or_default(),
        draft: front.draft,
        body,
        content_path: path.to_path_buf(),
        permalink,
        extra,
    })
}

fn parse_document_date(date_str: &str, config: &Config, origin: &Path) -> Result<OffsetDateTime> {
    let date_str = date_str.trim();
    if let Ok(datetime) = OffsetDateTime::parse(date_str, &Rfc3339) {
        return Ok(datetime);
    }

    let naive_datetime = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let naive_date = format_description!("[year]-[month]-[day]");

    let default_offset = || {
        config.default_offset().with_context(|| {
            format!(
                "{}: default_timezone '{}' is invalid",
                origin.display(),
                config.default_timezone
            )
        })
    };

    if let Ok(datetime) = PrimitiveDateTime::parse(date_str, naive_datetime) {
        return Ok(datetime.assume_offset(default_offset()?));
    }

    if let Ok(date) = Date::parse(date_str, naive_date) {
        return Ok(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_offset(default_offset()?));
    }

    if let Some((main, offset_part)) = date_str.rsplit_once(' ')
        && let Ok(datetime) = PrimitiveDateTime::parse(main, naive_datetime)
        && let Ok(offset) = parse_offset(offset_part)
    {
        return Ok(datetime.assume_offset(offset));
    }

    bail!(
        "{}: date must be RFC3339, 'YYYY-MM-DD', 'YYYY-MM-DD HH:MM:SS', or 'YYYY-MM-DD HH:MM:SS ±HHMM'",
        origin.display()
    )
}

/// Front matter `slug` wins; otherwise the path below `posts/` without its
/// extension. `index.md` names its directory. Every segment is slugified.
fn determine_slug(root: &Path, path: &Path, provided: Option<&str>) -> Result<String> {
    let raw = match provided {
        Some(value) => value.to_string(),
        None => {
            let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
            let mut segments = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>();
            if segments.len() > 1 && segments.last().is_some_and(|last| last == "index") {
                segments.pop();
            }
            segments.join("/")
        }
    };

    let candidate = raw
        .split('/')
        .map(slugify)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if candidate.is_empty() {
        bail!("{}: slug cannot be empty", path.display());
    }
    Ok(candidate)
}

fn is_document_file(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            DOCUMENT_EXTENSIONS.iter().any(|candidate| candidate == &ext)
        }
        None => false,
    }
}

fn parse_front_matter(raw: &str) -> Result<(FrontMatter, String)> {
    let mut lines = raw.lines();
    match lines.next() {
        Some(line) if line.trim() == "---" => {}
        _ => bail!("front matter must start with ---"),
    }

    let mut yaml_lines = Vec::new();
    for line in &mut lines {
        if line.trim() == "---" {
            let yaml = yaml_lines.join("\n");
            let front: FrontMatter = if yaml.trim().is_empty() {
                FrontMatter::default()
            } else {
                serde_yaml::from_str(&yaml)?
            };
            let mut body = lines.collect::<Vec<_>>().join("\n");
            if body.starts_with('\n') {
                body.remove(0);
            }
            return Ok((front, body));
        }
        yaml_lines.push(line);
    }

    bail!("front matter not terminated with ---")
}

fn slugify(value: &str) -> String {
    let mut slug = String::new();
    let mut previous_dash = false;

    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            previous_dash = false;
        } else if !previous_dash && !slug.is_empty() {
            slug.push('-');
            previous_dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

/// Accepts a YAML list, a comma separated string, or null (no tags). Numbers
/// and booleans in a list are kept as their YAML spelling; nested lists and
/// mappings are rejected.
fn deserialize_string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let tags = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(value)) => value.split(',').map(str::to_string).collect(),
        Some(Value::Sequence(items)) => {
            let mut tags = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Null => {}
                    Value::String(tag) => tags.push(tag),
                    Value::Number(number) => tags.push(number.to_string()),
                    Value::Bool(flag) => tags.push(flag.to_string()),
                    other => {
                        return Err(D::Error::custom(format!(
                            "tags must be strings, found {other:?}"
                        )));
                    }
                }
            }
            tags
        }
        Some(Value::Number(number)) => vec![number.to_string()],
        Some(other) => {
            return Err(D::Error::custom(format!(
                "tags must be a list or a comma separated string, found {other:?}"
            )));
        }
    };

    Ok(tags
        .into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect())
}

fn mapping_to_json_map(mapping: &Mapping) -> Result<JsonMap<String, JsonValue>> {
    let mut map = JsonMap::new();
    for (key, value) in mapping {
        let key = key
            .as_str()
            .with_context(|| format!("front matter key {key:?} is not a string"))?;
        let json = serde_json::to_value(value)
            .with_context(|| format!("failed to convert front matter value for '{key}'"))?;
        map.insert(key.to_string(), json);
    }
    Ok(map)
}

/// Builds an in-memory document for tests that do not touch the filesystem.
#[cfg(test)]
pub fn test_document(slug: &str, date: &str, tags: &[&str]) -> Document {
    let day = Date::parse(date, format_description!("[year]-[month]-[day]")).unwrap();
    Document {
        title: slug.to_string(),
        slug: slug.to_string(),
        date: PrimitiveDateTime::new(day, Time::MIDNIGHT).assume_utc(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        summary: None,
        series: None,
        layout: Layout::default(),
        draft: false,
        body: String::new(),
        content_path: PathBuf::from(format!("posts/{slug}.md")),
        permalink: format!("/blog/{slug}/"),
        extra: JsonMap::new(),
    }
}
