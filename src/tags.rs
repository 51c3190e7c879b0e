//! Tag slugs and the slug → document-count index that drives tag routes.
//!
//! Index building and route matching both go through [`slug`], so the two
//! always agree on which documents a tag page lists.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::content::Document;

/// Normalises an authored tag into its URL path segment.
///
/// Letters and digits are lower-cased and kept, `_` is kept, runs of
/// whitespace and `-` collapse into a single `-`, and everything else is
/// dropped. Tags made only of punctuation yield an empty slug.
pub fn slug(tag: &str) -> String {
    let mut slug = String::with_capacity(tag.len());
    let mut pending_separator = false;

    // `İ` lowercases to `i` plus a combining dot; filter after lowercasing.
    for ch in tag.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '-' {
            pending_separator = true;
        } else if ch.is_alphanumeric() || ch == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch);
        }
    }

    slug
}

/// Two or more authored spellings that normalise to the same slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCollision {
    pub slug: String,
    pub spellings: Vec<String>,
}

/// Result of comparing a persisted index against a fresh scan.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct IndexDiff {
    pub missing: Vec<String>,
    pub extra: Vec<String>,
    pub changed: Vec<(String, usize, usize)>,
}

impl IndexDiff {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.changed.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIndex {
    counts: BTreeMap<String, usize>,
    spellings: BTreeMap<String, Vec<String>>,
}

impl TagIndex {
    /// Scans every document. A document counts once per slug even when two of
    /// its own tags collide.
    pub fn build(documents: &[Document]) -> Self {
        let mut index = TagIndex::default();

        for document in documents {
            let mut seen = HashSet::new();
            for raw in &document.tags {
                let raw = raw.trim();
                let tag_slug = slug(raw);
                if tag_slug.is_empty() {
                    continue;
                }

                let spellings = index.spellings.entry(tag_slug.clone()).or_default();
                if !spellings.iter().any(|known| known == raw) {
                    spellings.push(raw.to_string());
                }

                if seen.insert(tag_slug.clone()) {
                    *index.counts.entry(tag_slug).or_insert(0) += 1;
                }
            }
        }

        index
    }

    pub fn from_counts(counts: BTreeMap<String, usize>) -> Result<Self> {
        let index = TagIndex {
            counts,
            spellings: BTreeMap::new(),
        };
        index.validate()?;
        Ok(index)
    }

    /// Loads a persisted `tag-data.json`. A missing or malformed file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            bail!(
                "tag index {} does not exist; run `quire render` first",
                path.display()
            );
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read tag index {}", path.display()))?;
        let counts: BTreeMap<String, usize> = serde_json::from_str(&raw)
            .with_context(|| format!("{}: tag index is not a JSON object of counts", path.display()))?;
        Self::from_counts(counts).with_context(|| format!("{}: invalid tag index", path.display()))
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json =
            serde_json::to_string_pretty(&self.counts).context("failed to serialize tag index")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        for (key, count) in &self.counts {
            if key.is_empty() {
                bail!("tag index contains an empty slug");
            }
            if slug(key) != *key {
                bail!("tag index key '{}' is not a normalised slug", key);
            }
            if *count == 0 {
                bail!("tag index lists '{}' with zero documents", key);
            }
        }
        Ok(())
    }

    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    pub fn count(&self, tag_slug: &str) -> Option<usize> {
        self.counts.get(tag_slug).copied()
    }

    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn spellings(&self, tag_slug: &str) -> &[String] {
        self.spellings
            .get(tag_slug)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The first authored spelling of a tag, falling back to the slug itself.
    pub fn display_name<'a>(&'a self, tag_slug: &'a str) -> &'a str {
        self.spellings(tag_slug)
            .first()
            .map(String::as_str)
            .unwrap_or(tag_slug)
    }

    pub fn collisions(&self) -> Vec<TagCollision> {
        self.spellings
            .iter()
            .filter(|(_, spellings)| spellings.len() > 1)
            .map(|(tag_slug, spellings)| TagCollision {
                slug: tag_slug.clone(),
                spellings: spellings.clone(),
            })
            .collect()
    }

    /// Compares `self` (the expected, freshly built index) with `persisted`.
    pub fn diff(&self, persisted: &TagIndex) -> IndexDiff {
        let expected: BTreeSet<&String> = self.counts.keys().collect();
        let found: BTreeSet<&String> = persisted.counts.keys().collect();

        let missing = expected
            .difference(&found)
            .map(|key| (*key).clone())
            .collect();
        let extra = found
            .difference(&expected)
            .map(|key| (*key).clone())
            .collect();
        let changed = expected
            .intersection(&found)
            .filter_map(|key| {
                let want = self.counts[*key];
                let have = persisted.counts[*key];
                (want != have).then(|| ((*key).clone(), want, have))
            })
            .collect();

        IndexDiff {
            missing,
            extra,
            changed,
        }
    }
}
