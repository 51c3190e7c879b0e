//! Static tag routes: which `/tags/<slug>/` pages exist, and what each lists.

use anyhow::{Context, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

use crate::content::Document;
use crate::tags::{TagIndex, slug};

/// Characters that stay literal in a tag path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

/// Route parameters for one tag page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagParam {
    pub tag: String,
}

#[derive(Debug)]
pub struct TagPage<'a> {
    pub slug: String,
    pub title: String,
    pub documents: Vec<&'a Document>,
}

/// One route per index key, in key order. A malformed index is fatal.
pub fn enumerate_static_params(index: &TagIndex) -> Result<Vec<TagParam>> {
    index
        .validate()
        .context("refusing to enumerate tag routes from an invalid index")?;
    Ok(index
        .slugs()
        .map(|tag| TagParam {
            tag: tag.to_string(),
        })
        .collect())
}

/// Documents carrying `target` (in slug form), newest first. Equal dates are
/// ordered by title, then by document slug.
pub fn filter_and_sort<'a>(documents: &'a [Document], target: &str) -> Vec<&'a Document> {
    let mut matching: Vec<&Document> = documents
        .iter()
        .filter(|document| document.tags.iter().any(|tag| slug(tag) == target))
        .collect();
    sort_newest_first(&mut matching);
    matching
}

pub fn sort_newest_first(documents: &mut [&Document]) {
    documents.sort_by(|left, right| {
        right
            .date
            .cmp(&left.date)
            .then_with(|| left.title.cmp(&right.title))
            .then_with(|| left.slug.cmp(&right.slug))
    });
}

/// A slug with no matching documents yields an empty page, not an error.
pub fn render_tag<'a>(documents: &'a [Document], tag_slug: &str) -> TagPage<'a> {
    TagPage {
        slug: tag_slug.to_string(),
        title: tag_title(tag_slug),
        documents: filter_and_sort(documents, tag_slug),
    }
}

/// The slug with its first character upper-cased.
pub fn tag_title(tag_slug: &str) -> String {
    let mut chars = tag_slug.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn tag_url(tag_slug: &str) -> String {
    format!("/tags/{}/", utf8_percent_encode(tag_slug, SEGMENT))
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::content::test_document;

    #[test]
    fn static_params_cover_exactly_the_index_keys() {
        let documents = vec![
            test_document("one", "2023-01-01", &["Bicep", "Azure DevOps"]),
            test_document("two", "2023-02-01", &["azure-devops", "xUnit"]),
            test_document("three", "2023-03-01", &[]),
        ];
        let index = TagIndex::build(&documents);
        let params = enumerate_static_params(&index).unwrap();

        let routed: BTreeSet<&str> = params.iter().map(|param| param.tag.as_str()).collect();
        let indexed: BTreeSet<&str> = index.slugs().collect();
        assert_eq!(routed, indexed);
        assert_eq!(params.len(), index.len());
        assert_eq!(
            params,
            vec![
                TagParam { tag: "azure-devops".into() },
                TagParam { tag: "bicep".into() },
                TagParam { tag: "xunit".into() },
            ]
        );
    }

    #[test]
    fn empty_index_has_no_routes() {
        let params = enumerate_static_params(&TagIndex::default()).unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn bicep_fixture_filters_and_orders_newest_first() {
        let documents = vec![
            test_document("bicep-part-one", "2023-01-01", &["bicep"]),
            test_document("bicep-part-two", "2023-06-01", &["Bicep"]),
            test_document("untagged", "2022-01-01", &[]),
        ];

        let page = render_tag(&documents, "bicep");
        let dates: Vec<String> = page
            .documents
            .iter()
            .map(|doc| doc.date.date().to_string())
            .collect();
        assert_eq!(dates, vec!["2023-06-01", "2023-01-01"]);
        assert_eq!(page.title, "Bicep");
    }

    #[test]
    fn equal_dates_break_ties_by_title_then_slug() {
        let mut zebra = test_document("z", "2023-01-01", &["rust"]);
        zebra.title = "Zebra".into();
        let mut apple_b = test_document("b", "2023-01-01", &["rust"]);
        apple_b.title = "Apple".into();
        let mut apple_a = test_document("a", "2023-01-01", &["rust"]);
        apple_a.title = "Apple".into();
        let documents = vec![zebra, apple_b, apple_a];

        let slugs: Vec<&str> = filter_and_sort(&documents, "rust")
            .iter()
            .map(|doc| doc.slug.as_str())
            .collect();
        assert_eq!(slugs, vec!["a", "b", "z"]);
    }

    #[test]
    fn unknown_slug_renders_an_empty_page() {
        let documents = vec![test_document("one", "2023-01-01", &["bicep"])];
        let page = render_tag(&documents, "terraform");
        assert!(page.documents.is_empty());
        assert_eq!(page.title, "Terraform");
    }

    #[test]
    fn titles_and_urls_from_slugs() {
        assert_eq!(tag_title("azure-devops"), "Azure-devops");
        assert_eq!(tag_title("ünïcödé"), "Ünïcödé");
        assert_eq!(tag_title(""), "");
        assert_eq!(tag_url("azure-devops"), "/tags/azure-devops/");
        assert_eq!(tag_url("snake_case"), "/tags/snake_case/");
        assert_eq!(tag_url("ünï"), "/tags/%C3%BCn%C3%AF/");
    }

    #[test]
    fn invalid_index_is_not_routable() {
        let index = TagIndex::default();
        assert!(enumerate_static_params(&index).is_ok());
        let broken = TagIndex::from_counts(BTreeMap::from([("Bicep".to_string(), 1)]));
        assert!(broken.is_err());
    }
}
