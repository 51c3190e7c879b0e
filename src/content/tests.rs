use super::*;
use crate::config::Config;
use tempfile::TempDir;
use time::UtcOffset;

fn write_post(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn discover_single_markdown_document() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(
        &root,
        "hello-world.md",
        "---\ntitle: Hello\ndate: 2024-02-01T12:00:00Z\ntags: [rust]\n---\nBody",
    );

    let documents = discover_documents(&root, &Config::default()).unwrap();
    assert_eq!(documents.len(), 1);
    let document = &documents[0];
    assert_eq!(document.slug, "hello-world");
    assert_eq!(document.title, "Hello");
    assert_eq!(document.tags, vec!["rust".to_string()]);
    assert_eq!(document.permalink, "/blog/hello-world/");
    assert_eq!(document.body, "Body");
    assert_eq!(document.layout, Layout::PostLayout);
}

#[test]
fn nested_paths_become_nested_slugs() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(
        &root,
        "Bicep/Part One.mdx",
        "---\ntitle: Bicep 1\ndate: 2023-01-01\n---\n",
    );
    write_post(
        &root,
        "modular-monolith/a-gentle-introduction/index.md",
        "---\ntitle: Modular Monoliths\ndate: 2023-02-01\n---\n",
    );

    let documents = discover_documents(&root, &Config::default()).unwrap();
    let slugs: Vec<&str> = documents.iter().map(|doc| doc.slug.as_str()).collect();
    assert_eq!(slugs, vec!["bicep/part-one", "modular-monolith/a-gentle-introduction"]);
    assert_eq!(documents[0].permalink, "/blog/bicep/part-one/");
}

#[test]
fn prefer_slug_from_front_matter() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(
        &root,
        "draft-name.md",
        "---\ntitle: T\ndate: 2024-03-04T00:00:00Z\nslug: Custom Slug\n---\n",
    );

    let documents = discover_documents(&root, &Config::default()).unwrap();
    assert_eq!(documents[0].slug, "custom-slug");
}

#[test]
fn reject_duplicate_slugs() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(&root, "a.md", "---\ntitle: A\ndate: 2024-01-01\nslug: same\n---\n");
    write_post(&root, "b.md", "---\ntitle: B\ndate: 2024-01-02\nslug: same\n---\n");

    let error = discover_documents(&root, &Config::default()).unwrap_err();
    assert!(format!("{error}").contains("both resolve to slug 'same'"));
}

#[test]
fn reject_missing_front_matter() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(&root, "loose.md", "no front matter");

    let error = discover_documents(&root, &Config::default()).unwrap_err();
    assert!(format!("{error}").contains("front matter"));
}

#[test]
fn reject_missing_title() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(&root, "untitled.md", "---\ndate: 2024-01-01\n---\nBody");

    let error = discover_documents(&root, &Config::default()).unwrap_err();
    assert!(format!("{error}").contains("title is required"));
}

#[test]
fn null_and_empty_tags_mean_no_tags() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(&root, "null.md", "---\ntitle: N\ndate: 2024-01-01\ntags:\n---\n");
    write_post(&root, "empty.md", "---\ntitle: E\ndate: 2024-01-02\ntags: []\n---\n");
    write_post(
        &root,
        "blank.md",
        "---\ntitle: B\ndate: 2024-01-03\ntags: [\"\", \"  \"]\n---\n",
    );
    write_post(&root, "absent.md", "---\ntitle: A\ndate: 2024-01-04\n---\n");

    let documents = discover_documents(&root, &Config::default()).unwrap();
    assert_eq!(documents.len(), 4);
    assert!(documents.iter().all(|doc| doc.tags.is_empty()));
}

#[test]
fn parse_comma_separated_tags() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(
        &root,
        "list.md",
        "---\ntitle: L\ndate: 2024-01-01\ntags: azure, bicep , devops\n---\n",
    );

    let documents = discover_documents(&root, &Config::default()).unwrap();
    assert_eq!(documents[0].tags, vec!["azure", "bicep", "devops"]);
}

#[test]
fn scalar_tags_in_a_list_are_kept() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(
        &root,
        "year.md",
        "---\ntitle: Y\ndate: 2024-01-01\ntags: [2023, rust, ~, true]\n---\n",
    );

    let documents = discover_documents(&root, &Config::default()).unwrap();
    assert_eq!(documents[0].tags, vec!["2023", "rust", "true"]);
}

#[test]
fn nested_tag_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(
        &root,
        "nested.md",
        "---\ntitle: N\ndate: 2024-01-01\ntags: [rust, {name: azure}]\n---\n",
    );

    let error = discover_documents(&root, &Config::default()).unwrap_err();
    let message = format!("{error:#}");
    assert!(message.contains("nested.md"), "{message}");
    assert!(message.contains("tags must be strings"), "{message}");
}

#[test]
fn layouts_are_a_closed_set() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(
        &root,
        "banner.md",
        "---\ntitle: B\ndate: 2024-01-01\nlayout: PostBanner\n---\n",
    );
    let documents = discover_documents(&root, &Config::default()).unwrap();
    assert_eq!(documents[0].layout, Layout::PostBanner);
    assert_eq!(
        documents[0].layout.template_name(),
        "layouts/post_banner.html"
    );

    write_post(
        &root,
        "mystery.md",
        "---\ntitle: M\ndate: 2024-01-02\nlayout: ../../etc/passwd\n---\n",
    );
    let error = discover_documents(&root, &Config::default()).unwrap_err();
    assert!(format!("{error}").contains("invalid front matter"));
}

#[test]
fn drafts_are_skipped() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(&root, "wip.md", "---\ntitle: W\ndate: 2024-01-01\ndraft: true\n---\n");
    write_post(&root, "live.md", "---\ntitle: L\ndate: 2024-01-01\n---\n");

    let documents = discover_documents(&root, &Config::default()).unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].slug, "live");
}

#[test]
fn retains_series_summary_and_extras() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(
        &root,
        "bicep/part-two.md",
        "---\ntitle: Part Two\ndate: 2023-06-01\nseries: bicep\nsummary: Advanced concepts\nimages:\n  - /static/images/bicep.png\n---\n",
    );

    let documents = discover_documents(&root, &Config::default()).unwrap();
    let document = &documents[0];
    assert_eq!(document.series.as_deref(), Some("bicep"));
    assert_eq!(document.summary.as_deref(), Some("Advanced concepts"));
    assert_eq!(
        document.extra.get("images"),
        Some(&JsonValue::Array(vec![JsonValue::String(
            "/static/images/bicep.png".into()
        )]))
    );
}

#[test]
fn accepts_date_only_values_in_default_timezone() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(&root, "day.md", "---\ntitle: D\ndate: 2023-01-01\n---\n");

    let config = Config {
        default_timezone: "+02:00".to_string(),
        ..Default::default()
    };
    let documents = discover_documents(&root, &config).unwrap();
    let date = documents[0].date;
    assert_eq!(date.offset(), UtcOffset::from_hms(2, 0, 0).unwrap());
    assert_eq!(date.hour(), 0);
    assert_eq!(date.day(), 1);
}

#[test]
fn accepts_datetime_with_numeric_offset() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(
        &root,
        "offset.md",
        "---\ntitle: O\ndate: 2013-01-18 00:25:24 +0200\n---\n",
    );

    let documents = discover_documents(&root, &Config::default()).unwrap();
    assert_eq!(
        documents[0].date.offset(),
        UtcOffset::from_hms(2, 0, 0).unwrap()
    );
}

#[test]
fn documents_are_sorted_oldest_first() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("posts");
    write_post(&root, "b.md", "---\ntitle: B\ndate: 2023-06-01\n---\n");
    write_post(&root, "a.md", "---\ntitle: A\ndate: 2023-06-01\n---\n");
    write_post(&root, "c.md", "---\ntitle: C\ndate: 2022-01-01\n---\n");

    let documents = discover_documents(&root, &Config::default()).unwrap();
    let slugs: Vec<&str> = documents.iter().map(|doc| doc.slug.as_str()).collect();
    assert_eq!(slugs, vec!["c", "a", "b"]);
}

#[test]
fn slugify_directory_name() {
    assert_eq!(slugify("Hello World"), "hello-world");
    assert_eq!(slugify("  Multi   Spaces  "), "multi-spaces");
}
