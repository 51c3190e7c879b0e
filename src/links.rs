//! Classifies hyperlink targets and renders anchors with the matching attributes.

use crate::utils::escape_html;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Site-relative path, eligible for client-side navigation.
    Internal,
    /// Fragment jump within the current page.
    Anchor,
    /// Anything else. Opens in a new context without an opener reference.
    External,
}

impl LinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkKind::Internal => "internal",
            LinkKind::Anchor => "anchor",
            LinkKind::External => "external",
        }
    }

    /// Attributes appended after `href` for this kind, with a leading space.
    pub fn attributes(self) -> &'static str {
        match self {
            LinkKind::Internal => r#" data-link="internal""#,
            LinkKind::Anchor => "",
            LinkKind::External => r#" target="_blank" rel="noopener noreferrer""#,
        }
    }
}

pub fn classify(href: &str) -> LinkKind {
    if href.starts_with("//") {
        LinkKind::External
    } else if href.starts_with('/') {
        LinkKind::Internal
    } else if href.starts_with('#') {
        LinkKind::Anchor
    } else {
        LinkKind::External
    }
}

/// Renders `<a>` for `href`. `extra` holds already-escaped attributes with a
/// leading space; `body` is inserted as HTML.
pub fn render_anchor(href: &str, extra: &str, body: &str) -> String {
    let kind = classify(href);
    format!(
        "<a href=\"{}\"{}{}>{}</a>",
        escape_html(href),
        kind.attributes(),
        extra,
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_representative_targets() {
        assert_eq!(classify("/blog/foo"), LinkKind::Internal);
        assert_eq!(classify("/"), LinkKind::Internal);
        assert_eq!(classify("#section"), LinkKind::Anchor);
        assert_eq!(classify("#"), LinkKind::Anchor);
        assert_eq!(classify("https://example.com"), LinkKind::External);
        assert_eq!(classify("mailto:someone@example.com"), LinkKind::External);
        assert_eq!(classify("blog/bicep - part - one"), LinkKind::External);
        assert_eq!(classify("//cdn.example.com/x.js"), LinkKind::External);
    }

    #[test]
    fn empty_href_defaults_to_external() {
        assert_eq!(classify(""), LinkKind::External);
        let anchor = render_anchor("", "", "nowhere");
        assert!(anchor.contains(r#"rel="noopener noreferrer""#), "{anchor}");
    }

    #[test]
    fn render_anchor_per_kind() {
        assert_eq!(
            render_anchor("/blog/foo", "", "Foo"),
            r#"<a href="/blog/foo" data-link="internal">Foo</a>"#
        );
        assert_eq!(
            render_anchor("#intro", r#" class="toc""#, "Intro"),
            r##"<a href="#intro" class="toc">Intro</a>"##
        );
        assert_eq!(
            render_anchor("https://github.com/Azure/bicep", "", "Bicep Repo"),
            r#"<a href="https://github.com/Azure/bicep" target="_blank" rel="noopener noreferrer">Bicep Repo</a>"#
        );
    }
}
