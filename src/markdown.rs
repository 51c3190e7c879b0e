use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result, bail};
use comrak::adapters::{HeadingAdapter, HeadingMeta};
use comrak::html::{escape, escape_href};
use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue, Sourcepos};
use comrak::options::Plugins;
use comrak::{Arena, Options, format_html_with_plugins, parse_document};
use serde::Serialize;

use crate::links::classify;

const EXCERPT_LIMIT: usize = 280;

const TOKEN_OPEN: char = '\u{E000}';
const TOKEN_CLOSE: char = '\u{E001}';

const COPY_BUTTON: &str = "<div class=\"code-block\">\n<button type=\"button\" class=\"copy-code\" aria-label=\"Copy code\">Copy</button>";

pub struct MarkdownRender {
    pub html: String,
    pub excerpt: String,
    pub headings: Vec<Heading>,
}

/// A Markdown heading with the id written onto its `<hN>` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub id: String,
}

/// Rendered HTML standing in for one fragment token. Block fragments that
/// sit in a paragraph split it instead of nesting inside `<p>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub html: String,
    pub block: bool,
}

/// Plain-text marker for fragment `index`. Comrak keeps it inside a text
/// node, so the surrounding line is still parsed as Markdown.
pub fn fragment_token(index: usize) -> String {
    format!("{TOKEN_OPEN}{index}{TOKEN_CLOSE}")
}

/// Renders `markdown`. `fragments` receives the document headings and
/// returns the HTML for every fragment token, in token order. Each token must
/// land in the output exactly once.
pub fn render_markdown<F>(markdown: &str, fragments: F) -> Result<MarkdownRender>
where
    F: FnOnce(&[Heading]) -> Result<Vec<Fragment>>,
{
    let options = options();
    let arena = Arena::new();
    let root = parse_document(&arena, markdown, &options);

    let headings = collect_headings(root);
    let fragments = fragments(&headings)?;
    place_fragments(&arena, root, &fragments)?;

    let excerpt = extract_excerpt(root, EXCERPT_LIMIT);
    classify_links(&arena, root).context("failed to render link")?;
    wrap_code_blocks(&arena, root);

    let ids = HeadingIds {
        headings: &headings,
        next: AtomicUsize::new(0),
    };
    let mut plugins = Plugins::default();
    plugins.render.heading_adapter = Some(&ids);

    let mut html = String::new();
    format_html_with_plugins(root, &options, &mut html, &plugins)
        .context("failed to render Markdown")?;

    Ok(MarkdownRender {
        html,
        excerpt,
        headings,
    })
}

fn options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.strikethrough = true;
    options.extension.footnotes = true;
    options.extension.alerts = true;
    options.render.hardbreaks = false;
    options.render.github_pre_lang = true;
    options.render.r#unsafe = true;
    options.render.figure_with_caption = true;
    options.render.width = 0;
    options
}

fn extract_excerpt<'a>(root: &'a AstNode<'a>, limit: usize) -> String {
    if let Some(paragraph) = root
        .children()
        .find(|node| matches!(node.data.borrow().value, NodeValue::Paragraph))
    {
        return truncate(&collect_text(paragraph), limit);
    }

    truncate(&collect_text(root), limit)
}

fn collect_headings<'a>(root: &'a AstNode<'a>) -> Vec<Heading> {
    let mut used: HashMap<String, usize> = HashMap::new();
    let mut headings = Vec::new();

    for node in root.descendants() {
        let level = match &node.data.borrow().value {
            NodeValue::Heading(heading) => heading.level,
            _ => continue,
        };
        let text = collect_text(node);
        let id = unique_anchor(&anchor_base(&text), &mut used);
        headings.push(Heading { level, text, id });
    }

    headings
}

/// GitHub style: lower-case, drop punctuation, spaces become `-`.
fn anchor_base(text: &str) -> String {
    let base: String = text
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|ch| {
            if ch.is_alphanumeric() || ch == '-' || ch == '_' {
                Some(ch)
            } else if ch == ' ' {
                Some('-')
            } else {
                None
            }
        })
        .collect();
    if base.is_empty() {
        "section".to_string()
    } else {
        base
    }
}

fn unique_anchor(base: &str, used: &mut HashMap<String, usize>) -> String {
    let mut candidate = base.to_string();
    while let Some(count) = used.get_mut(&candidate).map(|count| {
        *count += 1;
        *count
    }) {
        candidate = format!("{base}-{}", count - 1);
    }
    used.insert(candidate.clone(), 0);
    candidate
}

/// Writes the precomputed ids onto Markdown headings. Comrak calls it once
/// per heading node in document order, the same order `collect_headings`
/// walks. Raw HTML headings never reach it.
struct HeadingIds<'h> {
    headings: &'h [Heading],
    next: AtomicUsize,
}

impl HeadingAdapter for HeadingIds<'_> {
    fn enter(
        &self,
        output: &mut dyn fmt::Write,
        heading: &HeadingMeta,
        _sourcepos: Option<Sourcepos>,
    ) -> fmt::Result {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        match self.headings.get(index) {
            Some(known) => write!(output, "<h{} id=\"{}\">", heading.level, known.id),
            None => write!(output, "<h{}>", heading.level),
        }
    }

    fn exit(&self, output: &mut dyn fmt::Write, heading: &HeadingMeta) -> fmt::Result {
        writeln!(output, "</h{}>", heading.level)
    }
}

/// Finds the first well-formed token in `text`.
fn split_token(text: &str) -> Option<(&str, usize, &str)> {
    let mut offset = 0;
    while let Some(found) = text[offset..].find(TOKEN_OPEN) {
        let start = offset + found;
        let digits = start + TOKEN_OPEN.len_utf8();
        if let Some(length) = text[digits..].find(TOKEN_CLOSE)
            && let Ok(index) = text[digits..digits + length].parse::<usize>()
        {
            let after = digits + length + TOKEN_CLOSE.len_utf8();
            return Some((&text[..start], index, &text[after..]));
        }
        offset = digits;
    }
    None
}

fn new_node<'a>(arena: &'a Arena<AstNode<'a>>, value: NodeValue) -> &'a AstNode<'a> {
    arena.alloc(value.into())
}

fn html_block<'a>(arena: &'a Arena<AstNode<'a>>, literal: String) -> &'a AstNode<'a> {
    new_node(
        arena,
        NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 6,
            literal,
        }),
    )
}

fn place_fragments<'a>(
    arena: &'a Arena<AstNode<'a>>,
    root: &'a AstNode<'a>,
    fragments: &[Fragment],
) -> Result<()> {
    let mut placed = vec![0usize; fragments.len()];
    let mut pending: Vec<&'a AstNode<'a>> = root
        .descendants()
        .filter(|node| {
            matches!(
                node.data.borrow().value,
                NodeValue::Text(_) | NodeValue::HtmlInline(_) | NodeValue::HtmlBlock(_)
            )
        })
        .collect();

    while let Some(node) = pending.pop() {
        let split = {
            let mut data = node.data.borrow_mut();
            match &mut data.value {
                NodeValue::HtmlInline(literal) => {
                    *literal = replace_tokens(literal, fragments, &mut placed)?;
                    None
                }
                NodeValue::HtmlBlock(block) => {
                    block.literal = replace_tokens(&block.literal, fragments, &mut placed)?;
                    None
                }
                NodeValue::Text(literal) => match split_token(literal) {
                    Some((before, index, after)) => {
                        let (before, after) = (before.to_string(), after.to_string());
                        *literal = before.into();
                        Some((index, after))
                    }
                    None => None,
                },
                _ => None,
            }
        };
        let Some((index, after)) = split else {
            continue;
        };

        let fragment = lookup(fragments, index, &mut placed)?;
        let rest = new_node(arena, NodeValue::Text(after.into()));
        node.insert_after(rest);
        let paragraph = node
            .parent()
            .filter(|parent| matches!(parent.data.borrow().value, NodeValue::Paragraph));
        match paragraph {
            Some(paragraph) if fragment.block => {
                split_paragraph(arena, paragraph, node, &fragment.html);
            }
            _ => {
                node.insert_after(new_node(arena, NodeValue::HtmlInline(fragment.html.clone())));
            }
        }
        pending.push(rest);
    }

    for (index, count) in placed.into_iter().enumerate() {
        match count {
            1 => {}
            0 => bail!(
                "component {index} could not be placed; components are not rendered inside indented code blocks or link targets"
            ),
            _ => bail!("component {index} was placed {count} times"),
        }
    }
    Ok(())
}

fn lookup<'f>(fragments: &'f [Fragment], index: usize, placed: &mut [usize]) -> Result<&'f Fragment> {
    let fragment = fragments
        .get(index)
        .with_context(|| format!("no component is registered for marker {index}"))?;
    placed[index] += 1;
    Ok(fragment)
}

fn replace_tokens(literal: &str, fragments: &[Fragment], placed: &mut [usize]) -> Result<String> {
    let mut output = String::with_capacity(literal.len());
    let mut rest = literal;
    while let Some((before, index, after)) = split_token(rest) {
        output.push_str(before);
        output.push_str(&lookup(fragments, index, placed)?.html);
        rest = after;
    }
    output.push_str(rest);
    Ok(output)
}

/// Moves everything after `node` into a new paragraph and puts `html`
/// between the two halves. Halves left with only whitespace are removed.
fn split_paragraph<'a>(
    arena: &'a Arena<AstNode<'a>>,
    paragraph: &'a AstNode<'a>,
    node: &'a AstNode<'a>,
    html: &str,
) {
    let block = html_block(arena, html.to_string());
    let tail = new_node(arena, NodeValue::Paragraph);
    while let Some(next) = node.next_sibling() {
        next.detach();
        tail.append(next);
    }
    paragraph.insert_after(block);
    block.insert_after(tail);
    trim_paragraph(paragraph);
    trim_paragraph(tail);
}

fn trim_paragraph<'a>(paragraph: &'a AstNode<'a>) {
    while let Some(last) = paragraph.last_child().filter(|child| is_blank(child)) {
        last.detach();
    }
    while let Some(first) = paragraph.first_child().filter(|child| is_blank(child)) {
        first.detach();
    }
    if paragraph.first_child().is_none() {
        paragraph.detach();
        return;
    }
    if let Some(first) = paragraph.first_child()
        && let NodeValue::Text(literal) = &mut first.data.borrow_mut().value
    {
        *literal = literal.trim_start().to_string().into();
    }
    if let Some(last) = paragraph.last_child()
        && let NodeValue::Text(literal) = &mut last.data.borrow_mut().value
    {
        *literal = literal.trim_end().to_string().into();
    }
}

fn is_blank<'a>(node: &'a AstNode<'a>) -> bool {
    match &node.data.borrow().value {
        NodeValue::Text(literal) => literal.trim().is_empty(),
        NodeValue::SoftBreak | NodeValue::LineBreak => true,
        _ => false,
    }
}

/// Swaps each Markdown link for raw `<a>` markup carrying its link-kind
/// attributes. Authored HTML anchors are left as written.
fn classify_links<'a>(arena: &'a Arena<AstNode<'a>>, root: &'a AstNode<'a>) -> fmt::Result {
    let links: Vec<&'a AstNode<'a>> = root
        .descendants()
        .filter(|node| matches!(node.data.borrow().value, NodeValue::Link(_)))
        .collect();

    for link in links {
        let (url, title) = match &link.data.borrow().value {
            NodeValue::Link(target) => (target.url.clone(), target.title.clone()),
            _ => continue,
        };

        let mut open = String::from("<a href=\"");
        escape_href(&mut open, &url, false)?;
        open.push('"');
        if !title.is_empty() {
            open.push_str(" title=\"");
            escape(&mut open, &title)?;
            open.push('"');
        }
        open.push_str(classify(&url).attributes());
        open.push('>');

        link.insert_before(new_node(arena, NodeValue::HtmlInline(open)));
        while let Some(child) = link.first_child() {
            child.detach();
            link.insert_before(child);
        }
        link.insert_before(new_node(arena, NodeValue::HtmlInline("</a>".to_string())));
        link.detach();
    }
    Ok(())
}

/// Wraps every code block with a copy button that `copy-code.js` wires up.
fn wrap_code_blocks<'a>(arena: &'a Arena<AstNode<'a>>, root: &'a AstNode<'a>) {
    let blocks: Vec<&'a AstNode<'a>> = root
        .descendants()
        .filter(|node| matches!(node.data.borrow().value, NodeValue::CodeBlock(_)))
        .collect();

    for block in blocks {
        block.insert_before(html_block(arena, COPY_BUTTON.to_string()));
        block.insert_after(html_block(arena, "</div>".to_string()));
    }
}

fn collect_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    collect(node, &mut text);
    text.trim().to_string()
}

fn collect<'a>(node: &'a AstNode<'a>, buf: &mut String) {
    use NodeValue::*;
    let value = node.data.borrow();
    match &value.value {
        Text(literal) => push_visible(buf, literal),
        Code(code) => buf.push_str(&code.literal),
        SoftBreak | LineBreak => buf.push(' '),
        CodeBlock(code) => {
            buf.push_str(&code.literal);
            buf.push(' ');
        }
        _ => {
            for child in node.children() {
                collect(child, buf);
            }
        }
    }
}

/// Appends `text` without fragment tokens.
fn push_visible(buf: &mut String, text: &str) {
    let mut rest = text;
    while let Some((before, _, after)) = split_token(rest) {
        buf.push_str(before);
        rest = after;
    }
    buf.push_str(rest);
}

fn truncate(text: &str, limit: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    let total = text.chars().count();
    let mut result: String = text.chars().take(limit).collect();
    if total > limit {
        result.push_str("...");
    }
    result.trim().to_string()
}
