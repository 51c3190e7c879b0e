//! Scanner for `{{ Name key="value" /}}` and `{{ Name }}…{{ /Name }}`
//! shortcodes in document bodies.
//!
//! Fenced code blocks and inline code spans are copied verbatim. `\{{` is an
//! escaped literal. Every recognised invocation is cut out of the Markdown and
//! replaced by a fragment token that comrak parses as plain text.

use anyhow::{Result, anyhow, bail};

use super::ComponentKind;
use crate::markdown::fragment_token;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub kind: ComponentKind,
    pub args: Vec<(String, String)>,
    /// Raw Markdown between the opening and closing tag of a block shortcode.
    pub body: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Extracted {
    pub markdown: String,
    pub invocations: Vec<Invocation>,
}

/// Splits `source` into Markdown with fragment tokens plus the invocations they
/// stand for. Unknown component names and malformed shortcodes are errors.
pub fn extract(source: &str) -> Result<Extracted> {
    let mut extracted = Extracted::default();

    for region in split_fences(source) {
        match region {
            Region::Fence(text) => extracted.markdown.push_str(text),
            Region::Text(text) => scan(text, &mut extracted)?,
        }
    }

    Ok(extracted)
}

enum Region<'a> {
    Text(&'a str),
    Fence(&'a str),
}

/// Cuts `source` at fenced code blocks (``` or ~~~, at least three).
fn split_fences(source: &str) -> Vec<Region<'_>> {
    let mut regions = Vec::new();
    let mut region_start = 0;
    let mut fence: Option<(char, usize, usize)> = None;
    let mut offset = 0;

    for line in source.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next();
        let run = match marker {
            Some(ch @ ('`' | '~')) => trimmed.chars().take_while(|c| *c == ch).count(),
            _ => 0,
        };

        match fence {
            None if run >= 3 => {
                if offset > region_start {
                    regions.push(Region::Text(&source[region_start..offset]));
                }
                fence = marker.map(|ch| (ch, run, offset));
            }
            Some((ch, length, start))
                if marker == Some(ch) && run >= length && trimmed[run..].trim().is_empty() =>
            {
                let end = offset + line.len();
                regions.push(Region::Fence(&source[start..end]));
                region_start = end;
                fence = None;
            }
            _ => {}
        }
        offset += line.len();
    }

    match fence {
        // An unterminated fence runs to the end of the document.
        Some((_, _, start)) => regions.push(Region::Fence(&source[start..])),
        None if region_start < source.len() => regions.push(Region::Text(&source[region_start..])),
        None => {}
    }
    regions
}

fn scan(text: &str, extracted: &mut Extracted) -> Result<()> {
    let mut rest = text;

    while let Some(start) = rest.find(['{', '`', '\\']) {
        let (before, tail) = rest.split_at(start);
        extracted.markdown.push_str(before);

        if tail.starts_with("\\{{") {
            extracted.markdown.push_str(OPEN);
            rest = &tail[3..];
            continue;
        }

        if tail.starts_with('`') {
            let span = code_span_len(tail);
            extracted.markdown.push_str(&tail[..span]);
            rest = &tail[span..];
            continue;
        }

        if !tail.starts_with(OPEN) {
            let width = tail.chars().next().map_or(1, char::len_utf8);
            extracted.markdown.push_str(&tail[..width]);
            rest = &tail[width..];
            continue;
        }

        let remaining = &tail[OPEN.len()..];
        let Some(tag_end) = remaining.find(CLOSE) else {
            extracted.markdown.push_str(OPEN);
            rest = remaining;
            continue;
        };

        let tag = remaining[..tag_end].trim();
        let self_closing = tag.ends_with('/');
        let tag = tag.trim_end_matches('/').trim();
        let (name, arg_text) = tag
            .split_once(char::is_whitespace)
            .map_or((tag, ""), |(name, args)| (name, args.trim()));

        if let Some(closing) = name.strip_prefix('/')
            && is_valid_name(closing)
        {
            bail!("closing tag {{{{ /{closing} }}}} has no matching opening tag");
        }

        if !is_valid_name(name) {
            extracted.markdown.push_str(OPEN);
            rest = remaining;
            continue;
        }

        let kind = ComponentKind::from_name(name).ok_or_else(|| {
            anyhow!(
                "unknown component '{name}' (available: {})",
                ComponentKind::ALL
                    .iter()
                    .map(|kind| kind.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;
        let args = parse_args(arg_text).map_err(|error| anyhow!("component {name}: {error}"))?;
        let after_tag = &remaining[tag_end + CLOSE.len()..];

        let (body, after) = if self_closing {
            (None, after_tag)
        } else {
            let (body, after) = split_block(name, after_tag)?;
            (Some(body.to_string()), after)
        };

        extracted.markdown.push_str(&fragment_token(extracted.invocations.len()));
        extracted.invocations.push(Invocation { kind, args, body });
        rest = after;
    }

    extracted.markdown.push_str(rest);
    Ok(())
}

/// Returns the body of a block shortcode and the text after its closing tag.
fn split_block<'a>(name: &str, after_tag: &'a str) -> Result<(&'a str, &'a str)> {
    let compact = format!("{{{{/{name}}}}}");
    let spaced = format!("{{{{ /{name} }}}}");

    let found = [compact, spaced]
        .into_iter()
        .filter_map(|close| after_tag.find(&close).map(|pos| (pos, close.len())))
        .min_by_key(|(pos, _)| *pos);

    match found {
        Some((pos, len)) => Ok((&after_tag[..pos], &after_tag[pos + len..])),
        None => bail!(
            "block component '{name}' is missing its closing tag; use {{{{ {name} /}}}} for self-closing"
        ),
    }
}

/// Length of the inline code span starting at `text`, or of the bare
/// backtick run when it has no closing run.
fn code_span_len(text: &str) -> usize {
    let ticks = text.chars().take_while(|ch| *ch == '`').count();
    let fence = &text[..ticks];
    let mut search = ticks;

    while let Some(found) = text[search..].find(fence) {
        let position = search + found;
        let run = text[position..].chars().take_while(|ch| *ch == '`').count();
        if run == ticks {
            return position + ticks;
        }
        search = position + run;
    }
    ticks
}

/// Valid component name: `[A-Za-z_][A-Za-z0-9_]+`
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    name.len() >= 2 && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn is_valid_key(key: &str) -> bool {
    key.chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic())
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':'))
}

/// Parses `key="value" other='x' flag` in authored order. A bare key means
/// `"true"`.
fn parse_args(input: &str) -> Result<Vec<(String, String)>, String> {
    let mut args: Vec<(String, String)> = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(ch) = chars.next_if(|ch| !ch.is_whitespace() && *ch != '=') {
            key.push(ch);
        }
        if !is_valid_key(&key) {
            return Err(format!("invalid argument name '{key}'"));
        }

        let value = if chars.next_if_eq(&'=').is_some() {
            match chars.next() {
                Some(quote @ ('"' | '\'')) => {
                    let mut value = String::new();
                    loop {
                        match chars.next() {
                            Some('\\') => match chars.next() {
                                Some(escaped @ ('"' | '\'' | '\\')) => value.push(escaped),
                                Some(other) => {
                                    value.push('\\');
                                    value.push(other);
                                }
                                None => {
                                    return Err(format!("unterminated value for '{key}'"));
                                }
                            },
                            Some(ch) if ch == quote => break,
                            Some(ch) => value.push(ch),
                            None => return Err(format!("unterminated value for '{key}'")),
                        }
                    }
                    value
                }
                Some(ch) if !ch.is_whitespace() => {
                    let mut value = ch.to_string();
                    while let Some(ch) = chars.next_if(|ch| !ch.is_whitespace()) {
                        value.push(ch);
                    }
                    value
                }
                _ => return Err(format!("missing value for '{key}'")),
            }
        } else {
            "true".to_string()
        };

        if args.iter().any(|(existing, _)| *existing == key) {
            return Err(format!("argument '{key}' given more than once"));
        }
        args.push((key, value));
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn self_closing_invocation_becomes_a_token() {
        let extracted =
            extract("Intro\n\n{{ Image src=\"/a.png\" alt='A chart' width=600 /}}\n\nOutro").unwrap();
        assert_eq!(
            extracted.markdown,
            format!("Intro\n\n{}\n\nOutro", fragment_token(0))
        );
        assert_eq!(extracted.invocations.len(), 1);
        let invocation = &extracted.invocations[0];
        assert_eq!(invocation.kind, ComponentKind::Image);
        assert_eq!(
            invocation.args,
            pairs(&[("src", "/a.png"), ("alt", "A chart"), ("width", "600")])
        );
        assert!(invocation.body.is_none());
    }

    #[test]
    fn block_invocation_captures_body() {
        let extracted =
            extract("See {{ Link href=\"/blog/x\" }}the **next** part{{ /Link }} now.").unwrap();
        assert_eq!(extracted.markdown, format!("See {} now.", fragment_token(0)));
        assert_eq!(
            extracted.invocations[0].body.as_deref(),
            Some("the **next** part")
        );

        let compact = extract("{{ Link href=\"#a\" }}x{{/Link}}").unwrap();
        assert_eq!(compact.invocations[0].body.as_deref(), Some("x"));
    }

    #[test]
    fn unknown_component_is_an_error() {
        let error = extract("{{ Chart data=\"x\" /}}").unwrap_err();
        let message = error.to_string();
        assert!(message.contains("unknown component 'Chart'"), "{message}");
        assert!(message.contains("TOCInline"), "{message}");
    }

    #[test]
    fn malformed_shortcodes_are_errors() {
        assert!(extract("{{ Link href=\"/x\" }}never closed").is_err());
        assert!(extract("{{ Image src=\"/a.png /}}").is_err());
        assert!(extract("{{ Image src= /}}").is_err());
        assert!(extract("{{ Image src=\"a\" src=\"b\" /}}").is_err());
        assert!(extract("stray {{ /Link }}").is_err());
    }

    #[test]
    fn escaped_and_invalid_names_stay_literal() {
        let extracted = extract("\\{{ Image /}} and {{ 1 }} and {{ }}").unwrap();
        assert_eq!(extracted.markdown, "{{ Image /}} and {{ 1 }} and {{ }}");
        assert!(extracted.invocations.is_empty());
    }

    #[test]
    fn code_is_never_scanned() {
        let source = "Use `{{ Chart /}}` inline.\n\n```jinja\n{{ Chart /}}\n```\n\n{{ TOCInline /}}\n";
        let extracted = extract(source).unwrap();
        assert_eq!(extracted.invocations.len(), 1);
        assert_eq!(extracted.invocations[0].kind, ComponentKind::TocInline);
        assert!(extracted.markdown.contains("`{{ Chart /}}`"));
        assert!(extracted.markdown.contains("```jinja\n{{ Chart /}}\n```\n"));
    }

    #[test]
    fn bare_keys_default_to_true() {
        let extracted = extract("{{ TOCInline asDisclosure toHeading=2 /}}").unwrap();
        assert_eq!(
            extracted.invocations[0].args,
            pairs(&[("asDisclosure", "true"), ("toHeading", "2")])
        );
    }

    #[test]
    fn tokens_are_numbered_in_order() {
        let extracted = extract("{{ SeriesHeader /}}\n\ntext\n\n{{ SeriesResources /}}").unwrap();
        assert_eq!(
            extracted.markdown,
            format!("{}\n\ntext\n\n{}", fragment_token(0), fragment_token(1))
        );
    }
}
