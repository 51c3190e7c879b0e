use anyhow::{Result, bail};

use crate::links::render_anchor;
use crate::markdown::Heading;
use crate::utils::escape_html;

const DEFAULT_FROM: u8 = 2;
const DEFAULT_TO: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocRange {
    pub from: u8,
    pub to: u8,
}

impl Default for TocRange {
    fn default() -> Self {
        Self {
            from: DEFAULT_FROM,
            to: DEFAULT_TO,
        }
    }
}

impl TocRange {
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self> {
        let from = parse_level("fromHeading", from, DEFAULT_FROM)?;
        let to = parse_level("toHeading", to, DEFAULT_TO.max(from))?;
        if from > to {
            bail!("fromHeading ({from}) must not be greater than toHeading ({to})");
        }
        Ok(Self { from, to })
    }

    fn contains(self, level: u8) -> bool {
        (self.from..=self.to).contains(&level)
    }
}

fn parse_level(name: &str, value: Option<&str>, default: u8) -> Result<u8> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().parse::<u8>() {
        Ok(level @ 1..=6) => Ok(level),
        _ => bail!("{name} must be a heading level between 1 and 6, got '{value}'"),
    }
}

/// Nested `<ul>` of the headings inside `range`. Deeper levels nest under
/// the closest shallower heading; gaps in levels do not add empty lists.
pub fn render_toc(headings: &[Heading], range: TocRange, attrs: &str) -> String {
    let selected: Vec<&Heading> = headings
        .iter()
        .filter(|heading| range.contains(heading.level))
        .collect();
    if selected.is_empty() {
        return String::new();
    }

    let mut html = format!("<ul class=\"toc\"{attrs}>");
    let mut stack: Vec<u8> = vec![selected[0].level];

    for (position, heading) in selected.iter().enumerate() {
        if position > 0 {
            let current = stack.last().copied().unwrap_or(heading.level);
            if heading.level > current {
                html.push_str("<ul>");
                stack.push(heading.level);
            } else {
                html.push_str("</li>");
                while stack.len() > 1 && stack.last().is_some_and(|level| *level > heading.level) {
                    stack.pop();
                    html.push_str("</ul></li>");
                }
            }
        }
        html.push_str("<li>");
        html.push_str(&render_anchor(
            &format!("#{}", heading.id),
            "",
            &escape_html(&heading.text),
        ));
    }

    html.push_str("</li>");
    for _ in 1..stack.len() {
        html.push_str("</ul></li>");
    }
    html.push_str("</ul>");
    html
}
