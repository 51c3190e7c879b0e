//! HTML renderers compiled into quire, used by the `builtin` strategy.

use anyhow::{Context, Result, bail};

use super::toc::{TocRange, render_toc};
use super::{ComponentArgs, RenderContext};
use crate::config::SeriesConfig;
use crate::links::render_anchor;
use crate::tags::slug;
use crate::theme_image::ThemeImageState;
use crate::utils::escape_html;

pub(super) fn image(mut args: ComponentArgs) -> Result<String> {
    let src = args.require("src")?;
    let alt = args.take("alt").unwrap_or_default();
    Ok(format!(
        "<img src=\"{}\" alt=\"{}\"{} loading=\"lazy\" decoding=\"async\">",
        escape_html(&src),
        escape_html(&alt),
        args.passthrough()
    ))
}

pub(super) fn theme_image(mut args: ComponentArgs) -> Result<String> {
    let light = args.require("srcLight")?;
    let dark = args.require("srcDark")?;
    let mut state = ThemeImageState::default();
    if let Some(theme) = args.take("theme") {
        state.resolve(Some(&theme));
    }
    Ok(state.markup(&light, &dark, &args.passthrough()))
}

pub(super) fn link(mut args: ComponentArgs, body: &str) -> Result<String> {
    let href = args.take("href").unwrap_or_default();
    Ok(render_anchor(&href, &args.passthrough(), body))
}

pub(super) fn toc_inline(mut args: ComponentArgs, ctx: &RenderContext<'_>) -> Result<String> {
    let range = TocRange::parse(
        args.take("fromHeading").as_deref(),
        args.take("toHeading").as_deref(),
    )?;
    let disclosure = args.flag("asDisclosure")?;
    let list = render_toc(ctx.headings, range, &args.passthrough());

    if disclosure && !list.is_empty() {
        Ok(format!(
            "<details open><summary>Table of Contents</summary>{list}</details>"
        ))
    } else {
        Ok(list)
    }
}

pub(super) fn series_header(mut args: ComponentArgs, ctx: &RenderContext<'_>) -> Result<String> {
    let series = resolve_series(&mut args, ctx)?;

    let mut html = format!("<h2 id=\"series-{}\">Series</h2>\n", slug(&series.title));
    if let Some(description) = series.description.as_deref() {
        html.push_str(&format!("<p>{}</p>\n", escape_html(description)));
    }
    html.push_str(&format!("<ul{}>\n", args.passthrough()));
    for part in &series.parts {
        let title = escape_html(&part.title);
        match part.href.as_deref() {
            Some(href) => {
                html.push_str(&format!("<li>{}</li>\n", render_anchor(href, "", &title)))
            }
            None => html.push_str(&format!("<li>{title}</li>\n")),
        }
    }
    html.push_str("</ul>");
    Ok(html)
}

pub(super) fn series_resources(mut args: ComponentArgs, ctx: &RenderContext<'_>) -> Result<String> {
    let series = resolve_series(&mut args, ctx)?;

    let mut html = format!("<h2 id=\"resources-{}\">Resources</h2>\n", slug(&series.title));
    html.push_str(&format!("<ul{}>\n", args.passthrough()));
    for resource in &series.resources {
        let anchor = render_anchor(&resource.href, "", &escape_html(&resource.title));
        html.push_str(&format!("<li>{anchor}</li>\n"));
    }
    html.push_str("</ul>");
    Ok(html)
}

pub(super) fn newsletter_form(mut args: ComponentArgs, ctx: &RenderContext<'_>) -> Result<String> {
    let action = ctx
        .config
        .newsletter
        .action
        .as_deref()
        .context("newsletter.action is not set in quire.yaml")?;
    let title = args
        .take("title")
        .unwrap_or_else(|| "Subscribe to the newsletter".to_string());
    let label = ctx
        .config
        .newsletter
        .button_label
        .as_deref()
        .unwrap_or("Sign up");

    Ok(format!(
        concat!(
            "<form class=\"newsletter\" action=\"{action}\" method=\"post\"{attrs}>",
            "<p>{title}</p>",
            "<label for=\"newsletter-email\">Email address</label>",
            "<input id=\"newsletter-email\" name=\"email\" type=\"email\" autocomplete=\"email\" required>",
            "<button type=\"submit\">{label}</button>",
            "</form>"
        ),
        action = escape_html(action),
        attrs = args.passthrough(),
        title = escape_html(&title),
        label = escape_html(label),
    ))
}

/// The `series` argument, or the document's own series.
pub(super) fn resolve_series<'a>(
    args: &mut ComponentArgs,
    ctx: &RenderContext<'a>,
) -> Result<&'a SeriesConfig> {
    let key = match args.take("series") {
        Some(key) => key,
        None => match ctx.document.series.as_deref() {
            Some(key) => key.to_string(),
            None => bail!("no `series` argument and the document is not part of a series"),
        },
    };
    ctx.config
        .series(&key)
        .with_context(|| format!("series '{key}' is not defined in quire.yaml"))
}
