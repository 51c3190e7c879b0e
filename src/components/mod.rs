//! Component shortcodes embedded in document bodies.
//!
//! A document references components by name (`{{ ThemeImage … /}}`). Names
//! resolve to the closed [`ComponentKind`] set while the body is scanned, so
//! an unknown name fails the build before anything is rendered. The
//! [`ComponentRegistry`] decides how each kind turns into HTML: with the
//! renderers compiled into quire, or with one theme template per kind.

mod builtin;
mod shortcode;
mod toc;

use anyhow::{Context, Result, bail};
use minijinja::Environment;
use minijinja::value::Value;
use serde::Serialize;

use crate::config::{ComponentStrategy, Config};
use crate::content::Document;
use crate::markdown::{Fragment, Heading, render_markdown};
use crate::template::render_named;
use crate::utils::escape_html;

use shortcode::{Invocation, extract};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Image,
    ThemeImage,
    Link,
    TocInline,
    SeriesHeader,
    SeriesResources,
    NewsletterForm,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 7] = [
        ComponentKind::Image,
        ComponentKind::ThemeImage,
        ComponentKind::Link,
        ComponentKind::TocInline,
        ComponentKind::SeriesHeader,
        ComponentKind::SeriesResources,
        ComponentKind::NewsletterForm,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Image" => Some(ComponentKind::Image),
            "ThemeImage" => Some(ComponentKind::ThemeImage),
            "Link" => Some(ComponentKind::Link),
            "TOCInline" => Some(ComponentKind::TocInline),
            "SeriesHeader" => Some(ComponentKind::SeriesHeader),
            "SeriesResources" => Some(ComponentKind::SeriesResources),
            "BlogNewsletterForm" => Some(ComponentKind::NewsletterForm),
            _ => None,
        }
    }

    /// The name authors write in shortcodes.
    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::Image => "Image",
            ComponentKind::ThemeImage => "ThemeImage",
            ComponentKind::Link => "Link",
            ComponentKind::TocInline => "TOCInline",
            ComponentKind::SeriesHeader => "SeriesHeader",
            ComponentKind::SeriesResources => "SeriesResources",
            ComponentKind::NewsletterForm => "BlogNewsletterForm",
        }
    }

    pub fn template_name(self) -> &'static str {
        match self {
            ComponentKind::Image => "components/image.html",
            ComponentKind::ThemeImage => "components/theme-image.html",
            ComponentKind::Link => "components/link.html",
            ComponentKind::TocInline => "components/toc-inline.html",
            ComponentKind::SeriesHeader => "components/series-header.html",
            ComponentKind::SeriesResources => "components/series-resources.html",
            ComponentKind::NewsletterForm => "components/newsletter-form.html",
        }
    }

    /// Only `Link` wraps content; every other kind is self-closing.
    pub fn takes_body(self) -> bool {
        matches!(self, ComponentKind::Link)
    }

    /// Block kinds emit their own block markup and never sit inside `<p>`.
    pub fn is_block(self) -> bool {
        matches!(
            self,
            ComponentKind::TocInline
                | ComponentKind::SeriesHeader
                | ComponentKind::SeriesResources
                | ComponentKind::NewsletterForm
        )
    }
}

/// Authored arguments of one invocation. Renderers `take` what they consume;
/// whatever is left is emitted as HTML attributes in authored order.
#[derive(Debug, Clone)]
pub struct ComponentArgs {
    kind: ComponentKind,
    entries: Vec<(String, String)>,
}

impl ComponentArgs {
    pub fn new(kind: ComponentKind, entries: Vec<(String, String)>) -> Self {
        Self { kind, entries }
    }

    pub fn take(&mut self, key: &str) -> Option<String> {
        let position = self.entries.iter().position(|(name, _)| name == key)?;
        Some(self.entries.remove(position).1)
    }

    pub fn require(&mut self, key: &str) -> Result<String> {
        self.take(key)
            .filter(|value| !value.trim().is_empty())
            .with_context(|| format!("{} requires a `{key}` argument", self.kind.name()))
    }

    pub fn flag(&mut self, key: &str) -> Result<bool> {
        match self.take(key).as_deref() {
            None | Some("false") => Ok(false),
            Some("true") => Ok(true),
            Some(other) => bail!(
                "{}: `{key}` must be true or false, got '{other}'",
                self.kind.name()
            ),
        }
    }

    /// Remaining arguments as escaped attributes, each with a leading space.
    pub fn passthrough(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!(" {key}=\"{}\"", escape_html(value)))
            .collect()
    }
}

/// What a renderer can see about the document it is rendering into.
pub struct RenderContext<'a> {
    pub document: &'a Document,
    pub config: &'a Config,
    pub headings: &'a [Heading],
}

#[derive(Debug)]
pub struct RenderedBody {
    pub html: String,
    pub excerpt: String,
    pub headings: Vec<Heading>,
}

enum Strategy<'env> {
    Builtin,
    Templates(&'env Environment<'static>),
}

/// Component kind → renderer binding for one build. Built once, then only read.
pub struct ComponentRegistry<'env> {
    strategy: Strategy<'env>,
}

impl<'env> ComponentRegistry<'env> {
    pub fn new(strategy: ComponentStrategy, env: &'env Environment<'static>) -> Self {
        let strategy = match strategy {
            ComponentStrategy::Builtin => Strategy::Builtin,
            ComponentStrategy::Templates => Strategy::Templates(env),
        };
        Self { strategy }
    }

    pub fn strategy(&self) -> ComponentStrategy {
        match self.strategy {
            Strategy::Builtin => ComponentStrategy::Builtin,
            Strategy::Templates(_) => ComponentStrategy::Templates,
        }
    }

    /// Renders a document body: every component reference is resolved and
    /// placed exactly once, or the whole document fails.
    pub fn render_body(&self, document: &Document, config: &Config) -> Result<RenderedBody> {
        let origin = document.content_path.display();
        let extracted = extract(&document.body)
            .with_context(|| format!("{origin}: invalid component reference"))?;
        let invocations = extracted.invocations;

        let rendered = render_markdown(&extracted.markdown, |headings| {
            let ctx = RenderContext {
                document,
                config,
                headings,
            };
            self.render_all(invocations, &ctx)
        })
        .with_context(|| format!("{origin}: component rendering failed"))?;

        Ok(RenderedBody {
            html: rendered.html,
            excerpt: rendered.excerpt,
            headings: rendered.headings,
        })
    }

    fn render_all(
        &self,
        invocations: Vec<Invocation>,
        ctx: &RenderContext<'_>,
    ) -> Result<Vec<Fragment>> {
        invocations
            .into_iter()
            .map(|invocation| {
                let kind = invocation.kind;
                let html = self
                    .render_invocation(invocation, ctx)
                    .with_context(|| format!("failed to render component {}", kind.name()))?;
                Ok(Fragment {
                    html,
                    block: kind.is_block(),
                })
            })
            .collect()
    }

    /// Block bodies are Markdown too. A body that is one paragraph renders
    /// inline, without the wrapping `<p>`.
    fn render_fragment(&self, source: &str, ctx: &RenderContext<'_>) -> Result<String> {
        let extracted = extract(source)?;
        let invocations = extracted.invocations;
        let rendered = render_markdown(&extracted.markdown, |_| self.render_all(invocations, ctx))?;
        let trimmed = rendered.html.trim();

        Ok(match trimmed
            .strip_prefix("<p>")
            .and_then(|inner| inner.strip_suffix("</p>"))
        {
            Some(inner) if !inner.contains("<p>") => inner.to_string(),
            _ => trimmed.to_string(),
        })
    }

    fn render_invocation(
        &self,
        invocation: Invocation,
        ctx: &RenderContext<'_>,
    ) -> Result<String> {
        let kind = invocation.kind;
        let name = kind.name();
        let body = match (kind.takes_body(), invocation.body) {
            (true, Some(body)) => Some(self.render_fragment(&body, ctx)?),
            (true, None) => bail!("{name} needs content: {{{{ {name} … }}}}text{{{{ /{name} }}}}"),
            (false, Some(_)) => bail!("{name} does not take content; write {{{{ {name} … /}}}}"),
            (false, None) => None,
        };
        let args = ComponentArgs::new(kind, invocation.args);

        match self.strategy {
            Strategy::Builtin => match kind {
                ComponentKind::Image => builtin::image(args),
                ComponentKind::ThemeImage => builtin::theme_image(args),
                ComponentKind::Link => builtin::link(args, body.as_deref().unwrap_or_default()),
                ComponentKind::TocInline => builtin::toc_inline(args, ctx),
                ComponentKind::SeriesHeader => builtin::series_header(args, ctx),
                ComponentKind::SeriesResources => builtin::series_resources(args, ctx),
                ComponentKind::NewsletterForm => builtin::newsletter_form(args, ctx),
            },
            Strategy::Templates(env) => render_with_template(env, args, body, ctx),
        }
    }
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    title: &'a str,
    slug: &'a str,
    permalink: &'a str,
}

fn render_with_template(
    env: &Environment<'static>,
    mut args: ComponentArgs,
    body: Option<String>,
    ctx: &RenderContext<'_>,
) -> Result<String> {
    let kind = args.kind;
    let series = match kind {
        ComponentKind::SeriesHeader | ComponentKind::SeriesResources => {
            Some(builtin::resolve_series(&mut args, ctx)?)
        }
        _ => None,
    };
    let values: serde_json::Map<String, serde_json::Value> = args
        .entries
        .iter()
        .map(|(key, value)| (key.clone(), serde_json::Value::String(value.clone())))
        .collect();

    let context = minijinja::context! {
        name => kind.name(),
        args => Value::from_serialize(&values),
        attrs => Value::from_safe_string(args.passthrough()),
        body => body.map(Value::from_safe_string),
        headings => Value::from_serialize(ctx.headings),
        series => series.map(Value::from_serialize),
        newsletter => Value::from_serialize(&ctx.config.newsletter),
        document => Value::from_serialize(DocumentRef {
            title: &ctx.document.title,
            slug: &ctx.document.slug,
            permalink: &ctx.document.permalink,
        }),
    };

    render_named(
        env,
        kind.template_name(),
        context,
        &format!("component {}", kind.name()),
    )
}
