use std::path::Path;

use anyhow::{Result, bail};

use crate::config::{Config, Redirect};
use crate::content::Document;
use crate::routes::TagParam;
use crate::utils::{absolute_url, escape_html};

use super::TAG_DATA_FILE;
use super::utils::{log_status, write_page};

pub(super) const REDIRECTS_FILE: &str = "_redirects";

/// Writes a refresh stub per source plus the `_redirects` table for hosts
/// that honour it. Destinations are copied exactly as configured. A source
/// that lands on a generated page fails the build before anything is written.
pub(super) fn write_redirects(
    html_root: &Path,
    config: &Config,
    documents: &[Document],
    params: &[TagParam],
    verbose: bool,
) -> Result<usize> {
    for redirect in &config.redirects {
        check_shadowing(redirect, documents, params)?;
    }

    let mut table = String::new();
    for redirect in &config.redirects {

        let output = html_root
            .join(redirect.source.trim_matches('/'))
            .join("index.html");
        write_page(&output, &stub_page(config, redirect))?;

        table.push_str(&format!(
            "{} {} {}\n",
            redirect.source,
            redirect.destination,
            redirect.status_code()
        ));
        log_status(
            verbose,
            "REDIRECT",
            format!(
                "{} -> {} ({})",
                redirect.source,
                redirect.destination,
                redirect.status_code()
            ),
        );
    }

    write_page(&html_root.join(REDIRECTS_FILE), &table)?;
    Ok(config.redirects.len())
}

fn check_shadowing(redirect: &Redirect, documents: &[Document], params: &[TagParam]) -> Result<()> {
    if let Some(document) = documents
        .iter()
        .find(|document| redirect.matches(&document.permalink))
    {
        bail!(
            "redirect source '{}' shadows document {}",
            redirect.source,
            document.content_path.display()
        );
    }
    if redirect.matches("/tags/") {
        bail!("redirect source '{}' shadows the tags index", redirect.source);
    }
    if let Some(param) = params
        .iter()
        .find(|param| redirect.matches(&format!("/tags/{}/", param.tag)))
    {
        bail!(
            "redirect source '{}' shadows the tag page for '{}'",
            redirect.source,
            param.tag
        );
    }
    let first = redirect.source.trim_start_matches('/');
    let first = first.split('/').next().unwrap_or_default();
    if first == REDIRECTS_FILE || first == TAG_DATA_FILE {
        bail!(
            "redirect source '{}' collides with the generated {first} file",
            redirect.source
        );
    }
    Ok(())
}

fn stub_page(config: &Config, redirect: &Redirect) -> String {
    let destination = escape_html(&redirect.destination);
    let canonical = if redirect.destination.starts_with('/') && !redirect.destination.starts_with("//") {
        escape_html(&absolute_url(&config.base_url, &redirect.destination))
    } else {
        destination.clone()
    };

    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html lang=\"en\">\n",
            "<head>\n",
            "<meta charset=\"utf-8\">\n",
            "<title>Redirecting</title>\n",
            "<link rel=\"canonical\" href=\"{canonical}\">\n",
            "<meta name=\"robots\" content=\"noindex\">\n",
            "<meta http-equiv=\"refresh\" content=\"0; url={destination}\">\n",
            "</head>\n",
            "<body><p>This page has moved to <a href=\"{destination}\">{destination}</a>.</p></body>\n",
            "</html>\n"
        ),
        canonical = canonical,
        destination = destination,
    )
}
