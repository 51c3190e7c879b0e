use std::collections::HashSet;
use std::path::Path;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// A moved URL. Destinations are kept exactly as written.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Redirect {
    pub source: String,
    pub destination: String,
    #[serde(default = "permanent_by_default")]
    pub permanent: bool,
}

fn permanent_by_default() -> bool {
    true
}

impl Redirect {
    pub fn status_code(&self) -> u16 {
        if self.permanent { 308 } else { 307 }
    }

    /// Matches a request path, ignoring a trailing slash on either side.
    pub fn matches(&self, path: &str) -> bool {
        let wanted = self.source.trim_end_matches('/');
        let actual = path.trim_end_matches('/');
        !wanted.is_empty() && wanted == actual
    }
}

pub(super) fn validate_redirects(redirects: &[Redirect], origin: &Path) -> Result<()> {
    let mut seen = HashSet::new();
    for redirect in redirects {
        if !redirect.source.starts_with('/') {
            bail!(
                "{}: redirect source '{}' must start with '/'",
                origin.display(),
                redirect.source
            );
        }
        if redirect
            .source
            .split('/')
            .any(|segment| segment == "." || segment == "..")
        {
            bail!(
                "{}: redirect source '{}' must not contain '.' or '..' segments",
                origin.display(),
                redirect.source
            );
        }
        if redirect.source.trim_end_matches('/').is_empty() {
            bail!("{}: the site root cannot be redirected", origin.display());
        }
        if redirect.destination.trim().is_empty() {
            bail!(
                "{}: redirect from '{}' has an empty destination",
                origin.display(),
                redirect.source
            );
        }
        if !seen.insert(redirect.source.trim_end_matches('/').to_string()) {
            bail!(
                "{}: redirect source '{}' is listed more than once",
                origin.display(),
                redirect.source
            );
        }
    }
    Ok(())
}
