//! Light/dark image pair that stays hidden until the page theme is known.
//!
//! The server renders [`ThemeImageState::Unresolved`]: both variants present,
//! both hidden. `theme-image.js` applies the same transitions in the browser
//! whenever the resolved theme changes.

use crate::utils::escape_html;

pub const HIDDEN_CLASS: &str = "hidden";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Theme> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("light") {
            Some(Theme::Light)
        } else if value.eq_ignore_ascii_case("dark") {
            Some(Theme::Dark)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThemeImageState {
    #[default]
    Unresolved,
    Resolved(Theme),
}

impl ThemeImageState {
    /// Applies the latest theme report. Anything other than a concrete
    /// light/dark value, including no value, goes back to `Unresolved`.
    pub fn resolve(&mut self, reported: Option<&str>) {
        *self = match reported.and_then(Theme::parse) {
            Some(theme) => ThemeImageState::Resolved(theme),
            None => ThemeImageState::Unresolved,
        };
    }

    /// `(light_visible, dark_visible)`.
    pub fn visibility(self) -> (bool, bool) {
        match self {
            ThemeImageState::Unresolved => (false, false),
            ThemeImageState::Resolved(Theme::Light) => (true, false),
            ThemeImageState::Resolved(Theme::Dark) => (false, true),
        }
    }

    /// Renders both variants for this state. `attrs` holds escaped
    /// pass-through attributes with a leading space, copied onto both images.
    pub fn markup(self, light_src: &str, dark_src: &str, attrs: &str) -> String {
        let (light_visible, dark_visible) = self.visibility();
        let mut html = String::from("<span data-theme-image>");
        html.push_str(&variant(Theme::Light, light_src, light_visible, attrs));
        html.push_str(&variant(Theme::Dark, dark_src, dark_visible, attrs));
        html.push_str("</span>");
        html
    }
}

fn variant(theme: Theme, src: &str, visible: bool, attrs: &str) -> String {
    let class = if visible {
        String::new()
    } else {
        format!(" class=\"{HIDDEN_CLASS}\"")
    };
    format!(
        "<img src=\"{}\" data-theme-variant=\"{}\"{}{} loading=\"lazy\" decoding=\"async\">",
        escape_html(src),
        theme.as_str(),
        class,
        attrs
    )
}
