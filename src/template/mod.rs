mod filters;

use std::error::Error as StdError;
use std::fmt::Write;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use minijinja::value::Value;
use minijinja::{Environment, Error as TemplateError, ErrorKind};
use time::OffsetDateTime;
use walkdir::WalkDir;

use crate::config::{Config, format_date};

pub fn environment(config: &Config) -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_global("config", Value::from_serialize(config));
    env.add_global(
        "base_url",
        Value::from_safe_string(normalize_base_url(&config.base_url)),
    );

    let default_format = config.date_format.clone();
    env.add_function(
        "now",
        move |format: Option<&str>| -> Result<String, TemplateError> {
            let format = format.unwrap_or(&default_format);
            format_date(format, &OffsetDateTime::now_utc()).map_err(|err| {
                TemplateError::new(
                    ErrorKind::InvalidOperation,
                    format!("failed to format now(): {err:#}"),
                )
            })
        },
    );

    filters::register(&mut env, config);

    Ok(env)
}

/// Registers every file below `templates/` under its relative path.
pub fn load_templates(root: &Path, env: &mut Environment<'static>) -> Result<usize> {
    let templates_dir = root.join("templates");
    if !templates_dir.exists() {
        bail!("templates directory {} not found", templates_dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&templates_dir) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();

    for path in &files {
        let template_body = fs::read_to_string(path)
            .with_context(|| format!("failed to read template {}", path.display()))?;
        let relative_name = normalize_path(path.strip_prefix(&templates_dir)?);
        let name_static = Box::leak(relative_name.clone().into_boxed_str());
        let template_static = Box::leak(template_body.into_boxed_str());
        env.add_template(name_static, template_static)
            .with_context(|| format!("failed to register template {}", relative_name))?;
    }

    Ok(files.len())
}

/// Looks up `name` and renders it, describing any failure against `scope`.
pub fn render_named(
    env: &Environment<'static>,
    name: &str,
    context: Value,
    scope: &str,
) -> Result<String> {
    let template = env
        .get_template(name)
        .map_err(|err| describe_template_error(scope, name, err))?;
    template
        .render(context)
        .map_err(|err| describe_template_error(scope, name, err))
}

pub fn describe_template_error(
    scope: &str,
    template_name: &str,
    err: TemplateError,
) -> anyhow::Error {
    let actual_template = err.name().unwrap_or(template_name).to_string();
    let line = err.line();
    let kind = err.kind();
    let detail = err.detail().map(str::to_string);
    let summary = err.to_string();
    let nested = StdError::source(&err).map(|source| source.to_string());

    let mut message = String::new();
    let _ = write!(&mut message, "{}: template '{}'", scope, actual_template);

    if actual_template != template_name {
        let _ = write!(&mut message, " (inherited from '{}')", template_name);
    }

    if let Some(line_no) = line {
        let _ = write!(&mut message, " at line {}", line_no);
    }

    let _ = write!(&mut message, "\nkind: {:?}", kind);

    let payload = detail.unwrap_or(summary);
    let _ = write!(&mut message, "\nmessage: {}", payload);

    if let Some(source) = nested {
        let _ = write!(&mut message, "\ncaused by: {}", source);
    }

    anyhow!(message)
}

fn normalize_path(path: &Path) -> String {
    path.components()
        .map(|comp| comp.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JsonValue;
    use tempfile::TempDir;

    #[test]
    fn config_available_in_templates() {
        let config = Config {
            title: Some("Field Notes".to_string()),
            ..Default::default()
        };
        let mut env = environment(&config).unwrap();
        env.add_template("greet", "{{ config.title }}").unwrap();

        let rendered = env.get_template("greet").unwrap().render(()).unwrap();
        assert_eq!(rendered, "Field Notes");
    }

    #[test]
    fn now_helper_uses_config_format() {
        let config = Config {
            date_format: "[year]".to_string(),
            ..Default::default()
        };
        let mut env = environment(&config).unwrap();
        env.add_template("when", "{{ now() }}").unwrap();

        let rendered = env.get_template("when").unwrap().render(()).unwrap();
        assert_eq!(rendered.len(), 4);
    }

    #[test]
    fn now_helper_accepts_rfc3339_keyword() {
        let mut env = environment(&Config::default()).unwrap();
        env.add_template("when", "{{ now('RFC3339') }}").unwrap();

        let rendered = env.get_template("when").unwrap().render(()).unwrap();
        assert!(rendered.contains('T'));
        assert!(rendered.ends_with('Z'));
    }

    #[test]
    fn base_url_has_no_trailing_slash() {
        let config = Config {
            base_url: "https://example.com/blog/".to_string(),
            ..Default::default()
        };
        let mut env = environment(&config).unwrap();
        env.add_template("base", "{{ base_url }}").unwrap();

        let rendered = env.get_template("base").unwrap().render(()).unwrap();
        assert_eq!(rendered, "https://example.com/blog");
    }

    #[test]
    fn extra_config_fields_are_exposed() {
        let mut config = Config::default();
        config.extra.insert(
            "twitter".to_string(),
            JsonValue::String("@quire".to_string()),
        );

        let mut env = environment(&config).unwrap();
        env.add_template("handle", "{{ config.twitter }}").unwrap();

        let rendered = env.get_template("handle").unwrap().render(()).unwrap();
        assert_eq!(rendered, "@quire");
    }

    #[test]
    fn load_templates_registers_nested_names() {
        let dir = TempDir::new().unwrap();
        let templates = dir.path().join("templates/components");
        fs::create_dir_all(&templates).unwrap();
        fs::write(templates.join("image.html"), "<img src=\"{{ args.src }}\">").unwrap();

        let mut env = environment(&Config::default()).unwrap();
        let count = load_templates(dir.path(), &mut env).unwrap();
        assert_eq!(count, 1);
        assert!(env.get_template("components/image.html").is_ok());
    }

    #[test]
    fn missing_template_error_names_scope() {
        let env = environment(&Config::default()).unwrap();
        let error = render_named(&env, "layouts/nope.html", Value::from(()), "post 'x'")
            .unwrap_err()
            .to_string();
        assert!(error.contains("post 'x': template 'layouts/nope.html'"), "{error}");
        assert!(error.contains("TemplateNotFound"), "{error}");
    }
}
