use minijinja::value::Value;
use minijinja::{Environment, Error, ErrorKind};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::config::{Config, format_date};
use crate::links::classify;
use crate::routes::tag_url;
use crate::tags::slug;

pub fn register(env: &mut Environment<'static>, config: &Config) {
    env.add_filter("slug", |value: String| slug(&value));
    env.add_filter("tag_url", |value: String| tag_url(&slug(&value)));
    env.add_filter("link_kind", |value: String| classify(&value).as_str());

    let default_format = config.date_format.clone();
    env.add_filter(
        "format_date",
        move |value: Value, format: Option<String>| -> Result<Value, Error> {
            format_date_filter(value, format.as_deref().unwrap_or(&default_format))
        },
    );
}

fn format_date_filter(value: Value, format: &str) -> Result<Value, Error> {
    let raw = match value.as_str() {
        Some(text) if !text.trim().is_empty() => text,
        Some(_) => return Ok(Value::from("")),
        None => {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                "format_date filter expects a string input",
            ));
        }
    };

    let datetime = OffsetDateTime::parse(raw, &Rfc3339).map_err(|err| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!(
                "format_date filter requires RFC3339 datetime strings (e.g. post.date_iso); got '{raw}': {err}"
            ),
        )
    })?;

    format_date(format, &datetime)
        .map(Value::from)
        .map_err(|err| Error::new(ErrorKind::InvalidOperation, format!("{err:#}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(config: &Config, source: &'static str) -> String {
        let mut env = Environment::new();
        register(&mut env, config);
        env.add_template("t", source).unwrap();
        env.get_template("t").unwrap().render(()).unwrap()
    }

    #[test]
    fn slug_and_tag_url_filters() {
        let config = Config::default();
        assert_eq!(render(&config, "{{ 'Azure DevOps' | slug }}"), "azure-devops");
        assert_eq!(
            render(&config, "{{ 'Azure DevOps' | tag_url }}"),
            "/tags/azure-devops/"
        );
    }

    #[test]
    fn link_kind_filter() {
        let config = Config::default();
        assert_eq!(
            render(
                &config,
                "{{ '/blog/a' | link_kind }} {{ '#x' | link_kind }} {{ '' | link_kind }}"
            ),
            "internal anchor external"
        );
    }

    #[test]
    fn format_date_uses_config_default() {
        let config = Config::default();
        assert_eq!(
            render(&config, "{{ '2023-06-01T00:00:00Z' | format_date }}"),
            "June 1, 2023"
        );
        assert_eq!(
            render(&config, "{{ '2023-06-01T00:00:00Z' | format_date('[year]') }}"),
            "2023"
        );
        assert_eq!(render(&config, "{{ '' | format_date }}"), "");
    }

    #[test]
    fn format_date_rejects_non_rfc3339() {
        let mut env = Environment::new();
        register(&mut env, &Config::default());
        env.add_template("t", "{{ 'yesterday' | format_date }}").unwrap();
        assert!(env.get_template("t").unwrap().render(()).is_err());
    }
}
