use anyhow::{Context, Result, bail};
use time::format_description::well_known::Rfc3339;
use time::format_description::{self, FormatItem};
use time::macros::format_description as fd;
use time::{OffsetDateTime, UtcOffset};

/// Accepts `UTC`, `Z`, `+HH:MM`, `+HHMM`, `+HH:MM:SS` and `+HH`.
pub fn parse_offset(value: &str) -> Result<UtcOffset> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("UTC") || trimmed.eq_ignore_ascii_case("Z") {
        return Ok(UtcOffset::UTC);
    }
    if !trimmed.starts_with(['+', '-']) {
        bail!("offset '{}' must start with '+' or '-'", value);
    }

    let candidates: [&[FormatItem<'static>]; 4] = [
        fd!("[offset_hour sign:mandatory]:[offset_minute]"),
        fd!("[offset_hour sign:mandatory]:[offset_minute]:[offset_second]"),
        fd!("[offset_hour sign:mandatory][offset_minute]"),
        fd!("[offset_hour sign:mandatory]"),
    ];

    candidates
        .iter()
        .find_map(|format| UtcOffset::parse(trimmed, format).ok())
        .with_context(|| format!("offset '{}' is invalid", value))
}

pub(super) fn validate_date_format(value: &str) -> Result<()> {
    if value.eq_ignore_ascii_case("RFC3339") {
        return Ok(());
    }

    let items = format_description::parse(value)?;
    if !items
        .iter()
        .any(|item| matches!(item, FormatItem::Component(_)))
    {
        bail!("date_format must contain at least one date or time component");
    }
    Ok(())
}

pub fn format_date(format: &str, date: &OffsetDateTime) -> Result<String> {
    if format.eq_ignore_ascii_case("RFC3339") {
        return date.format(&Rfc3339).context("failed to format RFC3339 date");
    }

    let description = format_description::parse(format)
        .with_context(|| format!("invalid date_format '{}'", format))?;
    date.format(&description)
        .with_context(|| format!("failed to format date with pattern '{}'", format))
}
