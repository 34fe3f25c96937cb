//! YAML frontmatter extraction and validation.
//!
//! Entries open with a `---` fenced YAML block carrying the title,
//! description, dates, tags and authors. Older entries use `date` instead of
//! `created`; both spellings are accepted.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yml::Value;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use super::entities::EntryMeta;

const DELIMITER: &str = "---";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrontmatterError {
    #[error("frontmatter opened with `---` but never closed")]
    Unterminated,
    #[error("frontmatter is not valid YAML: {message}")]
    Yaml { message: String },
    #[error("frontmatter field `{field}` is required")]
    MissingField { field: &'static str },
    #[error("frontmatter field `{field}` has invalid date `{value}`")]
    InvalidDate { field: &'static str, value: String },
    #[error("`updated` ({updated}) precedes `created` ({created})")]
    UpdatedBeforeCreated { created: String, updated: String },
    #[error("frontmatter field `{field}` could not be converted: {message}")]
    Unsupported { field: String, message: String },
}

/// Values applied when frontmatter leaves optional fields out.
#[derive(Debug, Clone)]
pub struct FrontmatterDefaults {
    pub default_author: String,
}

impl Default for FrontmatterDefaults {
    fn default() -> Self {
        Self {
            default_author: "Site Owner".to_string(),
        }
    }
}

/// Validated frontmatter plus the remaining document body.
#[derive(Debug, Clone, PartialEq)]
pub struct Frontmatter {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub authors: Vec<String>,
    pub created: OffsetDateTime,
    pub updated: Option<OffsetDateTime>,
    pub excerpt: Option<String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Frontmatter {
    pub fn into_meta(self, slug: String) -> EntryMeta {
        EntryMeta {
            slug,
            title: self.title,
            description: self.description,
            tags: self.tags,
            authors: self.authors,
            created: self.created,
            updated: self.updated,
            excerpt: self.excerpt,
            extra: self.extra,
        }
    }
}

/// Known keys are kept as loose YAML values so that scalars which look like
/// numbers or booleans (`tags: [rust, 2024]`) are still read as text.
#[derive(Debug, Default, Deserialize)]
struct RawFrontmatter {
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default, alias = "date")]
    created: Option<Value>,
    #[serde(default)]
    updated: Option<Value>,
    #[serde(default)]
    tags: Option<Value>,
    #[serde(default)]
    authors: Option<Value>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

fn scalar_text(value: Option<Value>, field: &str) -> Result<Option<String>, FrontmatterError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(_) => Err(FrontmatterError::Unsupported {
            field: field.to_string(),
            message: "expected a string".to_string(),
        }),
    }
}

/// A single scalar or a sequence of scalars.
fn text_list(value: Option<Value>, field: &str) -> Result<Vec<String>, FrontmatterError> {
    match value {
        Some(Value::Sequence(items)) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.extend(scalar_text(Some(item), field)?);
            }
            Ok(values)
        }
        other => Ok(scalar_text(other, field)?.into_iter().collect()),
    }
}

/// Split a document into its raw YAML frontmatter and body.
///
/// Returns `None` for the frontmatter when the document does not open with a
/// `---` line. A leading byte-order mark is ignored.
pub fn split_frontmatter(source: &str) -> Result<(Option<&str>, &str), FrontmatterError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let Some(rest) = strip_opening_delimiter(source) else {
        return Ok((None, source));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if is_delimiter(line) {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok((Some(yaml), body));
        }
        offset += line.len();
    }

    Err(FrontmatterError::Unterminated)
}

/// Parse and validate the frontmatter of `source`, returning it together with
/// the body that follows.
pub fn parse_frontmatter<'a>(
    source: &'a str,
    defaults: &FrontmatterDefaults,
) -> Result<(Frontmatter, &'a str), FrontmatterError> {
    let (yaml, body) = split_frontmatter(source)?;

    let raw = match yaml {
        Some(yaml) if !yaml.trim().is_empty() => serde_yml::from_str::<RawFrontmatter>(yaml)
            .map_err(|err| FrontmatterError::Yaml {
                message: err.to_string(),
            })?,
        _ => RawFrontmatter::default(),
    };

    let frontmatter = validate(raw, body, defaults)?;
    Ok((frontmatter, body))
}

fn validate(
    raw: RawFrontmatter,
    body: &str,
    defaults: &FrontmatterDefaults,
) -> Result<Frontmatter, FrontmatterError> {
    let title = required_text(scalar_text(raw.title, "title")?, "title")?;
    let description = required_text(scalar_text(raw.description, "description")?, "description")?;

    let created_raw = scalar_text(raw.created, "created")?
        .ok_or(FrontmatterError::MissingField { field: "created" })?;
    let created = parse_date(&created_raw, "created")?;

    let updated_raw = scalar_text(raw.updated, "updated")?.unwrap_or_default();
    let updated = if updated_raw.trim().is_empty() {
        None
    } else {
        Some(parse_date(&updated_raw, "updated")?)
    };

    if let Some(updated) = updated
        && updated < created
    {
        return Err(FrontmatterError::UpdatedBeforeCreated {
            created: created_raw,
            updated: updated_raw,
        });
    }

    let tags = normalise_list(text_list(raw.tags, "tags")?);
    let mut authors = normalise_list(text_list(raw.authors, "authors")?);
    if authors.is_empty() {
        authors.push(defaults.default_author.clone());
    }

    let mut extra = BTreeMap::new();
    for (key, value) in raw.extra {
        let converted =
            serde_json::to_value(&value).map_err(|err| FrontmatterError::Unsupported {
                field: key.clone(),
                message: err.to_string(),
            })?;
        extra.insert(key, converted);
    }

    Ok(Frontmatter {
        title,
        description,
        tags,
        authors,
        created,
        updated,
        excerpt: extract_excerpt(body),
        extra,
    })
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, FrontmatterError> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(FrontmatterError::MissingField { field })
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(value: &str, field: &'static str) -> Result<OffsetDateTime, FrontmatterError> {
    let trimmed = value.trim();

    if let Ok(timestamp) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(timestamp);
    }

    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .map(|date| date.midnight().assume_utc())
        .map_err(|_| FrontmatterError::InvalidDate {
            field,
            value: trimmed.to_string(),
        })
}

/// Text before the first `---` line of the body, gray-matter style.
pub fn extract_excerpt(body: &str) -> Option<String> {
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        if is_delimiter(line) {
            let excerpt = body[..offset].trim();
            return (!excerpt.is_empty()).then(|| excerpt.to_string());
        }
        offset += line.len();
    }
    None
}

fn normalise_list(values: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(values.len());
    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() || seen.iter().any(|existing: &String| existing == trimmed) {
            continue;
        }
        seen.push(trimmed.to_string());
    }
    seen
}

fn strip_opening_delimiter(source: &str) -> Option<&str> {
    let (first, rest) = match source.find('\n') {
        Some(idx) => (&source[..idx], &source[idx + 1..]),
        None => (source, ""),
    };
    (first.trim_end_matches('\r') == DELIMITER).then_some(rest)
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end_matches(['\r', '\n']) == DELIMITER
}
