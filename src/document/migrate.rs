//! Schema migration for legacy document shapes.
//!
//! Older documents stored bilingual fields as bare strings, as lists of
//! lines, or as objects missing one locale. [`migrate`] rewrites those into
//! `{ "en": .., "ar": .. }`. Canonical values are left alone, so running the
//! pass twice gives the same result as running it once.
//!
//! Each region is migrated independently; a region with an unexpected shape
//! is logged and skipped while the others still run.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::document::bilingual::{BilingualText, Locale};

/// Why a region or field was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrateError {
    #[error("region '{0}' is not an object")]
    NotAnObject(String),

    #[error("field '{0}' has a non-text locale value")]
    NonTextLocale(String),
}

/// How a bilingual field is treated when it is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    /// Create `{ en: "", ar: "" }` when missing.
    Required,
    /// Only normalize when present.
    IfPresent,
}

const SECTION_TEXT_FIELDS: &[(&str, Presence)] = &[
    ("heading", Presence::IfPresent),
    ("subheading", Presence::IfPresent),
];

const CONTACT_TEXT_FIELDS: &[(&str, Presence)] = &[
    ("subheading", Presence::Required),
    ("hours", Presence::IfPresent),
    ("address", Presence::IfPresent),
];

const SITE_TEXT_FIELDS: &[(&str, Presence)] = &[
    ("title", Presence::IfPresent),
    ("tabTitle", Presence::IfPresent),
    ("footerText", Presence::IfPresent),
];

const PAGE_TEXT_FIELDS: &[(&str, Presence)] = &[("title", Presence::IfPresent)];

/// Normalize legacy shapes into the current schema. Never fails.
pub fn migrate(mut doc: Value) -> Value {
    let Some(root) = doc.as_object_mut() else {
        tracing::debug!("document root is not an object, skipping migration");
        return doc;
    };

    run_region("site", || migrate_fields(root, "site", SITE_TEXT_FIELDS));
    run_region("sections", || migrate_sections(root));
    run_region("pages", || migrate_pages(root));

    doc
}

fn run_region<F>(region: &str, f: F)
where
    F: FnOnce() -> Vec<MigrateError>,
{
    for err in f() {
        tracing::warn!(region = region, error = %err, "Skipped migration step");
    }
}

fn migrate_fields(
    parent: &mut Map<String, Value>,
    key: &str,
    fields: &[(&str, Presence)],
) -> Vec<MigrateError> {
    match parent.get_mut(key) {
        None => Vec::new(),
        Some(Value::Object(obj)) => normalize_fields(obj, key, fields),
        Some(_) => vec![MigrateError::NotAnObject(key.to_string())],
    }
}

fn migrate_sections(root: &mut Map<String, Value>) -> Vec<MigrateError> {
    let sections = match root.get_mut("sections") {
        None => return Vec::new(),
        Some(Value::Object(sections)) => sections,
        Some(_) => return vec![MigrateError::NotAnObject("sections".into())],
    };

    let mut errors = Vec::new();
    for (name, section) in sections.iter_mut() {
        let region = format!("sections.{name}");
        let Some(obj) = section.as_object_mut() else {
            errors.push(MigrateError::NotAnObject(region));
            continue;
        };
        errors.extend(normalize_fields(obj, &region, SECTION_TEXT_FIELDS));
        if name == "contact" {
            errors.extend(normalize_fields(obj, &region, CONTACT_TEXT_FIELDS));
        }
    }
    errors
}

fn migrate_pages(root: &mut Map<String, Value>) -> Vec<MigrateError> {
    let pages = match root.get_mut("pages") {
        None => return Vec::new(),
        Some(Value::Object(pages)) => pages,
        Some(_) => return vec![MigrateError::NotAnObject("pages".into())],
    };

    let mut errors = Vec::new();
    for (name, page) in pages.iter_mut() {
        let region = format!("pages.{name}");
        match page.as_object_mut() {
            Some(obj) => errors.extend(normalize_fields(obj, &region, PAGE_TEXT_FIELDS)),
            None => errors.push(MigrateError::NotAnObject(region)),
        }
    }
    errors
}

fn normalize_fields(
    obj: &mut Map<String, Value>,
    region: &str,
    fields: &[(&str, Presence)],
) -> Vec<MigrateError> {
    let mut errors = Vec::new();
    for &(field, presence) in fields {
        let current = obj.get(field);
        if current.is_none() && presence == Presence::IfPresent {
            continue;
        }
        match normalize_bilingual(current) {
            Ok(Some(text)) => {
                obj.insert(field.to_string(), text.to_value());
            }
            Ok(None) => {}
            Err(()) => errors.push(MigrateError::NonTextLocale(format!("{region}.{field}"))),
        }
    }
    errors
}

/// Canonical form of a bilingual field.
///
/// `Ok(None)` means the value is already canonical and must not be touched;
/// `Err(())` means the value has a shape migration does not understand.
fn normalize_bilingual(value: Option<&Value>) -> Result<Option<BilingualText>, ()> {
    match value {
        None | Some(Value::Null) => Ok(Some(BilingualText::default())),
        Some(Value::String(s)) => Ok(Some(BilingualText::uniform(s.as_str()))),
        Some(Value::Array(items)) => Ok(Some(collapse_lines(items))),
        Some(Value::Object(map)) => {
            let en = map.get("en");
            let ar = map.get("ar");
            if en.is_none() && ar.is_none() {
                return Ok(Some(BilingualText::default()));
            }
            let text_or_missing = |v: Option<&Value>| matches!(v, None | Some(Value::String(_)));
            if !text_or_missing(en) || !text_or_missing(ar) {
                return Err(());
            }
            if en.is_some() && ar.is_some() {
                return Ok(None);
            }
            let as_text = |v: Option<&Value>| v.and_then(Value::as_str).unwrap_or_default().to_string();
            Ok(Some(BilingualText::new(as_text(en), as_text(ar))))
        }
        Some(_) => Ok(Some(BilingualText::default())),
    }
}

/// Join a legacy multi-line list into one bilingual line.
fn collapse_lines(items: &[Value]) -> BilingualText {
    let join = |locale: Locale| {
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.as_str(),
                Value::Object(map) => map.get(locale.key()).and_then(Value::as_str).unwrap_or_default(),
                _ => "",
            })
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(locale.list_separator())
    };
    BilingualText::new(join(Locale::En), join(Locale::Ar))
}
