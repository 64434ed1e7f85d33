//! Editing helpers layered over the path primitive.
//!
//! Every helper works on a document the caller already owns (the store hands
//! in a fresh clone), so none of them clone on their own.

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::document::bilingual::{is_bilingual_object, Locale};
use crate::document::path::{ensure_object_at, get_path_mut, set_path_in_place, FieldPath, PathError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("'{0}' is not a #RRGGBB color")]
    InvalidColor(String),

    #[error("'{0}' is not a list")]
    NotAList(String),

    #[error("index {index} out of bounds for '{path}' (len {len})")]
    OutOfBounds { path: String, index: usize, len: usize },
}

/// `#RRGGBB` check used by the editor for color fields.
pub fn is_valid_hex_color(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 7 && bytes[0] == b'#' && bytes[1..].iter().all(u8::is_ascii_hexdigit)
}

/// Default body of a section that does not exist yet.
pub fn default_section() -> Value {
    json!({ "enabled": true, "colors": {}, "heading": { "en": "", "ar": "" } })
}

/// Default custom block appended by the editor.
pub fn default_custom_block() -> Value {
    json!({
        "enabled": true,
        "type": "text",
        "position": "afterHero",
        "props": { "text": { "en": "", "ar": "" }, "align": "center" }
    })
}

/// Make sure `sections.<name>` exists as an object, seeding defaults.
pub fn ensure_section<'a>(doc: &'a mut Value, name: &str) -> Result<&'a mut Map<String, Value>, EditError> {
    let path = FieldPath::from_segments(["sections", name])?;
    let sections = ensure_object_at(doc, &FieldPath::from_segments(["sections"])?);
    let entry = sections.entry(name.to_string()).or_insert(Value::Null);
    if !entry.is_object() {
        *entry = default_section();
    }
    Ok(ensure_object_at(doc, &path))
}

pub fn set_section_enabled(doc: &mut Value, section: &str, enabled: bool) -> Result<(), EditError> {
    ensure_section(doc, section)?.insert("enabled".into(), Value::Bool(enabled));
    Ok(())
}

/// Set one locale of a bilingual section field, converting legacy shapes first.
pub fn set_section_text(
    doc: &mut Value,
    section: &str,
    field: &str,
    locale: Locale,
    text: &str,
) -> Result<(), EditError> {
    let obj = ensure_section(doc, section)?;
    set_bilingual_entry(obj, field, locale, text);
    Ok(())
}

/// Set a section color role. Empty clears the override; anything else must be `#RRGGBB`.
pub fn set_section_color(doc: &mut Value, section: &str, role: &str, color: &str) -> Result<(), EditError> {
    if !color.is_empty() && !is_valid_hex_color(color) {
        return Err(EditError::InvalidColor(color.to_string()));
    }
    let obj = ensure_section(doc, section)?;
    let colors = obj.entry("colors").or_insert_with(|| Value::Object(Map::new()));
    if !colors.is_object() {
        *colors = Value::Object(Map::new());
    }
    if let Value::Object(colors) = colors {
        colors.insert(role.to_string(), Value::String(color.to_string()));
    }
    Ok(())
}

/// Set a theme color (`primary`, `secondary`, `background`, `text`).
pub fn set_theme_color(doc: &mut Value, role: &str, color: &str) -> Result<(), EditError> {
    if !is_valid_hex_color(color) {
        return Err(EditError::InvalidColor(color.to_string()));
    }
    set_path_in_place(doc, &FieldPath::from_segments(["theme", role])?, Value::String(color.to_string()));
    Ok(())
}

/// Make sure `pages.<key>` exists as an object.
pub fn ensure_page<'a>(doc: &'a mut Value, key: &str) -> Result<&'a mut Map<String, Value>, EditError> {
    Ok(ensure_object_at(doc, &FieldPath::from_segments(["pages", key])?))
}

pub fn set_page_text(
    doc: &mut Value,
    page: &str,
    field: &str,
    locale: Locale,
    text: &str,
) -> Result<(), EditError> {
    let obj = ensure_page(doc, page)?;
    set_bilingual_entry(obj, field, locale, text);
    Ok(())
}

pub fn set_page_value(doc: &mut Value, page: &str, field: &str, value: Value) -> Result<(), EditError> {
    ensure_page(doc, page)?.insert(field.to_string(), value);
    Ok(())
}

/// Append `item` to the list at `list`, creating the list when absent.
pub fn push_item(doc: &mut Value, list: &FieldPath, item: Value) -> Result<usize, EditError> {
    let items = list_mut(doc, list, true)?;
    items.push(item);
    Ok(items.len() - 1)
}

pub fn insert_item(doc: &mut Value, list: &FieldPath, index: usize, item: Value) -> Result<(), EditError> {
    let items = list_mut(doc, list, true)?;
    if index > items.len() {
        return Err(out_of_bounds(list, index, items.len()));
    }
    items.insert(index, item);
    Ok(())
}

pub fn remove_item(doc: &mut Value, list: &FieldPath, index: usize) -> Result<Value, EditError> {
    let items = list_mut(doc, list, false)?;
    if index >= items.len() {
        return Err(out_of_bounds(list, index, items.len()));
    }
    Ok(items.remove(index))
}

/// Move the item at `from` so it ends up at `to`, shifting the rest.
pub fn move_item(doc: &mut Value, list: &FieldPath, from: usize, to: usize) -> Result<(), EditError> {
    let items = list_mut(doc, list, false)?;
    let len = items.len();
    for index in [from, to] {
        if index >= len {
            return Err(out_of_bounds(list, index, len));
        }
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

pub fn swap_items(doc: &mut Value, list: &FieldPath, a: usize, b: usize) -> Result<(), EditError> {
    let items = list_mut(doc, list, false)?;
    let len = items.len();
    for index in [a, b] {
        if index >= len {
            return Err(out_of_bounds(list, index, len));
        }
    }
    items.swap(a, b);
    Ok(())
}

/// Set `field` (a path relative to the item) on the item at `index`.
pub fn set_item_field(
    doc: &mut Value,
    list: &FieldPath,
    index: usize,
    field: &FieldPath,
    value: Value,
) -> Result<(), EditError> {
    let items = list_mut(doc, list, false)?;
    let len = items.len();
    let item = items.get_mut(index).ok_or_else(|| out_of_bounds(list, index, len))?;
    set_path_in_place(item, field, value);
    Ok(())
}

/// Set one locale of a bilingual field on a list item.
pub fn set_item_text(
    doc: &mut Value,
    list: &FieldPath,
    index: usize,
    field: &str,
    locale: Locale,
    text: &str,
) -> Result<(), EditError> {
    let items = list_mut(doc, list, false)?;
    let len = items.len();
    let item = items.get_mut(index).ok_or_else(|| out_of_bounds(list, index, len))?;
    if !item.is_object() {
        *item = Value::Object(Map::new());
    }
    if let Value::Object(obj) = item {
        set_bilingual_entry(obj, field, locale, text);
    }
    Ok(())
}

/// Append a default custom block and return its index.
pub fn add_custom_block(doc: &mut Value) -> Result<usize, EditError> {
    push_item(doc, &FieldPath::from_segments(["customBlocks"])?, default_custom_block())
}

fn set_bilingual_entry(obj: &mut Map<String, Value>, field: &str, locale: Locale, text: &str) {
    let entry = obj.entry(field.to_string()).or_insert(Value::Null);
    if !is_bilingual_object(entry) {
        *entry = json!({ "en": "", "ar": "" });
    }
    if let Value::Object(map) = entry {
        map.insert(locale.key().to_string(), Value::String(text.to_string()));
    }
}

fn list_mut<'a>(doc: &'a mut Value, list: &FieldPath, create: bool) -> Result<&'a mut Vec<Value>, EditError> {
    let missing = match crate::document::path::get_path(doc, list) {
        None | Some(Value::Null) => true,
        Some(Value::Array(_)) => false,
        Some(_) => return Err(EditError::NotAList(list.to_string())),
    };
    if missing {
        if !create {
            return Err(EditError::NotAList(list.to_string()));
        }
        set_path_in_place(doc, list, Value::Array(Vec::new()));
    }
    match get_path_mut(doc, list) {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(EditError::NotAList(list.to_string())),
    }
}

fn out_of_bounds(list: &FieldPath, index: usize, len: usize) -> EditError {
    EditError::OutOfBounds { path: list.to_string(), index, len }
}
