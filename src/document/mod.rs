//! The site configuration document.
//!
//! The document is schema-agnostic JSON (`serde_json::Value`) with a few
//! well-known regions: `site`, `sections`, `pages`, `theme` and
//! `customBlocks`. This module holds the pure operations on it:
//!
//! ```text
//! bilingual.rs  locale resolution (translate)
//! merge.rs      deep merge, overlay wins, arrays replaced
//! migrate.rs    legacy shape normalization (idempotent)
//! path.rs       dot/segment paths, copy-on-write set
//! edit.rs       section, page and list helpers over path.rs
//! ```

pub mod bilingual;
pub mod edit;
pub mod merge;
pub mod migrate;
pub mod path;

use serde_json::{Map, Value};

pub use bilingual::{translate, BilingualText, Locale};
pub use merge::deep_merge;
pub use migrate::migrate;
pub use path::{get_path, set_path, FieldPath, PathError};

/// Alias used where a value is known to be a whole site document.
pub type Document = Value;

/// The document itself when it is an object, otherwise an empty object.
pub fn coerce_object(doc: Value) -> Document {
    if doc.is_object() {
        doc
    } else {
        Value::Object(Map::new())
    }
}
