//! Bilingual text values and locale resolution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The two supported display locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl Locale {
    /// Key used for this locale inside a bilingual object.
    pub fn key(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ar => "ar",
        }
    }

    /// The fallback locale.
    pub fn other(self) -> Locale {
        match self {
            Locale::En => Locale::Ar,
            Locale::Ar => Locale::En,
        }
    }

    /// Separator used when several fragments are collapsed into one line.
    pub fn list_separator(self) -> &'static str {
        match self {
            Locale::En => ", ",
            Locale::Ar => "، ",
        }
    }

    /// Locale requested by the document (`site.lang`), defaulting to English.
    pub fn from_document(doc: &Value) -> Locale {
        doc.pointer("/site/lang")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error returned when parsing an unsupported locale code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported locale '{0}'")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "ar" => Ok(Locale::Ar),
            other => Err(UnknownLocale(other.to_string())),
        }
    }
}

/// Canonical bilingual text: both keys always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualText {
    pub en: String,
    pub ar: String,
}

impl BilingualText {
    pub fn new(en: impl Into<String>, ar: impl Into<String>) -> Self {
        Self { en: en.into(), ar: ar.into() }
    }

    /// Same text in both locales.
    pub fn uniform(text: impl Into<String>) -> Self {
        let text = text.into();
        Self { en: text.clone(), ar: text }
    }

    pub fn get(&self, locale: Locale) -> &str {
        match locale {
            Locale::En => &self.en,
            Locale::Ar => &self.ar,
        }
    }

    pub fn set(&mut self, locale: Locale, text: impl Into<String>) {
        match locale {
            Locale::En => self.en = text.into(),
            Locale::Ar => self.ar = text.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({ "en": self.en, "ar": self.ar })
    }
}

impl From<BilingualText> for Value {
    fn from(text: BilingualText) -> Self {
        text.to_value()
    }
}

/// True when `value` is an object carrying an `en` or `ar` key.
pub fn is_bilingual_object(value: &Value) -> bool {
    value
        .as_object()
        .map(|m| m.contains_key("en") || m.contains_key("ar"))
        .unwrap_or(false)
}

/// Resolve a bilingual value (or plain string) for `locale`.
///
/// Objects fall back to the other locale when the active one is missing or
/// empty. Anything else resolves to the empty string.
pub fn translate(value: &Value, locale: Locale) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => non_empty(map, locale)
            .or_else(|| non_empty(map, locale.other()))
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// Resolve for `locale` only, without falling back.
pub fn translate_strict(value: &Value, locale: Locale) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get(locale.key())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn non_empty(map: &Map<String, Value>, locale: Locale) -> Option<&str> {
    map.get(locale.key())
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_falls_back_to_other_locale() {
        assert_eq!(translate(&json!({ "en": "Hello" }), Locale::Ar), "Hello");
        assert_eq!(translate(&json!({ "en": "", "ar": "مرحبا" }), Locale::En), "مرحبا");
        assert_eq!(translate(&json!({ "en": "Hi", "ar": "أهلا" }), Locale::Ar), "أهلا");
    }

    #[test]
    fn test_translate_degenerate_inputs() {
        assert_eq!(translate(&json!({}), Locale::En), "");
        assert_eq!(translate(&json!({}), Locale::Ar), "");
        assert_eq!(translate(&json!("X"), Locale::En), "X");
        assert_eq!(translate(&json!("X"), Locale::Ar), "X");
        assert_eq!(translate(&json!(42), Locale::En), "");
        assert_eq!(translate(&json!(["a"]), Locale::En), "");
        assert_eq!(translate(&Value::Null, Locale::Ar), "");
        assert_eq!(translate(&json!({ "en": 3 }), Locale::En), "");
    }

    #[test]
    fn test_translate_strict_does_not_fall_back() {
        assert_eq!(translate_strict(&json!({ "en": "Hello" }), Locale::Ar), "");
        assert_eq!(translate_strict(&json!("T"), Locale::Ar), "T");
    }

    #[test]
    fn test_locale_parsing() {
        assert_eq!("AR".parse::<Locale>(), Ok(Locale::Ar));
        assert_eq!(" en ".parse::<Locale>(), Ok(Locale::En));
        assert!("fr".parse::<Locale>().is_err());
        assert_eq!(Locale::from_document(&json!({ "site": { "lang": "ar" } })), Locale::Ar);
        assert_eq!(Locale::from_document(&json!({ "site": { "lang": "de" } })), Locale::En);
        assert_eq!(Locale::from_document(&json!({})), Locale::En);
    }
}
