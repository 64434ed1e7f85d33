//! Page chrome derived from the document and active locale.
//!
//! Presentation layers apply this to the host page: CSS variables, an
//! optional font stylesheet, the `theme-color` meta, title and favicon.

use serde::Serialize;
use serde_json::Value;

use crate::document::bilingual::{translate_strict, Locale};

/// Theme color roles and the CSS variables they drive.
pub const THEME_VARIABLES: &[(&str, &str)] = &[
    ("primary", "--color-primary"),
    ("secondary", "--color-secondary"),
    ("background", "--color-bg"),
    ("text", "--color-text"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageChrome {
    /// `(variable, value)`; `None` means remove the property.
    pub css_variables: Vec<(&'static str, Option<String>)>,
    pub font_url: Option<String>,
    pub theme_color: Option<String>,
    /// `None` leaves the current title alone.
    pub title: Option<String>,
    /// `None` removes the favicon link.
    pub favicon: Option<String>,
}

impl PageChrome {
    pub fn derive(doc: &Value, locale: Locale) -> Self {
        let mut chrome = PageChrome::default();

        if let Some(theme) = doc.get("theme").filter(|t| t.is_object()) {
            for &(role, var) in THEME_VARIABLES {
                if let Some(color) = theme.get(role).and_then(Value::as_str) {
                    chrome.css_variables.push((var, Some(color.to_string())));
                }
            }

            let typography = theme.get("typography");
            let font = |key: &str| {
                typography
                    .and_then(|t| t.get(key))
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };
            chrome.css_variables.push(("--font-family", font("fontFamily")));
            chrome.css_variables.push(("--heading-font-family", font("headingFamily")));
            chrome.font_url = font("fontUrl");
            chrome.theme_color = theme.get("primary").and_then(Value::as_str).map(str::to_string);
        }

        let site = doc.get("site");
        chrome.title = site.and_then(|s| document_title(s, locale));
        chrome.favicon = site
            .and_then(|s| s.get("favicon"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        chrome
    }
}

/// `site.tabTitle` when it has any text, otherwise `site.title`.
///
/// Resolved for `locale` only; an empty result means "keep the current title".
fn document_title(site: &Value, locale: Locale) -> Option<String> {
    let tab = site.get("tabTitle");
    let has_tab = match tab {
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Object(map)) => ["en", "ar"]
            .iter()
            .any(|k| map.get(*k).and_then(Value::as_str).is_some_and(|s| !s.is_empty())),
        _ => false,
    };
    let source = if has_tab { tab } else { site.get("title") }?;
    Some(translate_strict(source, locale)).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_theme_variables() {
        let doc = json!({ "theme": {
            "primary": "#111111", "secondary": "#222222", "background": "#ffffff", "text": "#000000",
            "typography": { "fontFamily": "Cairo", "fontUrl": "https://fonts.example/cairo.css" }
        }});
        let chrome = PageChrome::derive(&doc, Locale::En);
        assert!(chrome.css_variables.contains(&("--color-primary", Some("#111111".into()))));
        assert!(chrome.css_variables.contains(&("--color-bg", Some("#ffffff".into()))));
        assert!(chrome.css_variables.contains(&("--font-family", Some("Cairo".into()))));
        assert!(chrome.css_variables.contains(&("--heading-font-family", None)));
        assert_eq!(chrome.font_url.as_deref(), Some("https://fonts.example/cairo.css"));
        assert_eq!(chrome.theme_color.as_deref(), Some("#111111"));
    }

    #[test]
    fn test_no_theme_means_no_variables() {
        let chrome = PageChrome::derive(&json!({}), Locale::En);
        assert!(chrome.css_variables.is_empty());
        assert_eq!(chrome.theme_color, None);
    }

    #[test]
    fn test_tab_title_preferred() {
        let doc = json!({ "site": {
            "title": { "en": "Acme", "ar": "أكمي" },
            "tabTitle": { "en": "", "ar": "الرئيسية" }
        }});
        assert_eq!(PageChrome::derive(&doc, Locale::Ar).title.as_deref(), Some("الرئيسية"));
        // No fallback to the other locale: English tab title is empty.
        assert_eq!(PageChrome::derive(&doc, Locale::En).title, None);
    }

    #[test]
    fn test_title_falls_back_to_site_title() {
        let doc = json!({ "site": { "title": { "en": "Acme", "ar": "أكمي" }, "tabTitle": { "en": "", "ar": "" } } });
        assert_eq!(PageChrome::derive(&doc, Locale::En).title.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_favicon() {
        let doc = json!({ "site": { "favicon": "/icon.png" } });
        assert_eq!(PageChrome::derive(&doc, Locale::En).favicon.as_deref(), Some("/icon.png"));
        let doc = json!({ "site": { "favicon": "" } });
        assert_eq!(PageChrome::derive(&doc, Locale::En).favicon, None);
    }
}
