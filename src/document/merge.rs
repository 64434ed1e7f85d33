//! Deep merge of configuration trees.

use serde_json::Value;

/// Merge `overlay` onto `base`.
///
/// Where both sides hold an object the merge recurses; any other overlay
/// value (arrays included) replaces the base value wholesale. A non-object
/// base is replaced by the overlay, and a non-object overlay leaves the base
/// untouched.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(_), Value::Object(_)) => {
            let mut out = base.clone();
            merge_into(&mut out, overlay);
            out
        }
        (Value::Object(_), _) => base.clone(),
        _ => overlay.clone(),
    }
}

fn merge_into(target: &mut Value, overlay: &Value) {
    let (Value::Object(target_map), Value::Object(overlay_map)) = (target, overlay) else {
        return;
    };
    for (key, ov) in overlay_map {
        let recurse = ov.is_object() && target_map.get(key).is_some_and(Value::is_object);
        if recurse {
            if let Some(bv) = target_map.get_mut(key) {
                merge_into(bv, ov);
            }
        } else {
            target_map.insert(key.clone(), ov.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overlay_leaves_win_and_base_leaves_survive() {
        let base = json!({
            "site": { "title": { "en": "Base", "ar": "أساس" }, "lang": "ar" },
            "theme": { "primary": "#111111", "secondary": "#222222" }
        });
        let overlay = json!({
            "site": { "title": { "en": "Override" } },
            "theme": { "primary": "#ABCDEF" }
        });

        let merged = deep_merge(&base, &overlay);
        assert_eq!(merged["site"]["title"]["en"], "Override");
        assert_eq!(merged["site"]["title"]["ar"], "أساس");
        assert_eq!(merged["site"]["lang"], "ar");
        assert_eq!(merged["theme"]["primary"], "#ABCDEF");
        assert_eq!(merged["theme"]["secondary"], "#222222");
    }

    #[test]
    fn test_arrays_replace_wholesale() {
        let base = json!({ "sections": { "services": { "items": [1, 2, 3], "enabled": true } } });
        let overlay = json!({ "sections": { "services": { "items": [9] } } });

        let merged = deep_merge(&base, &overlay);
        assert_eq!(merged["sections"]["services"]["items"], json!([9]));
        assert_eq!(merged["sections"]["services"]["enabled"], true);
    }

    #[test]
    fn test_type_changes_take_overlay_value() {
        let base = json!({ "a": { "b": 1 }, "c": "text" });
        let overlay = json!({ "a": "flat", "c": { "nested": true } });
        assert_eq!(deep_merge(&base, &overlay), json!({ "a": "flat", "c": { "nested": true } }));
    }

    #[test]
    fn test_non_object_roots() {
        let base = json!({ "a": 1 });
        assert_eq!(deep_merge(&base, &json!([1, 2])), base);
        assert_eq!(deep_merge(&json!(null), &json!({ "a": 2 })), json!({ "a": 2 }));
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let base = json!({ "a": { "b": 1 } });
        let overlay = json!({ "a": { "c": 2 } });
        let _ = deep_merge(&base, &overlay);
        assert_eq!(base, json!({ "a": { "b": 1 } }));
        assert_eq!(overlay, json!({ "a": { "c": 2 } }));
    }
}
