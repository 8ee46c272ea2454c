//! Tolerant field extraction for provider payloads
//!
//! The same logical field arrives under different key spellings depending on
//! the endpoint and account type, and numbers are frequently digit-grouped
//! strings ("1,234,567"). Helpers here try candidate keys in order and
//! normalize what they find instead of failing the whole response.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Keys that may carry an instrument's display name, most specific first
const NAME_KEYS: [&str; 6] = [
    "hts_kor_isnm",
    "itms_nm",
    "prdt_name",
    "kor_isnm",
    "stock_name",
    "stck_shrn_iscd",
];

/// Keys under which the provider nests the payload section
const SECTION_KEYS: [&str; 3] = ["output2", "output", "Output"];

/// First non-blank string found under any of `keys`, trimmed.
/// Bare numbers are accepted and stringified.
pub fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        let text = match value.get(key) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => continue,
        };
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

/// First parseable decimal under any of `keys`. Grouping commas are ignored.
pub fn decimal_field(value: &Value, keys: &[&str]) -> Option<Decimal> {
    let text = string_field(value, keys)?;
    parse_decimal(&text)
}

/// First parseable integer under any of `keys`. Grouping commas are ignored.
pub fn int_field(value: &Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        match value.get(key) {
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    return Some(i);
                }
            }
            Some(Value::String(s)) => {
                let cleaned: String = s.chars().filter(|c| *c != ',').collect();
                if let Ok(i) = cleaned.trim().parse::<i64>() {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Decimal from provider text, stripping grouping commas. None when the
/// remainder is blank or unparseable.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(cleaned).ok()
}

/// The object-valued payload section of a response, if any.
pub fn section_map(root: &Value) -> Option<&Value> {
    SECTION_KEYS
        .iter()
        .filter_map(|key| root.get(*key))
        .find(|v| v.is_object())
}

/// The array-valued payload section of a response, as a slice.
pub fn section_list(root: &Value) -> Option<&Vec<Value>> {
    SECTION_KEYS
        .iter()
        .filter_map(|key| root.get(*key))
        .find_map(|v| v.as_array())
}

/// Display name for an instrument, tried across the provider's name keys.
///
/// Candidates that merely echo the code, look like a bare short code, or are
/// product-type abbreviations are skipped; they show up in ranking rows where
/// the real name field is absent.
pub fn instrument_name(entry: &Value, code: &str) -> Option<String> {
    for key in NAME_KEYS {
        let Some(text) = string_field(entry, &[key]) else {
            continue;
        };
        if text.eq_ignore_ascii_case(code) {
            continue;
        }
        if text.len() == 6 && text.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let upper = text.to_ascii_uppercase();
        if matches!(upper.as_str(), "ETF" | "ELW" | "ETN") {
            continue;
        }
        return Some(text);
    }
    None
}

/// Instrument name with a code-derived placeholder for unnamed rows.
pub fn display_name(entry: &Value, code: &str) -> String {
    instrument_name(entry, code).unwrap_or_else(|| format!("#{code}"))
}

/// Human-readable rejection detail from a provider error payload.
pub fn provider_detail(payload: &Value) -> String {
    if let Some(msg) = string_field(payload, &["msg1"]) {
        let rt_cd = string_field(payload, &["rt_cd"]).unwrap_or_default();
        let msg_cd = string_field(payload, &["msg_cd"]).unwrap_or_default();
        return format!("rt_cd={rt_cd} msg_cd={msg_cd} msg1={msg}");
    }
    if let Some(err) = string_field(payload, &["error", "error_code"]) {
        let description = string_field(payload, &["error_description"]).unwrap_or_default();
        return format!("error={err} {description}").trim_end().to_string();
    }
    if let Some(rt_cd) = string_field(payload, &["rt_cd"]) {
        return format!("rt_cd={rt_cd}");
    }
    "(no detail in response)".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn string_field_first_non_blank_wins() {
        let value = json!({"a": "  ", "b": " hello ", "c": "later"});
        assert_eq!(string_field(&value, &["a", "b", "c"]), Some("hello".to_string()));
        assert_eq!(string_field(&value, &["missing"]), None);
    }

    #[test]
    fn numbers_parse_with_grouping_commas() {
        let value = json!({"price": "71,500", "vol": "12,345,678", "neg": "-0.42"});
        assert_eq!(decimal_field(&value, &["price"]), Some(dec!(71500)));
        assert_eq!(int_field(&value, &["vol"]), Some(12_345_678));
        assert_eq!(decimal_field(&value, &["neg"]), Some(dec!(-0.42)));
    }

    #[test]
    fn int_field_accepts_json_numbers() {
        let value = json!({"expires_in": 86400});
        assert_eq!(int_field(&value, &["expires_in"]), Some(86400));
    }

    #[test]
    fn unparseable_numbers_become_none() {
        let value = json!({"price": "n/a", "blank": ""});
        assert_eq!(decimal_field(&value, &["price"]), None);
        assert_eq!(decimal_field(&value, &["blank"]), None);
    }

    #[test]
    fn section_lookup_prefers_output2_and_matches_shape() {
        let root = json!({"output": {"a": 1}, "output2": [{"b": 2}]});
        assert!(section_map(&root).is_some_and(|v| v.get("a").is_some()));
        assert!(section_list(&root).is_some_and(|v| v.len() == 1));

        let only_map = json!({"output": {"a": 1}});
        assert!(section_map(&only_map).is_some());
        assert!(section_list(&only_map).is_none());
    }

    #[test]
    fn instrument_name_skips_code_echo_and_type_tags() {
        let entry = json!({
            "stck_shrn_iscd": "005930",
            "prdt_name": "ETF",
            "itms_nm": "Samsung Electronics"
        });
        assert_eq!(
            instrument_name(&entry, "005930"),
            Some("Samsung Electronics".to_string())
        );

        let unnamed = json!({"stck_shrn_iscd": "005930"});
        assert_eq!(instrument_name(&unnamed, "005930"), None);
        assert_eq!(display_name(&unnamed, "005930"), "#005930");
    }

    #[test]
    fn provider_detail_formats_known_shapes() {
        let rejected = json!({"rt_cd": "1", "msg_cd": "EGW00123", "msg1": "expired token"});
        assert_eq!(provider_detail(&rejected), "rt_cd=1 msg_cd=EGW00123 msg1=expired token");

        let oauth = json!({"error": "invalid_client", "error_description": "bad secret"});
        assert_eq!(provider_detail(&oauth), "error=invalid_client bad secret");

        assert_eq!(provider_detail(&json!({})), "(no detail in response)");
    }
}
