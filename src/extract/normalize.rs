use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

use crate::semantic::normalize_whitespace;
use crate::util::now_utc_string;

/// Coerces one raw provider candidate into the canonical shape expected by
/// the validator. Normalization never rejects; it only repairs encodings.
/// Anything it cannot coerce is left for schema validation to judge.
pub fn normalize_candidate(raw: &Value) -> Value {
    let Value::Object(source) = raw else {
        return raw.clone();
    };
    let mut out = source.clone();

    out.insert(
        "source_text".to_string(),
        Value::String(normalize_source_text(source.get("source_text"))),
    );
    out.insert(
        "source_pages".to_string(),
        Value::Array(
            normalize_source_pages(source.get("source_pages"))
                .into_iter()
                .map(|page| json!(page))
                .collect(),
        ),
    );
    out.insert(
        "confidence".to_string(),
        json!(normalize_confidence(source.get("confidence"))),
    );

    let timestamp = source
        .get("extracted_at")
        .or_else(|| source.get("extractedAt"))
        .or_else(|| source.get("timestamp"));
    out.insert(
        "extracted_at".to_string(),
        Value::String(normalize_timestamp(timestamp)),
    );
    out.remove("extractedAt");
    out.remove("timestamp");

    out.insert(
        "rule_data".to_string(),
        normalize_rule_data(source.get("rule_data")),
    );

    if let Some(Value::Array(conflicts)) = source.get("conflicting_candidates") {
        let normalized = conflicts.iter().map(normalize_candidate).collect();
        out.insert("conflicting_candidates".to_string(), Value::Array(normalized));
    }

    Value::Object(out)
}

fn normalize_timestamp(value: Option<&Value>) -> String {
    let Some(raw) = value.and_then(Value::as_str) else {
        return now_utc_string();
    };
    let trimmed = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return parsed.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = parsed.and_hms_opt(0, 0, 0) {
            return midnight.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true);
        }
    }

    now_utc_string()
}

fn normalize_source_text(value: Option<&Value>) -> String {
    let raw = value.and_then(Value::as_str).unwrap_or("");
    let unquoted = raw.trim().trim_matches(|character: char| {
        matches!(
            character,
            '"' | '\'' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}'
        )
    });
    normalize_whitespace(unquoted)
}

fn normalize_source_pages(value: Option<&Value>) -> Vec<u32> {
    let entries: Vec<&Value> = match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single @ (Value::Number(_) | Value::String(_))) => vec![single],
        _ => Vec::new(),
    };

    entries.into_iter().filter_map(coerce_page).collect()
}

fn coerce_page(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    if number.is_finite() && number >= 1.0 {
        Some(number.round() as u32)
    } else {
        None
    }
}

fn normalize_confidence(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64().map(rescale_overscale),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if let Some(percent) = trimmed.strip_suffix('%') {
                percent.trim().parse::<f64>().ok().map(|v| v / 100.0)
            } else {
                trimmed.parse::<f64>().ok().map(rescale_overscale)
            }
        }
        _ => None,
    };

    let confidence = parsed.unwrap_or(0.0);
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn rescale_overscale(value: f64) -> f64 {
    if value > 1.0 { value / 100.0 } else { value }
}

/// Tagged-shape coercion for provider-specific `rule_data` payloads. One
/// explicit coercion per known shape; unrecognized shapes pass through
/// unchanged so schema validation decides their fate.
pub fn normalize_rule_data(value: Option<&Value>) -> Value {
    let Some(Value::Object(data)) = value else {
        return value.cloned().unwrap_or(Value::Null);
    };
    let parent_unit = data.get("unit").and_then(Value::as_str);

    if let Some(Value::Array(entries)) = data.get("slab").or_else(|| data.get("slabs")) {
        let slabs: Vec<Value> = entries
            .iter()
            .filter_map(|entry| canonical_slab_entry(entry, parent_unit))
            .collect();
        return json!({ "slabs": slabs });
    }

    if data.contains_key("rate") {
        let mut out = data.clone();
        if let Some(rate) = data.get("rate").and_then(parse_numeric_value) {
            out.insert("rate".to_string(), json!(rate));
        }
        ensure_unit(&mut out, "percent");
        return Value::Object(out);
    }

    if data.contains_key("value") {
        let mut out = data.clone();
        if let Some(value) = data.get("value").and_then(parse_numeric_value) {
            out.insert("value".to_string(), json!(value));
        }
        ensure_unit(&mut out, "inr");
        return Value::Object(out);
    }

    Value::Object(data.clone())
}

fn ensure_unit(data: &mut Map<String, Value>, default_unit: &str) {
    let missing = !matches!(data.get("unit"), Some(Value::String(unit)) if !unit.trim().is_empty());
    if missing {
        data.insert("unit".to_string(), json!(default_unit));
    }
}

fn canonical_slab_entry(entry: &Value, parent_unit: Option<&str>) -> Option<Value> {
    let Value::Object(fields) = entry else {
        return None;
    };

    let from = first_field(fields, &["from", "min", "lower", "start"])
        .and_then(parse_numeric_value)
        .unwrap_or(0.0);
    let to = first_field(fields, &["to", "max", "upper", "end"]).and_then(parse_numeric_value);
    let rate = first_field(fields, &["rate", "tax_rate", "percentage"]).and_then(parse_rate_value)?;
    let unit = fields
        .get("unit")
        .and_then(Value::as_str)
        .or(parent_unit)
        .unwrap_or("percent");

    Some(json!({ "from": from, "to": to, "rate": rate, "unit": unit }))
}

fn first_field<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| fields.get(*key))
}

/// Rate-specific numeric coercion: explicit percent strings keep their
/// magnitude; bare fractions ≤ 1 are un-multiplied percentages, rescaled.
fn parse_rate_value(value: &Value) -> Option<f64> {
    match value {
        Value::String(text) if text.contains('%') => parse_numeric_value(value),
        _ => parse_numeric_value(value).map(|rate| {
            if (0.0..=1.0).contains(&rate) {
                rate * 100.0
            } else {
                rate
            }
        }),
    }
}

fn parse_numeric_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let cleaned: String = text
                .trim()
                .chars()
                .filter(|character| {
                    !matches!(*character, ',' | '%' | '\u{20B9}') && !character.is_whitespace()
                })
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_string_confidence_divides_by_hundred() {
        assert_eq!(normalize_confidence(Some(&json!("92%"))), 0.92);
    }

    #[test]
    fn overscale_numeric_confidence_is_treated_as_percentage() {
        assert_eq!(normalize_confidence(Some(&json!(85))), 0.85);
        assert_eq!(normalize_confidence(Some(&json!(0.85))), 0.85);
    }

    #[test]
    fn non_numeric_confidence_becomes_zero() {
        assert_eq!(normalize_confidence(Some(&json!("high"))), 0.0);
        assert_eq!(normalize_confidence(None), 0.0);
    }

    #[test]
    fn confidence_is_clamped_to_unit_interval() {
        assert_eq!(normalize_confidence(Some(&json!("250%"))), 1.0);
        assert_eq!(normalize_confidence(Some(&json!(-0.3))), 0.0);
    }

    #[test]
    fn source_pages_drop_non_numeric_entries() {
        let pages = normalize_source_pages(Some(&json!([3, "7", "appendix", null, 0])));
        assert_eq!(pages, vec![3, 7]);
    }

    #[test]
    fn bare_page_number_becomes_single_entry_list() {
        assert_eq!(normalize_source_pages(Some(&json!(12))), vec![12]);
    }

    #[test]
    fn source_text_strips_wrapping_quotes_and_collapses_whitespace() {
        let normalized =
            normalize_source_text(Some(&json!("\u{201C}the  rate of\n tax is  fifteen percent\u{201D}")));
        assert_eq!(normalized, "the rate of tax is fifteen percent");
    }

    #[test]
    fn valid_timestamps_pass_through_as_rfc3339() {
        let normalized = normalize_timestamp(Some(&json!("2026-03-01T10:30:00Z")));
        assert_eq!(normalized, "2026-03-01T10:30:00Z");
    }

    #[test]
    fn unparseable_timestamp_defaults_to_now() {
        let normalized = normalize_timestamp(Some(&json!("last tuesday")));
        assert!(normalized.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&normalized).is_ok());
    }

    #[test]
    fn slab_shape_with_percent_strings_becomes_canonical_numeric_slabs() {
        let raw = json!({
            "slab": [
                { "from": "0", "to": "2,50,000", "rate": "0%" },
                { "min": 250000, "max": 500000, "tax_rate": "5%" },
                { "from": 500000, "to": null, "rate": 0.3 }
            ]
        });
        let normalized = normalize_rule_data(Some(&raw));

        let slabs = normalized["slabs"].as_array().expect("slabs array");
        assert_eq!(slabs.len(), 3);
        assert_eq!(slabs[0]["from"], json!(0.0));
        assert_eq!(slabs[0]["to"], json!(250000.0));
        assert_eq!(slabs[0]["rate"], json!(0.0));
        assert_eq!(slabs[1]["rate"], json!(5.0));
        // fractional rate is an un-multiplied percentage
        assert_eq!(slabs[2]["rate"], json!(30.0));
        assert_eq!(slabs[2]["to"], Value::Null);
        assert_eq!(slabs[2]["unit"], json!("percent"));
    }

    #[test]
    fn rate_shape_coerces_percent_string() {
        let normalized = normalize_rule_data(Some(&json!({ "rate": "12%", "applies_to": "royalties" })));
        assert_eq!(normalized["rate"], json!(12.0));
        assert_eq!(normalized["unit"], json!("percent"));
        assert_eq!(normalized["applies_to"], json!("royalties"));
    }

    #[test]
    fn unrecognized_shape_passes_through_unchanged() {
        let raw = json!({ "term": "assessee", "definition": "a person by whom tax is payable" });
        assert_eq!(normalize_rule_data(Some(&raw)), raw);
    }

    #[test]
    fn normalize_candidate_recurses_into_conflicting_candidates() {
        let raw = json!({
            "rule_type": "rate",
            "status": "unclear",
            "source_pages": ["4"],
            "source_text": "\"surcharge of 15% applies\"",
            "confidence": "40%",
            "ambiguity_reason": "two rates for the same condition",
            "conflicting_candidates": [
                {
                    "rule_type": "rate",
                    "status": "candidate",
                    "source_pages": [4],
                    "source_text": "surcharge of 15% applies",
                    "confidence": 60,
                    "rule_data": { "rate": "15%" }
                }
            ],
            "rule_data": { "rate": "15%" }
        });

        let normalized = normalize_candidate(&raw);
        assert_eq!(normalized["confidence"], json!(0.4));
        assert_eq!(normalized["source_pages"], json!([4]));
        assert!(normalized["extracted_at"].is_string());

        let nested = &normalized["conflicting_candidates"][0];
        assert_eq!(nested["confidence"], json!(0.6));
        assert_eq!(nested["rule_data"]["rate"], json!(15.0));
        assert!(nested["extracted_at"].is_string());
    }

    #[test]
    fn timestamp_aliases_are_folded_into_extracted_at() {
        let raw = json!({ "timestamp": "2026-01-15", "source_text": "x" });
        let normalized = normalize_candidate(&raw);
        assert_eq!(normalized["extracted_at"], json!("2026-01-15T00:00:00Z"));
        assert!(normalized.get("timestamp").is_none());
    }
}
