use crate::error::{IndicatorError, Result};
use crate::schema::{HistoryRecord, TargetRecord};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const DEFAULT_PLAN_SCENARIO: &str = "META";

/// Serde-compatible deserializers for use with `#[serde(deserialize_with = "de::...")]`.
///
/// The data store hands back numerics as numbers, numeric strings or null.
/// Every helper here maps unparsable input to `None` instead of failing the
/// whole payload.
pub mod de {
    use crate::utils::{parse_number, to_number};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// 15 → Some(15.0), "15.5" → Some(15.5), "abc" / null → None
    pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(to_number(&value))
    }

    /// 2024 → Some(2024), "2024" → Some(2024), 2024.5 / 0 / "x" → None
    pub fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(to_number(&value)
            .filter(|v| v.fract() == 0.0 && *v > 0.0 && *v <= i32::MAX as f64)
            .map(|v| v as i32))
    }

    /// 1..=12 → Some(month), 0 / null / out of range → None
    pub fn lenient_month<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(to_number(&value)
            .filter(|v| v.fract() == 0.0 && (1.0..=12.0).contains(v))
            .map(|v| v as u32))
    }

    /// true / "true" / 1 → true, everything else → false
    pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Bool(b) => b,
            Value::String(s) => {
                let s = s.trim().to_lowercase();
                s == "true" || parse_number(&s).is_some_and(|n| n != 0.0)
            }
            other => to_number(&other).is_some_and(|n| n != 0.0),
        })
    }

    /// "Meta Programada" → Some(..), "" / null → None
    pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Like `lenient_string`, with a missing label becoming the empty string.
    pub fn lenient_label<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(lenient_string(deserializer)?.unwrap_or_default())
    }
}

fn parse_record_array<T: DeserializeOwned>(json: &str, what: &str) -> Result<Vec<T>> {
    let value: Value = serde_json::from_str(json)?;
    match value {
        Value::Array(items) => {
            let mut records = Vec::with_capacity(items.len());
            for (idx, item) in items.into_iter().enumerate() {
                if !item.is_object() {
                    return Err(IndicatorError::InvalidInput(format!(
                        "{} entry #{} is not an object",
                        what, idx
                    )));
                }
                records.push(serde_json::from_value(item)?);
            }
            debug!("Parsed {} {} records", records.len(), what);
            Ok(records)
        }
        Value::Null => Ok(Vec::new()),
        other => Err(IndicatorError::InvalidInput(format!(
            "expected an array of {} records, got {}",
            what,
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parses the history payload returned by the data store. A `null` payload is
/// an empty history; any other non-array shape is rejected.
pub fn parse_history_json(json: &str) -> Result<Vec<HistoryRecord>> {
    parse_record_array(json, "history")
}

pub fn parse_targets_json(json: &str) -> Result<Vec<TargetRecord>> {
    parse_record_array(json, "target")
}

/// Separates observed rows from planned (`es_meta`) rows, converting the
/// latter into scenario targets. Rows without a scenario label fall under
/// [`DEFAULT_PLAN_SCENARIO`].
pub fn split_target_rows(records: &[HistoryRecord]) -> (Vec<HistoryRecord>, Vec<TargetRecord>) {
    let mut observed = Vec::new();
    let mut planned = Vec::new();

    for record in records {
        if record.is_target {
            planned.push(TargetRecord {
                year: record.year,
                month: record.month,
                scenario: record
                    .scenario
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PLAN_SCENARIO.to_string()),
                value: record.value,
            });
        } else {
            observed.push(record.clone());
        }
    }

    (observed, planned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_history_json_mixed_types() {
        let json = r#"[
            {"anio": 2024, "mes": 1, "valor": 10},
            {"anio": "2024", "mes": "2", "valor": "12.5"},
            {"anio": 2024, "mes": 3, "valor": "abc"},
            {"anio": 2024, "mes": null, "valor": 40, "es_meta": true}
        ]"#;

        let records = parse_history_json(json).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[1].month, Some(2));
        assert_eq!(records[1].value, Some(12.5));
        assert_eq!(records[2].value, None);
        assert_eq!(records[3].month, None);
        assert!(records[3].is_target);
    }

    #[test]
    fn test_parse_rejects_non_array() {
        let result = parse_history_json(r#"{"anio": 2024}"#);
        assert!(matches!(result, Err(IndicatorError::InvalidInput(_))));

        let result = parse_targets_json(r#"[1, 2]"#);
        assert!(matches!(result, Err(IndicatorError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_null_is_empty() {
        assert!(parse_history_json("null").unwrap().is_empty());
    }

    #[test]
    fn test_parse_targets_json() {
        let json = r#"[{"anio": 2024, "mes": 3, "escenario": "Meta Bajo", "valor": "10"}]"#;
        let targets = parse_targets_json(json).unwrap();
        assert_eq!(targets[0].scenario, "Meta Bajo");
        assert_eq!(targets[0].value, Some(10.0));
    }

    #[test]
    fn test_split_target_rows() {
        let records = vec![
            HistoryRecord::observed(2024, 1, 5.0),
            HistoryRecord::planned(2024, 3, "Meta Programada", 25.0),
            HistoryRecord {
                scenario: None,
                ..HistoryRecord::planned(2024, 6, "", 50.0)
            },
        ];

        let (observed, planned) = split_target_rows(&records);
        assert_eq!(observed.len(), 1);
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].scenario, "Meta Programada");
        assert_eq!(planned[1].scenario, DEFAULT_PLAN_SCENARIO);
    }
}
