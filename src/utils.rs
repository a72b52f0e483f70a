use chrono::{Datelike, Months, NaiveDate};
use serde_json::Value;
use std::ops::RangeInclusive;

pub const MONTH_LABELS: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

const SCENARIO_FILLER_WORDS: [&str; 4] = ["META", "OBJETIVO", "ESCENARIO", "ANUAL"];

/// Coerces a loosely typed JSON value into a finite number.
///
/// Numbers and numeric strings are accepted. Anything else (null, booleans,
/// empty or unparsable strings, NaN, infinities) is `None`, so a missing
/// observation never turns into a zero downstream.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().and_then(finite),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().and_then(finite)
}

pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Anything that can be placed on the (year, month) calendar.
pub trait Chronological {
    fn year(&self) -> Option<i32>;
    fn month(&self) -> Option<u32>;
}

/// Returns a chronologically ordered copy of `records`, keyed by
/// `(year, month)` with a missing month sorting first within its year.
/// The sort is stable and the input is left untouched.
pub fn sort_chronological<T: Chronological + Clone>(records: &[T]) -> Vec<T> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| (r.year().unwrap_or(0), r.month().unwrap_or(0)));
    sorted
}

pub fn month_label(month: u32) -> &'static str {
    match month {
        1..=12 => MONTH_LABELS[(month - 1) as usize],
        _ => "",
    }
}

pub fn quarter_of(month: u32) -> u32 {
    (month.saturating_sub(1)) / 3 + 1
}

pub fn quarter_months(quarter: u32) -> RangeInclusive<u32> {
    let first = (quarter.saturating_sub(1)) * 3 + 1;
    first..=first + 2
}

/// Shifts a calendar month forward by `months`.
pub fn add_months(year: i32, month: u32, months: u32) -> Option<(i32, u32)> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)?.checked_add_months(Months::new(months))?;
    Some((date.year(), date.month()))
}

/// Shifts a calendar month backward by `months`.
pub fn sub_months(year: i32, month: u32, months: u32) -> Option<(i32, u32)> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)?.checked_sub_months(Months::new(months))?;
    Some((date.year(), date.month()))
}

/// `numerator / denominator`, or `None` when the denominator is zero or the
/// result would not be finite.
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    finite(numerator / denominator)
}

/// Difference and relative difference of `current` against `basis`.
pub fn diff_and_pct(current: Option<f64>, basis: Option<f64>) -> (Option<f64>, Option<f64>) {
    match (current, basis) {
        (Some(c), Some(b)) => {
            let diff = c - b;
            (finite(diff), safe_ratio(diff, b))
        }
        _ => (None, None),
    }
}

pub fn sum_present(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let present: Vec<f64> = values.into_iter().flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum())
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    finite(values.iter().sum::<f64>() / values.len() as f64)
}

fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'Á' | 'À' | 'Ä' | 'Â' | 'Ã' => 'A',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'O',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ç' => 'c',
        'Ç' => 'C',
        other => other,
    }
}

/// Lowercases and strips Spanish diacritics.
pub fn fold_text(text: &str) -> String {
    text.chars().map(fold_char).collect::<String>().to_lowercase()
}

/// Canonical key for a scenario label.
///
/// Matching is case and diacritic insensitive and ignores the filler words
/// META, OBJETIVO, ESCENARIO and ANUAL, so "Meta Bajo", "escenario bajo" and
/// "BAJO" all map to `BAJO`. A label made only of filler words keeps them.
pub fn normalize_scenario_key(label: &str) -> String {
    let folded = fold_text(label).to_uppercase();
    let words: Vec<&str> = folded
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|w| !w.is_empty())
        .collect();

    let meaningful: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| !SCENARIO_FILLER_WORDS.contains(w))
        .collect();

    if meaningful.is_empty() {
        words.join(" ")
    } else {
        meaningful.join(" ")
    }
}
