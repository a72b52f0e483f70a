use anyhow::Result;
use indicator_history_builder::*;

/// Two years of monthly aircraft operations, as exported from the data store.
/// March 2024 was recorded without a value and June 2024 with garbage.
const OPERATIONS_CSV: &str = "\
anio,mes,valor
2023,1,1200
2023,2,1150
2023,3,1300
2023,4,1280
2023,5,1320
2023,6,1400
2023,7,1500
2023,8,1480
2023,9,1350
2023,10,1330
2023,11,1390
2023,12,1600
2024,1,1260
2024,2,1210
2024,3,
2024,4,1350
2024,5,1390
2024,6,n/d
2024,7,1580
";

fn load_history(data: &str) -> Result<Vec<HistoryRecord>> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

fn approx(actual: Option<f64>, expected: f64) -> bool {
    actual.is_some_and(|v| (v - expected).abs() < 1e-9)
}

#[test]
fn test_fixture_loads_with_unparsable_values() -> Result<()> {
    let history = load_history(OPERATIONS_CSV)?;
    assert_eq!(history.len(), 19);
    assert_eq!(history[14].value, None);
    assert_eq!(history[17].value, None);

    let index = HistoryIndex::build(&history);
    assert_eq!(index.skipped(), 2);
    assert_eq!(index.by_year.latest_month(2024), Some(7));
    Ok(())
}

#[test]
fn test_unparsable_value_produces_no_row() -> Result<()> {
    let history = parse_history_json(r#"[{"anio": 2024, "mes": 1, "valor": "abc"}]"#)?;
    let result = aggregate(
        ComparisonType::Monthly,
        &history,
        &[],
        &AggregationOptions::default(),
    )?;

    assert!(result.rows.is_empty());
    assert!(result.totals.is_none());
    Ok(())
}

#[test]
fn test_year_over_year_month() -> Result<()> {
    let history = parse_history_json(
        r#"[{"anio": 2023, "mes": 6, "valor": 100}, {"anio": 2024, "mes": 6, "valor": 120}]"#,
    )?;
    let result = aggregate(
        ComparisonType::Monthly,
        &history,
        &[],
        &AggregationOptions::default(),
    )?;

    let row = &result.rows[0];
    assert_eq!(row.label, "Jun 2024");
    assert_eq!(row.current_value, Some(120.0));
    assert_eq!(row.comparison_value, Some(100.0));
    assert!(approx(row.diff, 20.0));
    assert!(approx(row.pct, 0.2));
    Ok(())
}

#[test]
fn test_monthly_operations_skip_missing_months() -> Result<()> {
    let history = load_history(OPERATIONS_CSV)?;
    let result = aggregate(
        ComparisonType::Monthly,
        &history,
        &[],
        &AggregationOptions::default(),
    )?;

    let labels: Vec<&str> = result.rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["Ene 2024", "Feb 2024", "Abr 2024", "May 2024", "Jul 2024"]
    );
    assert_eq!(result.latest_month, Some(7));

    let totals = result.totals.as_ref().expect("totals");
    assert!(approx(totals.current_value, 6790.0));
    assert!(approx(totals.comparison_value, 6450.0));
    Ok(())
}

#[test]
fn test_quarters_require_complete_months() -> Result<()> {
    let history = load_history(OPERATIONS_CSV)?;
    let result = aggregate(
        ComparisonType::Quarterly,
        &history,
        &[],
        &AggregationOptions::default(),
    )?;

    // Q1 lacks March and Q2 lacks June; Q3 is outside the window.
    assert!(result.rows.is_empty());

    let complete: Vec<HistoryRecord> = (1..=7)
        .map(|month| HistoryRecord::observed(2024, month, 10.0))
        .collect();
    let result = aggregate(
        ComparisonType::Quarterly,
        &complete,
        &[],
        &AggregationOptions::default(),
    )?;
    assert_eq!(result.rows.len(), 2);
    assert!(result.forecast.is_none());
    Ok(())
}

#[test]
fn test_annual_year_to_date() -> Result<()> {
    let history = load_history(OPERATIONS_CSV)?;
    let result = aggregate(
        ComparisonType::Annual,
        &history,
        &[],
        &AggregationOptions::default(),
    )?;

    assert_eq!(result.rows.len(), 1);
    let row = &result.rows[0];
    assert!(approx(row.current_value, 6790.0));
    // Prior year sums January through July, including the months missing in 2024.
    assert!(approx(row.comparison_value, 9150.0));
    Ok(())
}

#[test]
fn test_reference_scenario_takes_priority() -> Result<()> {
    let history = vec![
        HistoryRecord::observed(2023, 1, 10.0),
        HistoryRecord::observed(2024, 1, 12.0),
    ];
    let targets = parse_targets_json(
        r#"[{"anio": 2024, "mes": 1, "escenario": "Meta Bajo", "valor": "15"}]"#,
    )?;
    let options = AggregationOptions {
        diff_scenario: Some("bajo".to_string()),
        ..AggregationOptions::default()
    };

    let result = aggregate(ComparisonType::Monthly, &history, &targets, &options)?;
    let row = &result.rows[0];
    assert_eq!(row.comparison_value, Some(10.0));
    assert_eq!(row.reference_value, Some(15.0));
    assert!(approx(row.diff, -3.0));
    assert!(approx(row.pct, -0.2));
    Ok(())
}

#[test]
fn test_percentages_never_leak_non_finite() -> Result<()> {
    let history = vec![
        HistoryRecord::observed(2023, 1, 0.0),
        HistoryRecord::observed(2023, 2, 0.0),
        HistoryRecord::observed(2024, 1, 5.0),
        HistoryRecord::observed(2024, 2, 0.0),
    ];

    for comparison in [
        ComparisonType::Monthly,
        ComparisonType::Annual,
        ComparisonType::Scenario,
    ] {
        let result = aggregate(comparison, &history, &[], &AggregationOptions::default())?;
        for row in &result.rows {
            assert!(row.pct.map_or(true, f64::is_finite));
        }
        if let Some(totals) = &result.totals {
            assert!(totals.pct.map_or(true, f64::is_finite));
        }
    }

    let result = aggregate(
        ComparisonType::Monthly,
        &history,
        &[],
        &AggregationOptions::default(),
    )?;
    assert_eq!(result.rows[0].pct, None);
    assert_eq!(result.rows[0].diff, Some(5.0));
    Ok(())
}

#[test]
fn test_scenario_comparison_totals_are_achievement() -> Result<()> {
    let history = vec![
        HistoryRecord::observed(2024, 1, 45.0),
        HistoryRecord::observed(2024, 2, 45.0),
    ];
    let targets = vec![TargetRecord::monthly(2024, 1, "ALTO", 50.0)];
    let options = AggregationOptions {
        scenario: Some("Escenario Alto".to_string()),
        ..AggregationOptions::new(ComparisonType::Scenario)
    };

    let result = aggregate(ComparisonType::Scenario, &history, &targets, &options)?;
    assert_eq!(result.rows[1].comparison_value, Some(50.0));

    let totals = result.totals.as_ref().expect("totals");
    assert!(approx(totals.comparison_value, 100.0));
    assert!(approx(totals.pct, 0.9));
    assert_eq!(result.comparison_label, "2024 vs ALTO");
    Ok(())
}

#[test]
fn test_forecast_follows_history() -> Result<()> {
    let history = load_history(OPERATIONS_CSV)?;
    let result = aggregate(
        ComparisonType::Monthly,
        &history,
        &[],
        &AggregationOptions::default(),
    )?;

    let forecast = result.forecast.as_ref().expect("forecast");
    assert_eq!(forecast.rows.len(), DEFAULT_FORECAST_PERIODS);
    assert_eq!(forecast.rows[0].label, "Ago 2024");
    assert_eq!(forecast.rows[5].label, "Ene 2025");
    assert!(forecast
        .rows
        .iter()
        .all(|r| r.is_forecast() && r.current_value.is_some_and(f64::is_finite)));
    assert!(matches!(forecast.method, ForecastMethod::HoltWinters { .. }));

    let again = aggregate(
        ComparisonType::Monthly,
        &history,
        &[],
        &AggregationOptions::default(),
    )?;
    assert_eq!(again.forecast, result.forecast);
    Ok(())
}

#[test]
fn test_fauna_indicator_profile() -> Result<()> {
    let profile = IndicatorProfile::new("SMS-01", "Tasa de impactos con fauna");
    let history = vec![
        HistoryRecord::observed(2023, 1, 1.0),
        HistoryRecord::observed(2023, 2, 3.0),
        HistoryRecord::observed(2024, 1, 2.0),
        HistoryRecord::observed(2024, 2, 2.0),
    ];
    let targets = vec![
        TargetRecord::monthly(2024, 1, "Meta Bajo", 1.5),
        TargetRecord::monthly(2024, 1, "Meta Alto", 3.0),
    ];

    let result = process_indicator(&profile, &history, &targets, &AggregationOptions::default())?;
    let totals = result.totals.as_ref().expect("totals");
    assert!(approx(totals.current_value, 2.0));
    assert!(approx(totals.comparison_value, 2.0));
    assert!(approx(totals.reference_value, 1.5));
    assert!(result.comparison_label.ends_with("(referencia: Meta Bajo)"));
    Ok(())
}

#[test]
fn test_fauna_indicator_scenario_defaults_to_low() -> Result<()> {
    let profile = IndicatorProfile::new("SMS-01", "Tasa de impactos con fauna");
    let history = vec![HistoryRecord::observed(2024, 1, 2.0)];
    let targets = vec![
        TargetRecord::monthly(2024, 1, "Meta Alto", 3.0),
        TargetRecord::monthly(2024, 1, "Meta Bajo", 1.0),
    ];
    let options = AggregationOptions::new(ComparisonType::Scenario);

    let result = process_indicator(&profile, &history, &targets, &options)?;
    assert_eq!(result.rows[0].comparison_value, Some(1.0));
    assert_eq!(result.comparison_label, "2024 vs Meta Bajo");
    Ok(())
}

#[test]
fn test_plan_only_indicator() -> Result<()> {
    let history = parse_history_json(
        r#"[
            {"anio": 2024, "mes": 3, "valor": 20, "es_meta": true, "escenario": "Meta Programada"},
            {"anio": 2024, "mes": 3, "valor": 18, "es_meta": true, "escenario": "Meta Alcanzada"},
            {"anio": 2024, "mes": 5, "valor": 35, "es_meta": true, "escenario": "Meta Programada"},
            {"anio": 2024, "mes": 6, "valor": 40, "es_meta": true, "escenario": "Meta Programada"}
        ]"#,
    )?;

    let result = aggregate(
        ComparisonType::Monthly,
        &history,
        &[],
        &AggregationOptions::default(),
    )?;
    assert_eq!(result.scenario_columns, vec!["Meta Alcanzada", "Meta Programada"]);
    assert_eq!(result.scenario_rows.len(), 2);
    assert_eq!(
        result.scenario_rows[1].values.get("Meta Programada"),
        Some(&Some(40.0))
    );

    let table = result.table();
    assert_eq!(table.columns, result.scenario_columns);
    assert!(table.to_csv().contains("T1 2024,18,20"));
    Ok(())
}

#[test]
fn test_series_cache_serves_every_comparison() -> Result<()> {
    let history = load_history(OPERATIONS_CSV)?;
    let mut cache = SeriesCache::new();

    let series = cache.get_or_build("OPS-01", &history, &[]);
    let monthly = series.aggregate(&AggregationOptions::new(ComparisonType::Monthly))?;
    let annual = series.aggregate(&AggregationOptions::new(ComparisonType::Annual))?;

    assert_eq!(monthly.rows.len(), 5);
    assert_eq!(annual.rows.len(), 1);
    assert_eq!(cache.len(), 1);
    Ok(())
}

#[test]
fn test_result_table_export() -> Result<()> {
    let history = load_history(OPERATIONS_CSV)?;
    let result = aggregate(
        ComparisonType::Monthly,
        &history,
        &[],
        &AggregationOptions::default(),
    )?;

    let table = result.table();
    assert_eq!(table.title, "2024 vs 2023");
    // 5 months, total, 6 projected months, projected total
    assert_eq!(table.rows.len(), 13);
    assert_eq!(table.rows[5].label, "Total");
    assert_eq!(table.rows[12].label, "Total proyectado");

    let markdown = table.to_markdown();
    assert!(markdown.contains("| Ene 2024 | 1260.00 | 1200.00 | - | 60.00 | 5.0% |"));
    assert_eq!(table, result.table());
    Ok(())
}

#[test]
fn test_options_from_json() -> Result<()> {
    let options: AggregationOptions = serde_json::from_str(
        r#"{"type": "scenario", "scenario": "BAJO", "totals_strategy": "average"}"#,
    )?;
    assert_eq!(options.comparison, ComparisonType::Scenario);
    assert_eq!(options.totals_strategy, TotalsStrategy::Average);
    assert_eq!(options.periods, DEFAULT_FORECAST_PERIODS);
    assert!(validate_options(&options).is_ok());

    let schema = AggregationOptions::schema_as_json()?;
    assert!(schema.contains("totals_strategy"));
    Ok(())
}

#[test]
fn test_result_serializes_for_renderer() -> Result<()> {
    let history = vec![
        HistoryRecord::observed(2023, 6, 100.0),
        HistoryRecord::observed(2024, 6, 120.0),
    ];
    let result = aggregate(
        ComparisonType::Monthly,
        &history,
        &[],
        &AggregationOptions::default(),
    )?;

    let json = serde_json::to_value(&result)?;
    assert_eq!(json["type"], "monthly");
    assert_eq!(json["current_year"], 2024);
    assert_eq!(json["rows"][0]["origin"], "observed");
    assert!(json["forecast"].is_null());
    Ok(())
}
