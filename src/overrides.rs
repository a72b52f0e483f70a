use crate::schema::{AggregationOptions, TotalsStrategy};
use crate::utils::fold_text;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const FAUNA_IMPACT_RATE_CODE: &str = "SMS-01";
pub const LOW_SCENARIO: &str = "BAJO";

/// What the caller knows about the indicator being aggregated.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
pub struct IndicatorProfile {
    #[schemars(description = "Indicator code as stored, e.g. 'SMS-01'.")]
    #[serde(default, alias = "clave")]
    pub code: Option<String>,

    #[serde(default, alias = "nombre")]
    pub name: Option<String>,

    #[serde(default, alias = "descripcion")]
    pub description: Option<String>,
}

impl IndicatorProfile {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            name: Some(name.to_string()),
            description: None,
        }
    }

    /// Code when known, else name, else a placeholder for logs.
    pub fn display_name(&self) -> &str {
        self.code
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("<unnamed>")
    }

    /// Wildlife-strike rate indicators: matched by code, or by a name or
    /// description mentioning a rate ("tasa") of fauna impacts.
    pub fn is_fauna_impact_rate(&self) -> bool {
        if self
            .code
            .as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case(FAUNA_IMPACT_RATE_CODE))
        {
            return true;
        }

        [&self.name, &self.description]
            .into_iter()
            .flatten()
            .map(|text| fold_text(text))
            .any(|text| text.contains("tasa") && text.contains("impact") && text.contains("fauna"))
    }
}

/// Per-indicator behavioral adjustments layered over caller options.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
pub struct IndicatorOverrides {
    #[schemars(description = "Scenario forced as reference line for every comparison.")]
    #[serde(default)]
    pub diff_scenario: Option<String>,

    #[schemars(description = "Scenario used by scenario comparisons when the caller names none.")]
    #[serde(default)]
    pub scenario: Option<String>,

    #[serde(default)]
    pub totals_strategy: Option<TotalsStrategy>,
}

impl IndicatorOverrides {
    pub fn for_profile(profile: &IndicatorProfile) -> Self {
        if profile.is_fauna_impact_rate() {
            Self {
                diff_scenario: Some(LOW_SCENARIO.to_string()),
                scenario: Some(LOW_SCENARIO.to_string()),
                totals_strategy: Some(TotalsStrategy::Average),
            }
        } else {
            Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.diff_scenario.is_none() && self.scenario.is_none() && self.totals_strategy.is_none()
    }

    /// Returns new options with the overrides applied; `base` is untouched.
    /// The scenario only fills in when `base` names none.
    pub fn apply(&self, base: &AggregationOptions) -> AggregationOptions {
        let mut options = base.clone();

        if let Some(scenario) = &self.diff_scenario {
            options.diff_scenario = Some(scenario.clone());
        }
        if options.scenario.is_none() {
            options.scenario = self.scenario.clone();
        }
        if let Some(strategy) = self.totals_strategy {
            options.totals_strategy = strategy;
        }

        options
    }
}
