//! Short-horizon projections by exponential smoothing.
//!
//! Additive Holt-Winters is preferred; when the series is too short for two
//! full seasons the engine falls back to Holt's linear method. Smoothing
//! constants are fixed, never fitted.
//!
//! ```text
//! Level:    l' = α(x - s) + (1 - α)(l + b)
//! Trend:    b' = β(l' - l) + (1 - β)b
//! Seasonal: s' = γ(x - l') + (1 - γ)s
//! Forecast: x̂(n + k) = l + k·b + s[(n + k - 1) mod L]
//! ```

use crate::index::Timeline;
use crate::schema::ForecastOptions;
use crate::seasonality::{effective_season_length, initial_components};
use crate::utils::{add_months, finite};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum ForecastMethod {
    HoltLinear,
    HoltWinters { season_length: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub method: ForecastMethod,
    pub values: Vec<f64>,
}

/// Holt's linear (double) exponential smoothing.
#[derive(Debug, Clone, Copy)]
pub struct HoltLinear {
    alpha: f64,
    beta: f64,
}

impl HoltLinear {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Projects `steps` values past the end of `series`. A projection that is
    /// not finite is replaced by the last observation.
    pub fn forecast(&self, series: &[f64], steps: usize) -> Vec<f64> {
        let (Some(&first), Some(&last)) = (series.first(), series.last()) else {
            return Vec::new();
        };

        let mut level = first;
        let mut trend = if series.len() > 1 {
            series[1] - series[0]
        } else {
            0.0
        };

        for &value in &series[1..] {
            let new_level = self.alpha * value + (1.0 - self.alpha) * (level + trend);
            trend = self.beta * (new_level - level) + (1.0 - self.beta) * trend;
            level = new_level;
        }

        (1..=steps)
            .map(|k| finite(level + k as f64 * trend).unwrap_or(last))
            .collect()
    }
}

/// Additive Holt-Winters (triple) exponential smoothing.
#[derive(Debug, Clone, Copy)]
pub struct HoltWinters {
    alpha: f64,
    beta: f64,
    gamma: f64,
    season_length: usize,
}

impl HoltWinters {
    pub fn new(alpha: f64, beta: f64, gamma: f64, season_length: usize) -> Self {
        Self {
            alpha,
            beta,
            gamma,
            season_length,
        }
    }

    pub fn season_length(&self) -> usize {
        self.season_length
    }

    /// `None` when the series does not hold two full seasons.
    pub fn forecast(&self, series: &[f64], steps: usize) -> Option<Vec<f64>> {
        let n = series.len();
        let last = *series.last()?;
        let init = initial_components(series, self.season_length)?;

        let mut level = init.level;
        let mut trend = init.trend;
        let mut seasonal = init.seasonal;

        for (i, &value) in series.iter().enumerate() {
            let idx = i % self.season_length;
            let s = seasonal[idx];
            let new_level = self.alpha * (value - s) + (1.0 - self.alpha) * (level + trend);
            trend = self.beta * (new_level - level) + (1.0 - self.beta) * trend;
            seasonal[idx] = self.gamma * (value - new_level) + (1.0 - self.gamma) * s;
            level = new_level;
        }

        Some(
            (1..=steps)
                .map(|k| {
                    let s = seasonal[(n + k - 1) % self.season_length];
                    finite(level + k as f64 * trend + s).unwrap_or(last)
                })
                .collect(),
        )
    }
}

/// Forecasts `steps` values from `series`.
///
/// Non-finite entries are dropped first. Returns `None` when `steps` is zero
/// or fewer than `options.min_points` usable values remain; "no forecast" is
/// an expected outcome, not an error.
pub fn forecast(series: &[f64], steps: usize, options: &ForecastOptions) -> Option<Forecast> {
    let usable: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
    if steps == 0 || usable.len() < options.min_points.max(1) {
        debug!(
            "Skipping forecast: {} usable points, {} steps requested",
            usable.len(),
            steps
        );
        return None;
    }

    if let Some(season_length) = effective_season_length(options.season_length, usable.len()) {
        let model = HoltWinters::new(options.alpha, options.beta, options.gamma, season_length);
        if let Some(values) = model.forecast(&usable, steps) {
            return Some(Forecast {
                method: ForecastMethod::HoltWinters { season_length },
                values,
            });
        }
    }

    debug!(
        "Series of {} points too short for seasonal decomposition, using Holt linear",
        usable.len()
    );
    Some(Forecast {
        method: ForecastMethod::HoltLinear,
        values: HoltLinear::new(options.linear_alpha, options.linear_beta).forecast(&usable, steps),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub year: i32,
    pub month: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub method: ForecastMethod,
    pub points: Vec<ProjectedPoint>,
}

/// Forecasts the timeline and anchors step `k` at the last observed period
/// plus `k` months.
pub fn project_timeline(
    timeline: &Timeline,
    steps: usize,
    options: &ForecastOptions,
) -> Option<Projection> {
    let last = timeline.last()?;
    let result = forecast(&timeline.values(), steps, options)?;

    let points = result
        .values
        .iter()
        .enumerate()
        .filter_map(|(i, &value)| {
            let (year, month) = add_months(last.year, last.month, (i + 1) as u32)?;
            Some(ProjectedPoint { year, month, value })
        })
        .collect();

    Some(Projection {
        method: result.method,
        points,
    })
}
