use crate::utils::mean;

/// Initial state of an additive Holt-Winters model.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalComponents {
    pub level: f64,
    pub trend: f64,
    pub seasonal: Vec<f64>,
}

/// Caps the requested season length to half the series. Returns `None` when
/// the capped length is below 2 or fewer than two full seasons are available,
/// in which case seasonal decomposition is not meaningful.
pub fn effective_season_length(requested: usize, series_len: usize) -> Option<usize> {
    let capped = requested.min(series_len / 2);
    if capped < 2 || series_len / capped < 2 {
        return None;
    }
    Some(capped)
}

/// Classical initialization over the full seasons of `series`.
///
/// - seasonal\[i\]: deviation of position `i` from its season average,
///   averaged across seasons
/// - trend: mean of `(x[i + L] - x[i]) / L` over the first season
/// - level: first season average
pub fn initial_components(series: &[f64], season_length: usize) -> Option<SeasonalComponents> {
    if season_length == 0 {
        return None;
    }
    let seasons = series.len() / season_length;
    if seasons < 2 {
        return None;
    }

    let season_averages: Vec<f64> = series
        .chunks_exact(season_length)
        .take(seasons)
        .map(|chunk| mean(chunk).unwrap_or(0.0))
        .collect();

    let seasonal: Vec<f64> = (0..season_length)
        .map(|i| {
            let total: f64 = season_averages
                .iter()
                .enumerate()
                .map(|(s, avg)| series[s * season_length + i] - avg)
                .sum();
            total / seasons as f64
        })
        .collect();

    let trend = (0..season_length)
        .map(|i| (series[i + season_length] - series[i]) / season_length as f64)
        .sum::<f64>()
        / season_length as f64;

    let level = match season_averages.first() {
        Some(avg) if avg.is_finite() => *avg,
        _ => series[0],
    };

    Some(SeasonalComponents {
        level,
        trend: if trend.is_finite() { trend } else { 0.0 },
        seasonal,
    })
}
