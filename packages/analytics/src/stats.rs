//! Descriptive statistics and seasonal decomposition for the summary view.

use std::collections::BTreeMap;

use incident_atlas_analytics_models::{ColumnStats, SeasonalDecomposition, ViewKind};
use incident_atlas_incident_models::{CleanedRecord, IncidentField};

use crate::ViewError;

/// Cycle length, in years, used to decompose the yearly incident counts.
pub const DECOMPOSITION_PERIOD: usize = 5;

type Extract = fn(&CleanedRecord) -> Option<f64>;

/// Linear-interpolated quantile of a sorted, non-empty slice.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Summarizes `values` the way a dataframe `describe()` does.
///
/// Returns `None` for an empty slice. The slice is sorted in place.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn describe(values: &mut [f64]) -> Option<ColumnStats> {
    values.sort_by(f64::total_cmp);
    let (&min, &max) = (values.first()?, values.last()?);

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std_dev = (values.len() > 1).then(|| {
        let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (squares / (n - 1.0)).sqrt()
    });

    Some(ColumnStats {
        count: values.len() as u64,
        mean,
        std_dev,
        min,
        q25: quantile(values, 0.25),
        median: quantile(values, 0.5),
        q75: quantile(values, 0.75),
        max,
    })
}

/// Describes every numeric field that at least one record has a value for.
#[must_use]
pub fn numeric_columns(records: &[CleanedRecord]) -> BTreeMap<IncidentField, ColumnStats> {
    let columns: [(IncidentField, Extract); 7] = [
        (IncidentField::Year, |r| Some(f64::from(r.year))),
        (IncidentField::Month, |r| r.month.map(f64::from)),
        (IncidentField::Day, |r| r.day.map(f64::from)),
        (IncidentField::Latitude, |r| r.coordinates.as_ref().map(|c| c.latitude)),
        (IncidentField::Longitude, |r| r.coordinates.as_ref().map(|c| c.longitude)),
        (IncidentField::Killed, |r| Some(r.killed)),
        (IncidentField::Wounded, |r| Some(r.wounded)),
    ];

    columns
        .into_iter()
        .filter_map(|(field, extract)| {
            let mut values: Vec<f64> = records.iter().filter_map(|r| extract(r)).collect();
            describe(&mut values).map(|stats| (field, stats))
        })
        .collect()
}

/// Moving-average weights for a centered window of one period. Even
/// periods get a window of `period + 1` with half weight at both ends.
#[allow(clippy::cast_precision_loss)]
fn moving_average_weights(period: usize) -> Vec<f64> {
    let weight = 1.0 / period as f64;
    if period % 2 == 0 {
        let mut weights = vec![weight; period + 1];
        weights[0] /= 2.0;
        weights[period] /= 2.0;
        weights
    } else {
        vec![weight; period]
    }
}

/// Splits yearly incident counts into trend, seasonal and residual parts
/// with an additive model.
///
/// The trend is a centered moving average over one period. The seasonal
/// component averages the detrended values at each position of the cycle
/// and is shifted to zero mean.
///
/// # Errors
///
/// Returns [`ViewError::InsufficientData`] unless there are at least two
/// full periods of years, or if `period` is below 2.
#[allow(clippy::cast_precision_loss)]
pub fn decompose_yearly(
    incidents_by_year: &BTreeMap<i32, u64>,
    period: usize,
) -> Result<SeasonalDecomposition, ViewError> {
    let n = incidents_by_year.len();
    if period < 2 || n < 2 * period {
        return Err(ViewError::InsufficientData {
            view: ViewKind::Summary,
            reason: format!(
                "{n} years of incident counts, seasonal decomposition needs at least {}",
                2 * period.max(2)
            ),
        });
    }

    let years: Vec<i32> = incidents_by_year.keys().copied().collect();
    let observed: Vec<f64> = incidents_by_year.values().map(|&c| c as f64).collect();

    let weights = moving_average_weights(period);
    let half = weights.len() / 2;
    let trend: Vec<Option<f64>> = (0..n)
        .map(|i| {
            (i >= half && i + half < n).then(|| {
                weights
                    .iter()
                    .zip(&observed[i - half..=i + half])
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
            })
        })
        .collect();

    let detrended: Vec<Option<f64>> = observed
        .iter()
        .zip(&trend)
        .map(|(x, t)| t.map(|t| x - t))
        .collect();

    let mut cycle: Vec<f64> = (0..period)
        .map(|phase| {
            let defined: Vec<f64> = detrended
                .iter()
                .skip(phase)
                .step_by(period)
                .filter_map(|d| *d)
                .collect();
            defined.iter().sum::<f64>() / defined.len() as f64
        })
        .collect();
    let cycle_mean = cycle.iter().sum::<f64>() / period as f64;
    for value in &mut cycle {
        *value -= cycle_mean;
    }

    let seasonal: Vec<f64> = (0..n).map(|i| cycle[i % period]).collect();
    let residual = detrended
        .iter()
        .zip(&seasonal)
        .map(|(d, s)| d.map(|d| d - s))
        .collect();

    Ok(SeasonalDecomposition {
        period,
        years,
        observed,
        trend,
        seasonal,
        residual,
    })
}

#[cfg(test)]
mod tests {
    use incident_atlas_incident_models::Coordinates;

    use super::*;
    use crate::aggregate::tests::rec;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn describe_matches_dataframe_quartiles() {
        let stats = describe(&mut [4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert!(close(stats.mean, 2.5));
        assert!(close(stats.std_dev.unwrap(), 1.290_994_448_735_805_6));
        assert!(close(stats.min, 1.0));
        assert!(close(stats.q25, 1.75));
        assert!(close(stats.median, 2.5));
        assert!(close(stats.q75, 3.25));
        assert!(close(stats.max, 4.0));
    }

    #[test]
    fn single_value_has_no_spread() {
        let stats = describe(&mut [7.0]).unwrap();
        assert_eq!(stats.std_dev, None);
        assert!(close(stats.q25, 7.0));
        assert!(close(stats.q75, 7.0));
        assert_eq!(describe(&mut []), None);
    }

    #[test]
    fn numeric_columns_skip_fields_without_values() {
        let mut located = rec(2000, None, None);
        located.coordinates = Some(Coordinates {
            latitude: 10.0,
            longitude: 20.0,
        });
        located.killed = 4.0;
        let records = vec![located, rec(2002, None, None)];

        let columns = numeric_columns(&records);
        assert!(!columns.contains_key(&IncidentField::Month));
        assert!(!columns.contains_key(&IncidentField::Day));
        assert_eq!(columns[&IncidentField::Year].count, 2);
        assert!(close(columns[&IncidentField::Year].mean, 2001.0));
        assert_eq!(columns[&IncidentField::Latitude].count, 1);
        assert!(close(columns[&IncidentField::Killed].max, 4.0));
    }

    fn yearly(counts: &[u64]) -> BTreeMap<i32, u64> {
        (1990..).zip(counts.iter().copied()).collect()
    }

    #[test]
    fn recovers_linear_trend_and_cycle() {
        let cycle = [2i64, -1, -1, 1, -1];
        let counts: Vec<u64> = (0..10i64)
            .map(|i| u64::try_from(20 + i + cycle[usize::try_from(i).unwrap() % 5]).unwrap())
            .collect();

        let d = decompose_yearly(&yearly(&counts), DECOMPOSITION_PERIOD).unwrap();
        assert_eq!(d.years.first(), Some(&1990));
        assert_eq!(d.years.len(), 10);

        assert_eq!(d.trend[..2], [None, None]);
        assert_eq!(d.trend[8..], [None, None]);
        for (i, trend) in d.trend.iter().enumerate().take(8).skip(2) {
            assert!(close(trend.unwrap(), 20.0 + i as f64), "trend at {i}");
        }

        for (i, seasonal) in d.seasonal.iter().enumerate() {
            assert!(close(*seasonal, cycle[i % 5] as f64), "seasonal at {i}");
        }
        for residual in d.residual.iter().flatten() {
            assert!(close(*residual, 0.0));
        }
        assert_eq!(d.residual.iter().flatten().count(), 6);
    }

    #[test]
    fn seasonal_component_has_zero_mean() {
        let counts = [5, 9, 2, 7, 3, 8, 1, 6, 4, 10, 12, 3];
        let d = decompose_yearly(&yearly(&counts), DECOMPOSITION_PERIOD).unwrap();
        let one_cycle: f64 = d.seasonal[..5].iter().sum();
        assert!(close(one_cycle, 0.0));
        for i in 0..counts.len() {
            if let (Some(t), Some(r)) = (d.trend[i], d.residual[i]) {
                assert!(close(t + d.seasonal[i] + r, d.observed[i]));
            }
        }
    }

    #[test]
    fn fewer_than_two_periods_is_insufficient() {
        let err = decompose_yearly(&yearly(&[1; 9]), DECOMPOSITION_PERIOD).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient data for summary view: 9 years of incident counts, \
             seasonal decomposition needs at least 10"
        );
    }
}
