//! Group-wise median imputation.
//!
//! Records are partitioned by city, the median of the defined values is
//! computed per partition, and the result is looked up for every record
//! that lacks the value.

use std::collections::BTreeMap;

use incident_atlas_incident_models::IncidentRecord;

/// Returns the median of `values`, or `None` if the slice is empty.
///
/// Even-length inputs yield the mean of the two middle values. The slice is
/// sorted in place.
#[must_use]
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some(f64::midpoint(values[mid - 1], values[mid]))
    } else {
        Some(values[mid])
    }
}

/// Computes, for every city, the median of the values `extract` yields for
/// that city's records. Cities with no defined value are absent.
pub fn city_medians<'a, F>(records: &'a [IncidentRecord], extract: F) -> BTreeMap<&'a str, f64>
where
    F: Fn(&IncidentRecord) -> Option<f64>,
{
    let mut by_city: BTreeMap<&str, Vec<f64>> = BTreeMap::new();

    for record in records {
        if let Some(city) = record.city.as_deref()
            && let Some(value) = extract(record)
        {
            by_city.entry(city).or_default().push(value);
        }
    }

    by_city
        .into_iter()
        .filter_map(|(city, mut values)| median(&mut values).map(|m| (city, m)))
        .collect()
}
