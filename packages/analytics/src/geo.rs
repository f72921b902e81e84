//! Coordinate-valid records for the map collaborator.

use incident_atlas_analytics_models::{GeoPoint, GeoView, ViewKind};
use incident_atlas_incident_models::{CleanedRecord, Coordinates};

use crate::ViewError;

/// Builds the geospatial view: every record with coordinates, labelled by
/// city, plus the mean position to center the map on.
///
/// # Errors
///
/// Returns [`ViewError::InsufficientData`] if no record has coordinates.
#[allow(clippy::cast_precision_loss)]
pub fn build_geo(records: &[CleanedRecord]) -> Result<GeoView, ViewError> {
    let points: Vec<GeoPoint> = records
        .iter()
        .filter_map(|record| {
            record.coordinates.map(|coordinates| GeoPoint {
                row: record.row,
                year: record.year,
                coordinates,
                label: record.city.clone(),
            })
        })
        .collect();

    if points.is_empty() {
        return Err(ViewError::InsufficientData {
            view: ViewKind::Geo,
            reason: format!("none of {} records has valid coordinates", records.len()),
        });
    }

    let n = points.len() as f64;
    let (lat_sum, lon_sum) = points.iter().fold((0.0, 0.0), |(lat, lon), p| {
        (lat + p.coordinates.latitude, lon + p.coordinates.longitude)
    });

    log::debug!(
        "Built geo view: {} of {} records geolocated",
        points.len(),
        records.len()
    );

    Ok(GeoView {
        center: Coordinates {
            latitude: lat_sum / n,
            longitude: lon_sum / n,
        },
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::rec;

    fn at(city: &str, latitude: f64, longitude: f64) -> CleanedRecord {
        let mut r = rec(2000, None, None);
        r.city = Some(city.to_string());
        r.coordinates = Some(Coordinates {
            latitude,
            longitude,
        });
        r
    }

    #[test]
    fn keeps_only_geolocated_records_with_city_label() {
        let records = vec![at("Lima", 10.0, 20.0), rec(2000, None, None), at("Cusco", 30.0, 40.0)];
        let view = build_geo(&records).unwrap();
        assert_eq!(view.points.len(), 2);
        assert_eq!(view.points[0].label.as_deref(), Some("Lima"));
        assert!((view.center.latitude - 20.0).abs() < 1e-9);
        assert!((view.center.longitude - 30.0).abs() < 1e-9);
    }

    #[test]
    fn no_coordinates_is_insufficient() {
        let err = build_geo(&[rec(2000, None, None)]).unwrap_err();
        assert!(matches!(
            err,
            ViewError::InsufficientData {
                view: ViewKind::Geo,
                ..
            }
        ));
    }
}
