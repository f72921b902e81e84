//! Killed-vs-wounded points colored by target type.

use std::collections::BTreeMap;

use incident_atlas_analytics_models::{ScatterPoint, ScatterView, TargetColor, ViewKind};
use incident_atlas_incident_models::CleanedRecord;

use crate::ViewError;

/// A named, fixed list of color tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub name: &'static str,
    pub colors: &'static [&'static str],
}

pub const CATEGORY20: Palette = Palette {
    name: "Category20",
    colors: &[
        "#1f77b4", "#aec7e8", "#ff7f0e", "#ffbb78", "#2ca02c", "#98df8a", "#d62728", "#ff9896",
        "#9467bd", "#c5b0d5", "#8c564b", "#c49c94", "#e377c2", "#f7b6d2", "#7f7f7f", "#c7c7c7",
        "#bcbd22", "#dbdb8d", "#17becf", "#9edae5",
    ],
};

pub const CATEGORY20C: Palette = Palette {
    name: "Category20c",
    colors: &[
        "#3182bd", "#6baed6", "#9ecae1", "#c6dbef", "#e6550d", "#fd8d3c", "#fdae6b", "#fdd0a2",
        "#31a354", "#74c476", "#a1d99b", "#c7e9c0", "#756bb1", "#9e9ac8", "#bcbddc", "#dadaeb",
        "#636363", "#969696", "#bdbdbd", "#d9d9d9",
    ],
};

impl Palette {
    /// Picks the palette for `categories` distinct target types.
    #[must_use]
    pub const fn for_categories(categories: usize) -> Self {
        if categories <= CATEGORY20.colors.len() {
            CATEGORY20
        } else {
            CATEGORY20C
        }
    }

    /// Color at palette index `index mod len`.
    #[must_use]
    pub const fn color(&self, index: usize) -> &'static str {
        self.colors[index % self.colors.len()]
    }
}

/// Assigns a color to each distinct target type, in order of first
/// appearance in `records`.
#[must_use]
pub fn assign_colors(records: &[CleanedRecord]) -> (Palette, Vec<TargetColor>) {
    let mut order: Vec<&str> = Vec::new();
    for record in records {
        if !order.contains(&record.target_type.as_str()) {
            order.push(&record.target_type);
        }
    }

    let palette = Palette::for_categories(order.len());
    let colors = order
        .into_iter()
        .enumerate()
        .map(|(i, target_type)| TargetColor {
            target_type: target_type.to_owned(),
            color: palette.color(i).to_owned(),
        })
        .collect();

    (palette, colors)
}

/// Builds the scatter view with one point per record, in source order.
///
/// # Errors
///
/// Returns [`ViewError::InsufficientData`] if `records` is empty.
pub fn build_scatter(records: &[CleanedRecord]) -> Result<ScatterView, ViewError> {
    if records.is_empty() {
        return Err(ViewError::InsufficientData {
            view: ViewKind::Scatter,
            reason: "no records".to_string(),
        });
    }

    let (palette, colors) = assign_colors(records);
    let lookup: BTreeMap<&str, &str> = colors
        .iter()
        .map(|c| (c.target_type.as_str(), c.color.as_str()))
        .collect();

    let points = records
        .iter()
        .map(|record| ScatterPoint {
            year: record.year,
            killed: record.killed,
            wounded: record.wounded,
            target_type: record.target_type.clone(),
            total: record.total_casualties(),
            color: lookup
                .get(record.target_type.as_str())
                .copied()
                .unwrap_or(palette.colors[0])
                .to_owned(),
        })
        .collect();

    log::debug!(
        "Built scatter view: {} target types with palette {}",
        colors.len(),
        palette.name
    );

    Ok(ScatterView {
        palette: palette.name.to_string(),
        colors,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::rec;

    fn target(year: i32, target_type: &str, killed: f64, wounded: f64) -> CleanedRecord {
        let mut r = rec(year, None, None);
        r.target_type = target_type.to_string();
        r.killed = killed;
        r.wounded = wounded;
        r
    }

    #[test]
    fn colors_follow_first_appearance() {
        let records = vec![
            target(2000, "Military", 1.0, 0.0),
            target(2000, "Business", 0.0, 2.0),
            target(2001, "Military", 3.0, 1.0),
            target(2001, "Police", 0.0, 0.0),
        ];
        let view = build_scatter(&records).unwrap();
        assert_eq!(view.palette, "Category20");
        assert_eq!(view.color_for("Military"), Some("#1f77b4"));
        assert_eq!(view.color_for("Business"), Some("#aec7e8"));
        assert_eq!(view.color_for("Police"), Some("#ff7f0e"));
        assert_eq!(view.points[2].color, "#1f77b4");
        assert!((view.points[2].total - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn year_filter_keeps_full_dataset_colors() {
        let records = vec![
            target(2000, "Military", 1.0, 0.0),
            target(2001, "Business", 0.0, 2.0),
        ];
        let view = build_scatter(&records).unwrap();
        let only_2001 = view.filter_year(2001);
        assert_eq!(only_2001.len(), 1);
        assert_eq!(only_2001[0].target_type, "Business");
        assert_eq!(only_2001[0].color, "#aec7e8", "second color, not first");
        assert!(view.filter_year(1970).is_empty());
        assert_eq!(view.year_range(), Some((2000, 2001)));
    }

    #[test]
    fn many_target_types_switch_palette_and_wrap() {
        let records: Vec<_> = (0..22)
            .map(|i| target(2000, &format!("T{i:02}"), 0.0, 0.0))
            .collect();
        let view = build_scatter(&records).unwrap();
        assert_eq!(view.palette, "Category20c");
        assert_eq!(view.color_for("T00"), Some("#3182bd"));
        assert_eq!(view.color_for("T20"), Some("#3182bd"));
        assert_eq!(view.color_for("T21"), Some("#6baed6"));
    }

    #[test]
    fn empty_input_is_insufficient() {
        assert!(build_scatter(&[]).is_err());
    }
}
