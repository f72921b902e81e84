//! Grouping of cleaned records by one or two fields.
//!
//! Grouping is a pure function of its input. Records that have no value for
//! a selected field do not contribute to any group, the same way a
//! dataframe `groupby` drops missing keys. Results come back in ascending
//! key order, though callers should not rely on any particular order.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::AddAssign;

use incident_atlas_analytics_models::{
    Aggregated, AggregatedCasualties, AggregatedCount, GroupField, GroupSpec, GroupValue,
};
use incident_atlas_incident_models::CleanedRecord;

/// Returns the key value of `field` for `record`, or `None` if the record
/// has no value for it.
#[must_use]
pub fn group_value(record: &CleanedRecord, field: GroupField) -> Option<GroupValue> {
    let text = |value: Option<&str>| value.map(|s| GroupValue::Text(s.to_owned()));

    match field {
        GroupField::Year => Some(GroupValue::Int(i64::from(record.year))),
        GroupField::Month => record.month.map(|m| GroupValue::Int(i64::from(m))),
        GroupField::Country => text(record.country.as_deref()),
        GroupField::City => text(record.city.as_deref()),
        GroupField::Region => text(record.region.as_deref()),
        GroupField::AttackType => text(record.attack_type.as_deref()),
        GroupField::TargetType => text(Some(record.target_type.as_str())),
        GroupField::GroupName => text(record.group_name.as_deref()),
        GroupField::RankingGroup => text(record.ranking_group()),
    }
}

type GroupKey = (GroupValue, Option<GroupValue>);

fn group_key(record: &CleanedRecord, spec: GroupSpec) -> Option<GroupKey> {
    let primary = group_value(record, spec.primary)?;
    let secondary = match spec.secondary {
        Some(field) => Some(group_value(record, field)?),
        None => None,
    };
    Some((primary, secondary))
}

fn fold_by<T, F>(records: &[CleanedRecord], spec: GroupSpec, measure: F) -> Vec<Aggregated<T>>
where
    T: Default + AddAssign,
    F: Fn(&CleanedRecord) -> T,
{
    let mut groups: BTreeMap<GroupKey, T> = BTreeMap::new();

    for record in records {
        if let Some(key) = group_key(record, spec) {
            *groups.entry(key).or_default() += measure(record);
        }
    }

    log::debug!("Grouped {} records by {spec} into {} groups", records.len(), groups.len());

    groups
        .into_iter()
        .map(|((primary, secondary), value)| Aggregated {
            primary,
            secondary,
            value,
        })
        .collect()
}

/// Counts records per distinct key combination.
#[must_use]
pub fn count_by(records: &[CleanedRecord], spec: GroupSpec) -> Vec<AggregatedCount> {
    fold_by(records, spec, |_| 1u64)
}

/// Sums `killed + wounded` per distinct key combination.
#[must_use]
pub fn sum_casualties_by(records: &[CleanedRecord], spec: GroupSpec) -> Vec<AggregatedCasualties> {
    fold_by(records, spec, CleanedRecord::total_casualties)
}

/// Sums aggregates over their secondary key, yielding one total per
/// primary key value.
#[must_use]
pub fn totals_by_primary(counts: &[AggregatedCount]) -> BTreeMap<GroupValue, u64> {
    let mut totals = BTreeMap::new();
    for entry in counts {
        *totals.entry(entry.primary.clone()).or_default() += entry.value;
    }
    totals
}

/// Returns every year present in `records`, ascending.
#[must_use]
pub fn years_present(records: &[CleanedRecord]) -> BTreeSet<i32> {
    records.iter().map(|r| r.year).collect()
}

/// Converts an integer key back into a year.
#[must_use]
pub fn as_year(value: &GroupValue) -> Option<i32> {
    value.as_int().and_then(|v| i32::try_from(v).ok())
}

#[cfg(test)]
pub(crate) mod tests {
    use incident_atlas_incident_models::UNKNOWN_SENTINEL;

    use super::*;

    /// Builds a cleaned record with the fields the builders care about.
    pub(crate) fn rec(year: i32, attack_type: Option<&str>, group: Option<&str>) -> CleanedRecord {
        CleanedRecord {
            row: 0,
            year,
            month: None,
            day: None,
            country: None,
            city: None,
            region: None,
            coordinates: None,
            attack_type: attack_type.map(str::to_string),
            target_type: UNKNOWN_SENTINEL.to_string(),
            group_name: group.map(str::to_string),
            killed: 0.0,
            wounded: 0.0,
        }
    }

    #[test]
    fn counts_by_single_key() {
        let records = vec![rec(2000, None, None), rec(2000, None, None), rec(2001, None, None)];
        let counts = count_by(&records, GroupSpec::single(GroupField::Year));
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].primary, GroupValue::Int(2000));
        assert_eq!(counts[0].secondary, None);
        assert_eq!(counts[0].value, 2);
        assert_eq!(counts[1].value, 1);
    }

    #[test]
    fn counts_by_key_pair_without_double_counting() {
        let records = vec![
            rec(2000, Some("Bombing"), None),
            rec(2000, Some("Bombing"), None),
            rec(2000, Some("Assault"), None),
            rec(2001, Some("Bombing"), None),
        ];
        let counts = count_by(
            &records,
            GroupSpec::pair(GroupField::Year, GroupField::AttackType),
        );
        assert_eq!(counts.len(), 3);
        let total: u64 = counts.iter().map(|c| c.value).sum();
        assert_eq!(total, 4);
        let bombing_2000 = counts
            .iter()
            .find(|c| {
                c.primary == GroupValue::Int(2000)
                    && c.secondary == Some(GroupValue::Text("Bombing".to_string()))
            })
            .unwrap();
        assert_eq!(bombing_2000.value, 2);
    }

    #[test]
    fn records_missing_a_key_do_not_contribute() {
        let records = vec![rec(2000, Some("Bombing"), None), rec(2000, None, None)];
        let counts = count_by(
            &records,
            GroupSpec::pair(GroupField::Year, GroupField::AttackType),
        );
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].value, 1);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let records = vec![rec(2000, Some("bombing"), None), rec(2000, Some("Bombing"), None)];
        let counts = count_by(&records, GroupSpec::single(GroupField::AttackType));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn ranking_group_field_skips_unknown() {
        let records = vec![
            rec(2000, None, Some("Unknown")),
            rec(2000, None, Some("")),
            rec(2000, None, Some("ETA")),
            rec(2000, None, None),
        ];
        let ranked = count_by(&records, GroupSpec::single(GroupField::RankingGroup));
        assert_eq!(ranked.len(), 1);
        let all = count_by(&records, GroupSpec::single(GroupField::GroupName));
        assert_eq!(all.len(), 3, "GroupName keeps the sentinel and empty names");
    }

    #[test]
    fn sums_casualties() {
        let mut a = rec(2000, None, None);
        a.killed = 2.0;
        a.wounded = 5.0;
        let mut b = rec(2000, None, None);
        b.killed = 1.0;
        let sums = sum_casualties_by(&[a, b], GroupSpec::single(GroupField::Year));
        assert_eq!(sums.len(), 1);
        assert!((sums[0].value - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn totals_collapse_secondary_key() {
        let records = vec![
            rec(2000, Some("Bombing"), None),
            rec(2000, Some("Assault"), None),
            rec(2001, Some("Bombing"), None),
        ];
        let counts = count_by(
            &records,
            GroupSpec::pair(GroupField::Year, GroupField::AttackType),
        );
        let totals = totals_by_primary(&counts);
        assert_eq!(totals.get(&GroupValue::Int(2000)), Some(&2));
        assert_eq!(totals.get(&GroupValue::Int(2001)), Some(&1));
    }
}
