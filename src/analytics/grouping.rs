//! Grouped aggregation over observation tables
//!
//! Partitions rows by one or more categorical keys and computes counts,
//! means and standard deviations per partition. Aggregated rows are
//! themselves [`Record`]s, so they can be grouped again.

use crate::analytics::metrics::{mean, sample_sd};
use crate::simulation::table::Observation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Categorical column
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum GroupKey {
    Mountain,
    Genus,
    Species,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupKey::Mountain => "mountain",
            GroupKey::Genus => "genus",
            GroupKey::Species => "species",
        };
        f.write_str(name)
    }
}

/// Numeric column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    Elevation,
    Weight,
}

/// A row that can be grouped and aggregated
pub trait Record {
    /// Value of a categorical column, `None` when the row does not carry it
    fn key(&self, key: GroupKey) -> Option<u32>;

    /// Value of a numeric column, `None` when missing
    fn measure(&self, measure: Measure) -> Option<f64>;
}

impl Record for Observation {
    fn key(&self, key: GroupKey) -> Option<u32> {
        Some(match key {
            GroupKey::Mountain => self.mountain,
            GroupKey::Genus => self.genus,
            GroupKey::Species => self.species,
        })
    }

    fn measure(&self, measure: Measure) -> Option<f64> {
        Some(match measure {
            Measure::Elevation => self.elevation,
            Measure::Weight => self.weight,
        })
    }
}

/// Mean and sample standard deviation of one measure within a group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasureStats {
    pub mean: f64,
    /// `None` for fewer than two values
    pub sd: Option<f64>,
}

impl MeasureStats {
    fn from_values(values: &[f64]) -> Option<Self> {
        Some(Self {
            mean: mean(values)?,
            sd: sample_sd(values),
        })
    }
}

/// Descriptive statistics for one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub keys: Vec<(GroupKey, u32)>,
    pub count: u32,
    pub elevation: Option<MeasureStats>,
    pub weight: Option<MeasureStats>,
}

impl GroupSummary {
    /// Human-readable key tuple, e.g. `mountain=2, genus=1`
    pub fn label(&self) -> String {
        format_keys(&self.keys)
    }
}

/// Group means, usable as input to a further aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMean {
    pub keys: Vec<(GroupKey, u32)>,
    pub elevation: Option<f64>,
    pub weight: Option<f64>,
}

impl Record for GroupMean {
    fn key(&self, key: GroupKey) -> Option<u32> {
        self.keys.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    fn measure(&self, measure: Measure) -> Option<f64> {
        match measure {
            Measure::Elevation => self.elevation,
            Measure::Weight => self.weight,
        }
    }
}

pub fn format_keys(keys: &[(GroupKey, u32)]) -> String {
    keys.iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split rows by key tuple; rows missing any key are left out
fn partition<'a, R: Record>(rows: &'a [R], keys: &[GroupKey]) -> BTreeMap<Vec<u32>, Vec<&'a R>> {
    let mut groups: BTreeMap<Vec<u32>, Vec<&R>> = BTreeMap::new();
    for row in rows {
        let tuple: Option<Vec<u32>> = keys.iter().map(|&k| row.key(k)).collect();
        if let Some(tuple) = tuple {
            groups.entry(tuple).or_default().push(row);
        }
    }
    groups
}

fn measure_values<R: Record>(rows: &[&R], measure: Measure) -> Vec<f64> {
    rows.iter().filter_map(|r| r.measure(measure)).collect()
}

fn labelled(keys: &[GroupKey], tuple: Vec<u32>) -> Vec<(GroupKey, u32)> {
    keys.iter().copied().zip(tuple).collect()
}

/// Count, mean and standard deviation per group, ordered by key tuple
pub fn group_by<R: Record>(rows: &[R], keys: &[GroupKey]) -> Vec<GroupSummary> {
    partition(rows, keys)
        .into_iter()
        .map(|(tuple, members)| GroupSummary {
            count: members.len() as u32,
            elevation: MeasureStats::from_values(&measure_values(&members, Measure::Elevation)),
            weight: MeasureStats::from_values(&measure_values(&members, Measure::Weight)),
            keys: labelled(keys, tuple),
        })
        .collect()
}

/// Mean of every measure per group, ordered by key tuple
pub fn group_means<R: Record>(rows: &[R], keys: &[GroupKey]) -> Vec<GroupMean> {
    partition(rows, keys)
        .into_iter()
        .map(|(tuple, members)| GroupMean {
            elevation: mean(&measure_values(&members, Measure::Elevation)),
            weight: mean(&measure_values(&members, Measure::Weight)),
            keys: labelled(keys, tuple),
        })
        .collect()
}

/// Row count per value of `key`
pub fn count_by<R: Record>(rows: &[R], key: GroupKey) -> BTreeMap<u32, u32> {
    let mut counts = BTreeMap::new();
    for value in rows.iter().filter_map(|r| r.key(key)) {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
}

/// Number of distinct `counted` values per value of `by`
pub fn unique_count<R: Record>(rows: &[R], by: GroupKey, counted: GroupKey) -> BTreeMap<u32, u32> {
    let mut seen: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
    for row in rows {
        if let (Some(group), Some(value)) = (row.key(by), row.key(counted)) {
            seen.entry(group).or_default().insert(value);
        }
    }
    seen.into_iter()
        .map(|(group, values)| (group, values.len() as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(mountain: u32, genus: u32, species: u32, elevation: f64, weight: f64) -> Observation {
        Observation { mountain, genus, species, elevation, weight }
    }

    fn sample() -> Vec<Observation> {
        vec![
            obs(1, 1, 1, 0.0, 10.0),
            obs(1, 1, 2, 1.0, 14.0),
            obs(1, 2, 3, -1.0, 12.0),
            obs(2, 1, 1, 0.5, 20.0),
            obs(2, 2, 3, 0.5, 22.0),
        ]
    }

    #[test]
    fn test_group_by_single_key() {
        let summaries = group_by(&sample(), &[GroupKey::Mountain]);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].keys, vec![(GroupKey::Mountain, 1)]);
        assert_eq!(summaries[0].count, 3);

        let weight = summaries[0].weight.unwrap();
        assert!((weight.mean - 12.0).abs() < 1e-12);
        assert!((weight.sd.unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(summaries[1].count, 2);
    }

    #[test]
    fn test_group_by_two_keys_sorted() {
        let summaries = group_by(&sample(), &[GroupKey::Mountain, GroupKey::Genus]);
        let labels: Vec<String> = summaries.iter().map(|s| s.label()).collect();

        assert_eq!(
            labels,
            vec![
                "mountain=1, genus=1",
                "mountain=1, genus=2",
                "mountain=2, genus=1",
                "mountain=2, genus=2",
            ]
        );
        // Singleton groups have no standard deviation
        assert_eq!(summaries[1].weight.unwrap().sd, None);
    }

    #[test]
    fn test_group_means_idempotent() {
        let keys = [GroupKey::Mountain, GroupKey::Species];
        let once = group_means(&sample(), &keys);
        let twice = group_means(&once, &keys);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_regroup_by_coarser_key() {
        let by_species = group_means(&sample(), &[GroupKey::Mountain, GroupKey::Species]);
        let by_mountain = group_means(&by_species, &[GroupKey::Mountain]);

        assert_eq!(by_mountain.len(), 2);
        assert_eq!(by_mountain[1].weight, Some(21.0));
        // Grouping on a key the aggregate does not carry yields nothing
        assert!(group_means(&by_mountain, &[GroupKey::Genus]).is_empty());
    }

    #[test]
    fn test_unique_species_per_mountain() {
        let unique = unique_count(&sample(), GroupKey::Mountain, GroupKey::Species);

        assert_eq!(unique.get(&1), Some(&3));
        assert_eq!(unique.get(&2), Some(&2));
    }

    #[test]
    fn test_count_by() {
        let counts = count_by(&sample(), GroupKey::Genus);
        assert_eq!(counts.get(&1), Some(&3));
        assert_eq!(counts.get(&2), Some(&2));
    }
}
