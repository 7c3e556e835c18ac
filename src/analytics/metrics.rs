//! Metrics calculation for chart rendering

use crate::analytics::grouping::{unique_count, GroupKey, Record};
use crate::simulation::table::SampleTable;
use crate::simulation::SimulationResults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const HISTOGRAM_BUCKETS: usize = 10;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator), `None` below two values
pub fn sample_sd(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Quantile of sorted data with linear interpolation between closest ranks
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Calculator for chart metrics
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Elevation / weight points per value of `key`
    pub fn scatter_by(table: &SampleTable, key: GroupKey) -> BTreeMap<u32, Vec<ScatterPoint>> {
        let mut series: BTreeMap<u32, Vec<ScatterPoint>> = BTreeMap::new();
        for obs in table {
            if let Some(group) = obs.key(key) {
                series.entry(group).or_default().push(ScatterPoint {
                    x: obs.elevation,
                    y: obs.weight,
                });
            }
        }
        series
    }

    /// Five-number summary of weight per value of `key`
    pub fn box_stats_by(table: &SampleTable, key: GroupKey) -> Vec<BoxStats> {
        let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for obs in table {
            if let Some(group) = obs.key(key) {
                groups.entry(group).or_default().push(obs.weight);
            }
        }

        groups
            .into_iter()
            .filter_map(|(group, values)| BoxStats::from_values(group, values))
            .collect()
    }

    /// Least-squares fit of weight on elevation per value of `key`
    pub fn fits_by(table: &SampleTable, key: GroupKey) -> BTreeMap<u32, LinearFit> {
        Self::scatter_by(table, key)
            .into_iter()
            .filter_map(|(group, points)| LinearFit::fit(&points).map(|fit| (group, fit)))
            .collect()
    }

    /// Equal-width histogram of weights
    pub fn weight_distribution(table: &SampleTable) -> Vec<HistogramBucket> {
        histogram(&table.weights(), HISTOGRAM_BUCKETS)
    }

    /// Per-mountain overview rows for the report table
    pub fn mountain_overview(results: &SimulationResults) -> Vec<MountainOverview> {
        let rows = results.table.rows();
        let unique_species = unique_count(rows, GroupKey::Mountain, GroupKey::Species);
        let unique_genera = unique_count(rows, GroupKey::Mountain, GroupKey::Genus);
        let fits = Self::fits_by(&results.table, GroupKey::Mountain);

        crate::analytics::grouping::group_by(rows, &[GroupKey::Mountain])
            .into_iter()
            .filter_map(|summary| {
                let (_, mountain) = *summary.keys.first()?;
                let weight = summary.weight?;
                Some(MountainOverview {
                    mountain,
                    count: summary.count,
                    mean_weight: weight.mean,
                    sd_weight: weight.sd,
                    unique_species: unique_species.get(&mountain).copied().unwrap_or(0),
                    unique_genera: unique_genera.get(&mountain).copied().unwrap_or(0),
                    fit: fits.get(&mountain).copied(),
                })
            })
            .collect()
    }
}

/// Split `values` into `buckets` equal-width ranges between min and max
pub fn histogram(values: &[f64], buckets: usize) -> Vec<HistogramBucket> {
    if values.is_empty() || buckets == 0 {
        return vec![];
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let bucket_size = (max - min) / buckets as f64;

    if bucket_size == 0.0 {
        return vec![HistogramBucket {
            range_start: min,
            range_end: max,
            count: values.len() as u32,
            label: format!("{:.2}", min),
        }];
    }

    let mut out: Vec<HistogramBucket> = (0..buckets)
        .map(|i| {
            let start = min + (i as f64 * bucket_size);
            let end = start + bucket_size;
            HistogramBucket {
                range_start: start,
                range_end: end,
                count: 0,
                label: format!("{:.2}-{:.2}", start, end),
            }
        })
        .collect();

    for value in values {
        let idx = ((value - min) / bucket_size).floor() as usize;
        out[idx.min(buckets - 1)].count += 1;
    }

    out
}

/// Point for scatter charts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
}

/// Box plot statistics for one group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxStats {
    pub group: u32,
    pub count: u32,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl BoxStats {
    pub fn from_values(group: u32, mut values: Vec<f64>) -> Option<Self> {
        values.sort_by(|a, b| a.total_cmp(b));
        Some(Self {
            group,
            count: values.len() as u32,
            min: *values.first()?,
            q1: quantile_sorted(&values, 0.25)?,
            median: quantile_sorted(&values, 0.5)?,
            q3: quantile_sorted(&values, 0.75)?,
            max: *values.last()?,
        })
    }
}

/// Ordinary least-squares line `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
    pub n: u32,
}

impl LinearFit {
    /// `None` with fewer than two points or no spread in x
    pub fn fit(points: &[ScatterPoint]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
        let mx = mean(&xs)?;
        let my = mean(&ys)?;

        let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
        if sxx == 0.0 {
            return None;
        }
        let sxy: f64 = points.iter().map(|p| (p.x - mx) * (p.y - my)).sum();
        let slope = sxy / sxx;

        Some(Self {
            intercept: my - slope * mx,
            slope,
            n: points.len() as u32,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Histogram bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub range_start: f64,
    pub range_end: f64,
    pub count: u32,
    pub label: String,
}

/// Report row describing one mountain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountainOverview {
    pub mountain: u32,
    pub count: u32,
    pub mean_weight: f64,
    pub sd_weight: Option<f64>,
    pub unique_species: u32,
    pub unique_genera: u32,
    pub fit: Option<LinearFit>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::table::Observation;

    #[test]
    fn test_mean_and_sd() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
        assert_eq!(sample_sd(&[1.0]), None);
        assert!((sample_sd(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap() - 2.138089935).abs() < 1e-6);
    }

    #[test]
    fn test_quantiles() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile_sorted(&sorted, 1.0), Some(4.0));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_box_stats() {
        let stats = BoxStats::from_values(1, vec![5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.q3, 4.0);
        assert_eq!(stats.max, 5.0);
        assert!(BoxStats::from_values(1, vec![]).is_none());
    }

    #[test]
    fn test_linear_fit_recovers_line() {
        let points: Vec<ScatterPoint> = (0..10)
            .map(|i| {
                let x = i as f64 - 4.5;
                ScatterPoint { x, y: 3.0 - 2.0 * x }
            })
            .collect();
        let fit = LinearFit::fit(&points).unwrap();

        assert!((fit.slope + 2.0).abs() < 1e-9);
        assert!((fit.intercept - 3.0).abs() < 1e-9);
        assert!((fit.predict(1.0) - 1.0).abs() < 1e-9);

        let flat = [ScatterPoint { x: 1.0, y: 0.0 }, ScatterPoint { x: 1.0, y: 2.0 }];
        assert!(LinearFit::fit(&flat).is_none());
    }

    #[test]
    fn test_histogram() {
        assert!(histogram(&[], 10).is_empty());

        let single = histogram(&[3.0, 3.0], 10);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].count, 2);

        let values: Vec<f64> = (0..=100).map(|v| v as f64).collect();
        let buckets = histogram(&values, 10);
        assert_eq!(buckets.len(), 10);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u32>(), 101);
        // max lands in the last bucket
        assert_eq!(buckets[9].count, 11);
    }

    #[test]
    fn test_scatter_and_box_by_mountain() {
        let table = SampleTable::new(vec![
            Observation { mountain: 1, genus: 1, species: 1, elevation: 0.0, weight: 1.0 },
            Observation { mountain: 2, genus: 1, species: 1, elevation: 1.0, weight: 2.0 },
            Observation { mountain: 2, genus: 1, species: 2, elevation: 2.0, weight: 4.0 },
        ]);

        let scatter = MetricsCalculator::scatter_by(&table, GroupKey::Mountain);
        assert_eq!(scatter.len(), 2);
        assert_eq!(scatter[&2].len(), 2);

        let boxes = MetricsCalculator::box_stats_by(&table, GroupKey::Mountain);
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[1].median, 3.0);

        let fits = MetricsCalculator::fits_by(&table, GroupKey::Mountain);
        assert!(!fits.contains_key(&1));
        assert!((fits[&2].slope - 2.0).abs() < 1e-12);
    }
}
