//! Observation table
//!
//! The flat table of generated observations with their nested group labels.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One measured individual
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Mountain label (1-based)
    pub mountain: u32,
    /// Genus label (1-based)
    pub genus: u32,
    /// Species label (1-based)
    pub species: u32,
    /// Standardized elevation
    pub elevation: f64,
    /// Body weight
    pub weight: f64,
}

/// Column-agnostic table of observations, never mutated after generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleTable {
    rows: Vec<Observation>,
}

pub const CSV_HEADER: &str = "mountain,genus,species,elevation,weight";

impl SampleTable {
    pub fn new(rows: Vec<Observation>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.rows.iter()
    }

    pub fn elevations(&self) -> Vec<f64> {
        self.rows.iter().map(|o| o.elevation).collect()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.rows.iter().map(|o| o.weight).collect()
    }

    /// Observations recorded on one mountain
    pub fn for_mountain(&self, mountain: u32) -> impl Iterator<Item = &Observation> {
        self.rows.iter().filter(move |o| o.mountain == mountain)
    }

    /// Row counts keyed by mountain label
    pub fn rows_per_mountain(&self) -> BTreeMap<u32, u32> {
        let mut counts = BTreeMap::new();
        for obs in &self.rows {
            *counts.entry(obs.mountain).or_insert(0) += 1;
        }
        counts
    }

    /// Render as CSV with a header line
    pub fn to_csv(&self) -> String {
        let mut out = String::with_capacity(self.rows.len() * 48 + CSV_HEADER.len() + 1);
        out.push_str(CSV_HEADER);
        out.push('\n');
        for obs in &self.rows {
            out.push_str(&format!(
                "{},{},{},{},{}\n",
                obs.mountain, obs.genus, obs.species, obs.elevation, obs.weight
            ));
        }
        out
    }
}

impl<'a> IntoIterator for &'a SampleTable {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
