//! Table Digest Utilities
//!
//! SHA256 fingerprint of a generated table, used to confirm that a seeded
//! run replays bit for bit.

use crate::simulation::table::{Observation, SampleTable};
use sha2::{Digest, Sha256};

/// Bytes per serialized row
pub const ROW_BYTES: usize = 28;

/// Serialize one row to its canonical byte layout
/// Layout: mountain (u32 LE) + genus (u32 LE) + species (u32 LE)
///       + elevation (f64 bits LE) + weight (f64 bits LE)
/// Total: 4 + 4 + 4 + 8 + 8 = 28 bytes
pub fn serialize_row(obs: &Observation) -> [u8; ROW_BYTES] {
    let mut bytes = [0u8; ROW_BYTES];

    bytes[0..4].copy_from_slice(&obs.mountain.to_le_bytes());
    bytes[4..8].copy_from_slice(&obs.genus.to_le_bytes());
    bytes[8..12].copy_from_slice(&obs.species.to_le_bytes());
    bytes[12..20].copy_from_slice(&obs.elevation.to_bits().to_le_bytes());
    bytes[20..28].copy_from_slice(&obs.weight.to_bits().to_le_bytes());

    bytes
}

/// Hash every row of the table in order using SHA256
pub fn table_digest(table: &SampleTable) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update((table.len() as u64).to_le_bytes());
    for obs in table {
        hasher.update(serialize_row(obs));
    }
    let result = hasher.finalize();

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Convert hash to hex string for display
pub fn hash_to_hex(hash: &[u8; 32]) -> String {
    hash.iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Hex digest of a table
pub fn table_digest_hex(table: &SampleTable) -> String {
    hash_to_hex(&table_digest(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(weight: f64) -> Observation {
        Observation { mountain: 1, genus: 2, species: 3, elevation: -0.5, weight }
    }

    #[test]
    fn test_row_layout() {
        let bytes = serialize_row(&row(1.0));
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &3u32.to_le_bytes());
        assert_eq!(&bytes[20..28], &1.0f64.to_bits().to_le_bytes());
    }

    #[test]
    fn test_digest_determinism() {
        let a = SampleTable::new(vec![row(1.0), row(2.0)]);
        let b = SampleTable::new(vec![row(1.0), row(2.0)]);

        assert_eq!(table_digest(&a), table_digest(&b));
        assert_eq!(table_digest_hex(&a).len(), 64);
    }

    #[test]
    fn test_different_tables_different_digests() {
        let a = SampleTable::new(vec![row(1.0), row(2.0)]);
        let b = SampleTable::new(vec![row(2.0), row(1.0)]);

        assert_ne!(table_digest(&a), table_digest(&b));
    }
}
