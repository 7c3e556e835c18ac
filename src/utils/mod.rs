//! Utility modules

pub mod hash;

pub use hash::{hash_to_hex, table_digest, table_digest_hex};
