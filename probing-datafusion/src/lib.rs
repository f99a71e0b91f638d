//! Re-exports the pinned `datafusion` version used by `probing-query`, so
//! every downstream crate depends on this wrapper instead of `datafusion`
//! directly and a version bump only ever touches one `Cargo.toml`.
pub use upstream::*;
