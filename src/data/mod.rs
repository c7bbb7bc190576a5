/// Data layer: core types, loading, derivation, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table, drop incomplete rows (cached once)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ features  │  AgeGroup, BalanceBucket, ChurnStatus per record
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply FilterSpec predicates → Subset (row indices)
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │  stats    │   │  export   │  CSV bytes for download
///   └──────────┘   └──────────┘
///   KPIs, grouped rates, histogram, box plots, risk counts
/// ```

pub mod error;
pub mod export;
pub mod features;
pub mod filter;
pub mod loader;
pub mod model;
pub mod stats;
