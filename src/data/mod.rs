/// Data layer: snapshot classification, decoding, normalization and views.
///
/// Architecture:
/// ```text
///  filename ──► classify ──► (date, region)
///                                 │
///  bytes ──► loader ──► RawTable  │
///                │                │
///                ▼                ▼
///          ┌──────────┐    ┌──────────┐
///          │  schema   │──►│  enrich   │  canonical columns, region, date
///          └──────────┘    └──────────┘
///                                │
///                                ▼
///                         ┌────────────┐
///                         │ StockTable  │  merged dataset
///                         └────────────┘
///                           │        │
///                           ▼        ▼
///                    ┌─────────┐ ┌─────────┐
///                    │ filter   │ │ summary  │
///                    └─────────┘ └─────────┘
/// ```

pub mod classify;
pub mod enrich;
pub mod filter;
pub mod loader;
pub mod model;
pub mod region;
pub mod schema;
pub mod summary;
