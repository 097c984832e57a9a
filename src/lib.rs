//! Regional stock decile snapshots: ingest a folder of CSV/Parquet/JSON
//! files named by region and date, normalize them into one dataset, and
//! answer filtered views over it.

pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod source;
pub mod state;
pub mod sync;

pub use data::classify::classify;
pub use data::enrich::enrich;
pub use data::filter::{apply_filters, ViewFilter};
pub use data::model::{StockRecord, StockTable};
pub use data::region::RegionTag;
pub use data::schema::normalize;
