//! Aircap API - HTTP surface of the data source manager
//!
//! A thin axum layer over [`aircap_datasource::DataSourceTracker`]:
//!
//! - `GET  /datasource/all_sources` - snapshot of active and failed sources
//! - `GET  /datasource/types` - registered driver summaries
//! - `POST /datasource/add_source` - open a source from a definition string
//! - `POST /datasource/remove_source` - tear a source down by UUID
//! - `GET  /health`, `GET /metrics` - operational endpoints
//!
//! The API holds no state of its own; every handler delegates to the
//! tracker and serializes its snapshots.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
