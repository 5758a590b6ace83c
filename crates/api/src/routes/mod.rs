//! Route modules and router assembly

pub mod datasource;
pub mod ops;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(datasource::routes())
        .merge(ops::routes())
        .with_state(state)
}
