use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod memory;
pub mod model;
pub mod pg;
pub mod repo;
pub mod store;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::user_routes())
}
