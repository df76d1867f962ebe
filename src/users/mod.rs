use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
#[cfg(test)]
pub(crate) mod memory;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use repo::{PgUserStore, StoreError, UserStore};
pub use services::AccountService;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::user_routes())
}
