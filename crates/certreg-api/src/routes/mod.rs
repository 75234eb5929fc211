//! # API Route Modules
//!
//! - `certificates`: issue, verify, revoke.
//! - `documents`: upload and download by content reference.
//! - `issuers`: authorization-set administration.

pub mod certificates;
pub mod documents;
pub mod issuers;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(certificates::router())
        .merge(documents::router())
        .merge(issuers::router())
}
