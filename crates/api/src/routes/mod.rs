pub mod health;
pub mod solicitation;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /solicitations                                   list, create
/// /solicitations/page                              paginated list
/// /solicitations/{id}                              get, patch, delete
/// /solicitations/{id}/toggle                       close / reopen
/// /solicitations/{id}/comments                     add comment
/// /solicitations/{id}/files/{file_name}            download attachment
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/solicitations", solicitation::router())
}
