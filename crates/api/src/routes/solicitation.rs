//! Route definitions for solicitations.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::solicitation;
use crate::state::AppState;

/// Routes mounted at `/solicitations`.
///
/// ```text
/// GET    /                                         -> list
/// POST   /                                         -> create
/// GET    /page                                     -> page
/// GET    /{id}                                     -> get_by_id
/// PATCH  /{id}                                     -> patch
/// DELETE /{id}                                     -> delete
/// PATCH  /{id}/toggle                              -> toggle
/// POST   /{id}/comments                            -> add_comment
/// GET    /{id}/files/{file_name}                   -> download
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(solicitation::list).post(solicitation::create))
        .route("/page", get(solicitation::page))
        .route(
            "/{id}",
            get(solicitation::get_by_id)
                .patch(solicitation::patch)
                .delete(solicitation::delete),
        )
        .route("/{id}/toggle", patch(solicitation::toggle))
        .route("/{id}/comments", post(solicitation::add_comment))
        .route("/{id}/files/{file_name}", get(solicitation::download))
}
