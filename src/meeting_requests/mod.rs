//! Meeting request intake, review workflow and audit trail.

pub mod attachments;
pub mod audit;
pub mod dates;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod lifecycle;
pub mod pg_store;
pub mod query;
pub mod reference;
pub mod service;
pub mod store;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use error::MeetingRequestsError;
pub use handlers::*;
pub use types::{MeetingRequest, RequestStatus};

pub fn configure_meeting_requests_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/meetingrequests",
            get(list_meeting_requests).post(create_meeting_request),
        )
        .route("/api/meetingrequests/draft", post(save_draft))
        .route(
            "/api/meetingrequests/:id",
            get(get_meeting_request)
                .put(update_meeting_request)
                .delete(delete_meeting_request),
        )
        .route("/api/meetingrequests/:id/submit", post(submit_meeting_request))
        .route("/api/meetingrequests/:id/approve", post(approve_meeting_request))
        .route("/api/meetingrequests/:id/confirm", post(confirm_meeting_request))
        .route("/api/meetingrequests/:id/announce", post(announce_meeting_request))
        .route("/api/meetingrequests/:id/cancel", post(cancel_meeting_request))
        .route(
            "/api/meetingrequests/:id/attachments",
            get(list_attachments).post(upload_attachment),
        )
        .route(
            "/api/meetingrequests/:id/attachments/:attachment_id",
            get(download_attachment).delete(delete_attachment),
        )
}
