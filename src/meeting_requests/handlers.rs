use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::error::MeetingRequestsError;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::query::{ListQuery, PagedResult};
use super::types::{
    Attachment, CancelRequest, CreateOutcome, CreatedResponse, MeetingRequest,
    MeetingRequestBody, MeetingRequestDetail, MessageResponse, UpdatedResponse,
};
use crate::core::shared::state::AppState;
use crate::security::auth::AuthenticatedUser;
use crate::security::capabilities::Capability;

type ApiResult<T> = Result<T, MeetingRequestsError>;

pub async fn list_meeting_requests(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<PagedResult<MeetingRequest>>> {
    Ok(Json(state.meeting_requests.list(query).await?))
}

pub async fn create_meeting_request(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<MeetingRequestBody>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let outcome = state
        .meeting_requests
        .create(body, user.identity())
        .await?;
    let status = match outcome {
        CreateOutcome::Created(_) => StatusCode::CREATED,
        CreateOutcome::Duplicate(_) => StatusCode::OK,
    };
    Ok((status, Json(outcome.into())))
}

pub async fn save_draft(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<MeetingRequestBody>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let draft = state
        .meeting_requests
        .save_draft(body, user.identity())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: draft.id,
            duplicate: None,
        }),
    ))
}

pub async fn get_meeting_request(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MeetingRequestDetail>> {
    Ok(Json(state.meeting_requests.get_detail(id).await?))
}

pub async fn update_meeting_request(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<MeetingRequestBody>,
) -> ApiResult<Json<UpdatedResponse>> {
    let updated = state
        .meeting_requests
        .update(id, body, user.identity())
        .await?;
    Ok(Json(UpdatedResponse {
        id: updated.id,
        message: "Meeting request updated".to_string(),
    }))
}

pub async fn delete_meeting_request(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .meeting_requests
        .lifecycle()
        .delete(id, user.identity())
        .await?;
    Ok(Json(MessageResponse::new("Draft meeting request deleted")))
}

pub async fn submit_meeting_request(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MessageResponse>> {
    let request = state.meeting_requests.submit(id, user.identity()).await?;
    Ok(Json(MessageResponse::new(format!(
        "Meeting request submitted with reference {}",
        request.reference_number.as_deref().unwrap_or("pending")
    ))))
}

pub async fn approve_meeting_request(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.policy.require(&user, Capability::Approve)?;
    state
        .meeting_requests
        .lifecycle()
        .approve(id, user.identity())
        .await?;
    Ok(Json(MessageResponse::new("Meeting request approved")))
}

pub async fn confirm_meeting_request(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.policy.require(&user, Capability::Confirm)?;
    state
        .meeting_requests
        .lifecycle()
        .confirm(id, user.identity())
        .await?;
    Ok(Json(MessageResponse::new("Meeting request confirmed")))
}

pub async fn announce_meeting_request(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.policy.require(&user, Capability::Announce)?;
    state
        .meeting_requests
        .lifecycle()
        .announce(id, user.identity())
        .await?;
    Ok(Json(MessageResponse::new("Meeting request announced")))
}

pub async fn cancel_meeting_request(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    body: Option<ApiJson<CancelRequest>>,
) -> ApiResult<Json<MessageResponse>> {
    state.policy.require(&user, Capability::Cancel)?;
    let reason = body.and_then(|ApiJson(b)| b.reason);
    state
        .meeting_requests
        .lifecycle()
        .cancel(id, user.identity(), reason.as_deref())
        .await?;
    Ok(Json(MessageResponse::new("Meeting request cancelled")))
}

pub async fn list_attachments(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Vec<Attachment>>> {
    Ok(Json(state.attachments.list(id).await?))
}

pub async fn upload_attachment(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Attachment>)> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MeetingRequestsError::Validation(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| MeetingRequestsError::Validation(format!("Malformed upload: {e}")))?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) = upload
        .ok_or_else(|| MeetingRequestsError::Validation("No file provided".to_string()))?;

    let attachment = state
        .attachments
        .upload(id, &file_name, data, user.identity())
        .await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

pub async fn download_attachment(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    ApiPath((id, attachment_id)): ApiPath<(i64, Uuid)>,
) -> ApiResult<Response> {
    let (attachment, data) = state.attachments.download(id, attachment_id).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment.file_name.replace(['"', '\\'], "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, attachment.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(data),
    )
        .into_response())
}

pub async fn delete_attachment(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath((id, attachment_id)): ApiPath<(i64, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .attachments
        .delete(id, attachment_id, user.identity())
        .await?;
    Ok(Json(MessageResponse::new("Attachment deleted")))
}
