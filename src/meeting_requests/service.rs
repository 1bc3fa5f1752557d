use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use super::attachments::BlobStore;
use super::audit::{collect_entries, AuditRecorder, FieldChange};
use super::error::MeetingRequestsError;
use super::lifecycle::{validate_required_fields, LifecycleEngine};
use super::query::{ListQuery, PagedResult};
use super::reference::save_with_reference_number;
use super::store::MeetingRequestStore;
use super::types::{
    CreateOutcome, MeetingRequest, MeetingRequestBody, MeetingRequestDetail, NewMeetingRequest,
    RequestStatus,
};

fn patch_text(
    field: &str,
    target: &mut String,
    value: Option<String>,
    changes: &mut Vec<FieldChange>,
) {
    if let Some(value) = value {
        changes.push(FieldChange::new(field, target.as_str(), value.as_str()));
        *target = value;
    }
}

fn patch_date(
    field: &str,
    target: &mut Option<NaiveDate>,
    value: Option<NaiveDate>,
    changes: &mut Vec<FieldChange>,
) {
    if let Some(value) = value {
        changes.push(FieldChange::new(field, *target, value));
        *target = Some(value);
    }
}

/// Applies every field present in `body` to `request` and describes what
/// was touched. Unchanged values are still listed; the audit layer drops
/// them.
pub fn apply_body(request: &mut MeetingRequest, body: MeetingRequestBody) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    patch_text("Title", &mut request.title, body.title, &mut changes);
    patch_date("Meeting Date", &mut request.meeting_date, body.meeting_date, &mut changes);
    patch_date(
        "Alternate Date",
        &mut request.alternate_date,
        body.alternate_date,
        &mut changes,
    );
    patch_text("Category", &mut request.category, body.category, &mut changes);
    patch_text("Subcategory", &mut request.subcategory, body.subcategory, &mut changes);
    patch_text("Description", &mut request.description, body.description, &mut changes);
    patch_text("Comments", &mut request.comments, body.comments, &mut changes);
    patch_text(
        "Classification",
        &mut request.classification,
        body.classification,
        &mut changes,
    );
    patch_text(
        "Requestor Name",
        &mut request.requestor_name,
        body.requestor_name,
        &mut changes,
    );
    if let Some(email) = body.requestor_email {
        let email = Some(email).filter(|e| !e.trim().is_empty());
        changes.push(FieldChange::new(
            "Requestor Email",
            request.requestor_email.as_deref(),
            email.as_deref(),
        ));
        request.requestor_email = email;
    }
    patch_text("Request Type", &mut request.request_type, body.request_type, &mut changes);
    patch_text("Country", &mut request.country, body.country, &mut changes);

    changes
}

#[derive(Clone)]
pub struct MeetingRequestService {
    store: Arc<dyn MeetingRequestStore>,
    audit: AuditRecorder,
    lifecycle: LifecycleEngine,
}

impl MeetingRequestService {
    pub fn new(store: Arc<dyn MeetingRequestStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            audit: AuditRecorder::new(store.clone()),
            lifecycle: LifecycleEngine::new(store.clone(), blobs),
            store,
        }
    }

    pub fn lifecycle(&self) -> &LifecycleEngine {
        &self.lifecycle
    }

    pub fn audit(&self) -> &AuditRecorder {
        &self.audit
    }

    async fn load(&self, id: i64) -> Result<MeetingRequest, MeetingRequestsError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| MeetingRequestsError::request_not_found(id))
    }

    /// Validated submission. A likely duplicate short-circuits with the
    /// existing id and nothing is written.
    pub async fn create(
        &self,
        body: MeetingRequestBody,
        actor: &str,
    ) -> Result<CreateOutcome, MeetingRequestsError> {
        let title = body.title.as_deref().unwrap_or_default();
        validate_required_fields(title, body.meeting_date.is_some())?;

        if let Some(meeting_date) = body.meeting_date {
            let category = body.category.as_deref().unwrap_or_default();
            if let Some(existing) = self
                .store
                .find_duplicate(title, meeting_date, category)
                .await?
            {
                info!("Create by {actor} looks like a duplicate of meeting request {existing}");
                return Ok(CreateOutcome::Duplicate(existing));
            }
        }

        let now = Utc::now();
        let mut new = NewMeetingRequest::from_body(body, actor, now);
        new.status = RequestStatus::Pending;
        new.is_draft = false;

        let audit = collect_entries(actor, now, [FieldChange::status(None, RequestStatus::Pending)]);
        let store = self.store.as_ref();
        let created = save_with_reference_number(
            |candidate| async move { store.reference_number_exists(&candidate).await },
            |reference_number| {
                let mut new = new.clone();
                new.reference_number = reference_number;
                store.insert(new, audit.clone())
            },
        )
        .await?;

        info!(
            "Meeting request {} ({}) submitted by {}",
            created.id,
            created.reference_number.as_deref().unwrap_or("no reference"),
            actor
        );
        Ok(CreateOutcome::Created(created))
    }

    /// Saves without validation or reference number.
    pub async fn save_draft(
        &self,
        body: MeetingRequestBody,
        actor: &str,
    ) -> Result<MeetingRequest, MeetingRequestsError> {
        let now = Utc::now();
        let new = NewMeetingRequest::from_body(body, actor, now);
        let audit = collect_entries(actor, now, [FieldChange::status(None, RequestStatus::Draft)]);
        let draft = self.store.insert(new, audit).await?;

        info!("Draft meeting request {} saved by {}", draft.id, actor);
        Ok(draft)
    }

    pub async fn get(&self, id: i64) -> Result<MeetingRequest, MeetingRequestsError> {
        self.load(id).await
    }

    pub async fn get_detail(&self, id: i64) -> Result<MeetingRequestDetail, MeetingRequestsError> {
        let request = self.load(id).await?;
        let audit_logs = self.audit.list_for_request(id).await?;
        let status_changes = super::audit::status_timeline(&audit_logs);
        let attachments = self.store.list_attachments(id).await?;

        Ok(MeetingRequestDetail {
            id,
            meeting_request: request,
            audit_logs,
            status_changes,
            attachments,
        })
    }

    /// Field edits. `isDraft: false` on a draft submits it together with
    /// the edits.
    pub async fn update(
        &self,
        id: i64,
        body: MeetingRequestBody,
        actor: &str,
    ) -> Result<MeetingRequest, MeetingRequestsError> {
        let mut request = self.load(id).await?;
        if request.status.is_terminal() {
            return Err(MeetingRequestsError::InvalidOperation(format!(
                "Meeting request {} is {} and can no longer be edited",
                id, request.status
            )));
        }

        let submit = body.is_draft == Some(false) && request.status == RequestStatus::Draft;
        let changes = apply_body(&mut request, body);

        if submit {
            return self.lifecycle.submit(request, actor, changes).await;
        }

        let now = Utc::now();
        let entries = collect_entries(actor, now, changes);
        if entries.is_empty() {
            debug!("Update of meeting request {id} by {actor} changed nothing");
            return Ok(request);
        }

        request.updated_at = now;
        request.updated_by = actor.to_string();
        let changed = entries.len();
        self.store.commit_update(&request, entries).await?;

        info!("Meeting request {id} updated by {actor} ({changed} fields)");
        Ok(request)
    }

    pub async fn submit(&self, id: i64, actor: &str) -> Result<MeetingRequest, MeetingRequestsError> {
        let request = self.load(id).await?;
        self.lifecycle.submit(request, actor, Vec::new()).await
    }

    pub async fn list(
        &self,
        query: ListQuery,
    ) -> Result<PagedResult<MeetingRequest>, MeetingRequestsError> {
        let (filters, page) = query.into_parts();
        let (items, total) = self.store.list(&filters, page).await?;
        Ok(PagedResult::new(items, page, total))
    }
}
