//! Status workflow for meeting requests.
//!
//! ```text
//! Draft -> Pending -> Approved -> Confirmed -> Announced
//!             |          |           |
//!             +----------+-----------+--> Cancelled
//! ```
//!
//! `confirm` is also accepted straight from `Pending`. Every legality
//! decision goes through [`validate_transition`]; the engine does not look
//! at capabilities, callers do that before invoking it.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use super::attachments::BlobStore;
use super::audit::{collect_entries, FieldChange, CANCELLATION_REASON_FIELD};
use super::error::MeetingRequestsError;
use super::reference::save_with_reference_number;
use super::store::MeetingRequestStore;
use super::types::{MeetingRequest, RequestStatus};

const REFERENCE_NUMBER_FIELD: &str = "Reference Number";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Submit,
    Approve,
    Confirm,
    Announce,
    Cancel,
}

impl Transition {
    pub const ALL: [Transition; 5] = [
        Self::Submit,
        Self::Approve,
        Self::Confirm,
        Self::Announce,
        Self::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Confirm => "confirm",
            Self::Announce => "announce",
            Self::Cancel => "cancel",
        }
    }

    pub fn target(&self) -> RequestStatus {
        match self {
            Self::Submit => RequestStatus::Pending,
            Self::Approve => RequestStatus::Approved,
            Self::Confirm => RequestStatus::Confirmed,
            Self::Announce => RequestStatus::Announced,
            Self::Cancel => RequestStatus::Cancelled,
        }
    }

    fn allowed_from(&self, from: RequestStatus) -> bool {
        use RequestStatus::*;
        match self {
            Self::Submit => from == Draft,
            Self::Approve => from == Pending,
            Self::Confirm => matches!(from, Pending | Approved),
            Self::Announce => from == Confirmed,
            Self::Cancel => matches!(from, Pending | Approved | Confirmed),
        }
    }
}

pub fn validate_transition(
    from: RequestStatus,
    transition: Transition,
) -> Result<RequestStatus, MeetingRequestsError> {
    if transition.allowed_from(from) {
        Ok(transition.target())
    } else {
        Err(MeetingRequestsError::InvalidTransition {
            action: transition.as_str(),
            from,
        })
    }
}

pub fn ensure_deletable(request: &MeetingRequest) -> Result<(), MeetingRequestsError> {
    if request.status == RequestStatus::Draft {
        Ok(())
    } else {
        Err(MeetingRequestsError::InvalidOperation(format!(
            "Only drafts can be deleted; request {} is {}",
            request.id, request.status
        )))
    }
}

/// Fields a submitted request must carry.
pub fn validate_required_fields(
    title: &str,
    meeting_date_present: bool,
) -> Result<(), MeetingRequestsError> {
    let mut missing = Vec::new();
    if title.trim().is_empty() {
        missing.push("title");
    }
    if !meeting_date_present {
        missing.push("meetingDate");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MeetingRequestsError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

#[derive(Clone)]
pub struct LifecycleEngine {
    store: Arc<dyn MeetingRequestStore>,
    blobs: Arc<dyn BlobStore>,
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn MeetingRequestStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    async fn load(&self, id: i64) -> Result<MeetingRequest, MeetingRequestsError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| MeetingRequestsError::request_not_found(id))
    }

    /// Validates, mutates and commits one status change along with its
    /// audit rows. `extra` rows ride in the same commit.
    async fn apply(
        &self,
        mut request: MeetingRequest,
        transition: Transition,
        actor: &str,
        extra: Vec<FieldChange>,
    ) -> Result<MeetingRequest, MeetingRequestsError> {
        let from = request.status;
        let to = validate_transition(from, transition)?;
        let now = Utc::now();

        request.status = to;
        request.updated_at = now;
        request.updated_by = actor.to_string();

        let mut changes = vec![FieldChange::status(Some(from), to)];
        changes.extend(extra);
        let entries = collect_entries(actor, now, changes);
        self.store.commit_update(&request, entries).await?;

        info!(
            "Meeting request {} moved {} -> {} by {}",
            request.id, from, to, actor
        );
        Ok(request)
    }

    pub async fn approve(&self, id: i64, actor: &str) -> Result<MeetingRequest, MeetingRequestsError> {
        let request = self.load(id).await?;
        self.apply(request, Transition::Approve, actor, Vec::new()).await
    }

    pub async fn confirm(&self, id: i64, actor: &str) -> Result<MeetingRequest, MeetingRequestsError> {
        let request = self.load(id).await?;
        self.apply(request, Transition::Confirm, actor, Vec::new()).await
    }

    pub async fn announce(&self, id: i64, actor: &str) -> Result<MeetingRequest, MeetingRequestsError> {
        let request = self.load(id).await?;
        self.apply(request, Transition::Announce, actor, Vec::new()).await
    }

    pub async fn cancel(
        &self,
        id: i64,
        actor: &str,
        reason: Option<&str>,
    ) -> Result<MeetingRequest, MeetingRequestsError> {
        let reason = reason.map(str::trim).unwrap_or_default();
        if reason.is_empty() {
            return Err(MeetingRequestsError::Validation(
                "A cancellation reason is required".to_string(),
            ));
        }
        let request = self.load(id).await?;
        let reason_entry = FieldChange::new(CANCELLATION_REASON_FIELD, None::<String>, reason);
        self.apply(request, Transition::Cancel, actor, vec![reason_entry])
            .await
    }

    /// Moves a draft to `Pending`, assigning its reference number. `edits`
    /// are field changes already applied to `request` by the caller.
    pub async fn submit(
        &self,
        mut request: MeetingRequest,
        actor: &str,
        edits: Vec<FieldChange>,
    ) -> Result<MeetingRequest, MeetingRequestsError> {
        validate_transition(request.status, Transition::Submit)?;
        validate_required_fields(&request.title, request.meeting_date.is_some())?;

        request.is_draft = false;
        if request.reference_number.is_some() {
            return self.apply(request, Transition::Submit, actor, edits).await;
        }

        let store = self.store.as_ref();
        save_with_reference_number(
            |candidate| async move { store.reference_number_exists(&candidate).await },
            |reference_number| {
                let mut request = request.clone();
                let mut edits = edits.clone();
                edits.push(FieldChange::new(
                    REFERENCE_NUMBER_FIELD,
                    None::<String>,
                    reference_number.as_deref(),
                ));
                request.reference_number = reference_number;
                self.apply(request, Transition::Submit, actor, edits)
            },
        )
        .await
    }

    /// Deletes a draft: backing files first, then rows.
    pub async fn delete(&self, id: i64, actor: &str) -> Result<(), MeetingRequestsError> {
        let request = self.load(id).await?;
        ensure_deletable(&request)?;

        let attachments = self.store.list_attachments(id).await?;
        for attachment in &attachments {
            self.blobs.delete(&attachment.storage_path).await?;
        }
        self.store.delete_request(id).await?;

        info!(
            "Draft meeting request {} deleted by {} ({} attachments)",
            id,
            actor,
            attachments.len()
        );
        Ok(())
    }
}
