//! Field-level change log for meeting requests.
//!
//! Every mutating operation describes what it touched as a list of
//! [`FieldChange`]s. Values are reduced to a canonical string first, and
//! only pairs whose canonical forms differ become audit rows.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::debug;

use super::dates;
use super::error::MeetingRequestsError;
use super::store::MeetingRequestStore;
use super::types::{AuditEntry, NewAuditEntry, RequestStatus};

pub const STATUS_FIELD: &str = "Status";
pub const CANCELLATION_REASON_FIELD: &str = "Cancellation Reason";
pub const ATTACHMENT_FIELD: &str = "Attachment";

/// Canonical string form used both for comparison and for storage.
/// Empty strings collapse to `None`.
pub trait AuditValue {
    fn audit_value(&self) -> Option<String>;
}

impl AuditValue for str {
    fn audit_value(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl AuditValue for String {
    fn audit_value(&self) -> Option<String> {
        self.as_str().audit_value()
    }
}

impl AuditValue for NaiveDate {
    fn audit_value(&self) -> Option<String> {
        Some(dates::canonical(*self))
    }
}

impl AuditValue for RequestStatus {
    fn audit_value(&self) -> Option<String> {
        Some(self.as_str().to_string())
    }
}

impl AuditValue for bool {
    fn audit_value(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<T: AuditValue + ?Sized> AuditValue for &T {
    fn audit_value(&self) -> Option<String> {
        (**self).audit_value()
    }
}

impl<T: AuditValue> AuditValue for Option<T> {
    fn audit_value(&self) -> Option<String> {
        self.as_ref().and_then(AuditValue::audit_value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl FieldChange {
    pub fn new(field_name: &str, old: impl AuditValue, new: impl AuditValue) -> Self {
        Self {
            field_name: field_name.to_string(),
            old_value: old.audit_value(),
            new_value: new.audit_value(),
        }
    }

    pub fn status(from: Option<RequestStatus>, to: RequestStatus) -> Self {
        Self::new(STATUS_FIELD, from, to)
    }

    pub fn is_change(&self) -> bool {
        self.old_value != self.new_value
    }
}

/// Turns changes into pending audit rows, dropping unchanged pairs.
pub fn collect_entries(
    actor: &str,
    timestamp: DateTime<Utc>,
    changes: impl IntoIterator<Item = FieldChange>,
) -> Vec<NewAuditEntry> {
    changes
        .into_iter()
        .filter(FieldChange::is_change)
        .map(|change| NewAuditEntry {
            field_name: change.field_name,
            old_value: change.old_value,
            new_value: change.new_value,
            changed_by: actor.to_string(),
            changed_at: timestamp,
        })
        .collect()
}

/// Newest first; ties broken by id so rows written in one call keep a
/// stable order.
pub fn sort_for_display(entries: &mut [AuditEntry]) {
    entries.sort_by(|a, b| b.changed_at.cmp(&a.changed_at).then(b.id.cmp(&a.id)));
}

pub fn status_timeline(entries: &[AuditEntry]) -> Vec<AuditEntry> {
    entries
        .iter()
        .filter(|e| e.field_name == STATUS_FIELD)
        .cloned()
        .collect()
}

#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn MeetingRequestStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn MeetingRequestStore>) -> Self {
        Self { store }
    }

    /// Appends one row per changed field and returns how many were written.
    pub async fn record_field_changes(
        &self,
        request_id: i64,
        actor: &str,
        timestamp: DateTime<Utc>,
        changes: Vec<FieldChange>,
    ) -> Result<usize, MeetingRequestsError> {
        let entries = collect_entries(actor, timestamp, changes);
        if entries.is_empty() {
            return Ok(0);
        }
        let written = self.store.append_audit_entries(request_id, entries).await?;
        debug!("Recorded {written} audit entries for meeting request {request_id}");
        Ok(written)
    }

    pub async fn list_for_request(
        &self,
        request_id: i64,
    ) -> Result<Vec<AuditEntry>, MeetingRequestsError> {
        self.store.audit_entries(request_id).await
    }

    pub async fn status_changes(
        &self,
        request_id: i64,
    ) -> Result<Vec<AuditEntry>, MeetingRequestsError> {
        let entries = self.list_for_request(request_id).await?;
        Ok(status_timeline(&entries))
    }
}
