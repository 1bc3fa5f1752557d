use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::audit::sort_for_display;
use super::error::MeetingRequestsError;
use super::query::{sort_newest_first, ListFilters, PageRequest};
use super::types::{Attachment, AuditEntry, MeetingRequest, NewAuditEntry, NewMeetingRequest};

pub type StoreResult<T> = Result<T, MeetingRequestsError>;

/// Persistence seam for requests, their audit trail and attachment metadata.
///
/// Each method is one unit of work. Methods that take audit entries write
/// them in the same transaction as the row change.
#[async_trait]
pub trait MeetingRequestStore: Send + Sync {
    async fn insert(
        &self,
        request: NewMeetingRequest,
        audit: Vec<NewAuditEntry>,
    ) -> StoreResult<MeetingRequest>;

    async fn get(&self, id: i64) -> StoreResult<Option<MeetingRequest>>;

    /// Non-draft request with the same title, meeting date and category.
    async fn find_duplicate(
        &self,
        title: &str,
        meeting_date: NaiveDate,
        category: &str,
    ) -> StoreResult<Option<i64>>;

    async fn reference_number_exists(&self, candidate: &str) -> StoreResult<bool>;

    /// Overwrites the stored row with `request` and appends `audit`.
    async fn commit_update(
        &self,
        request: &MeetingRequest,
        audit: Vec<NewAuditEntry>,
    ) -> StoreResult<()>;

    async fn append_audit_entries(
        &self,
        request_id: i64,
        audit: Vec<NewAuditEntry>,
    ) -> StoreResult<usize>;

    /// Newest first.
    async fn audit_entries(&self, request_id: i64) -> StoreResult<Vec<AuditEntry>>;

    /// One page plus the total count of matching rows.
    async fn list(
        &self,
        filters: &ListFilters,
        page: PageRequest,
    ) -> StoreResult<(Vec<MeetingRequest>, i64)>;

    /// Removes attachment rows, audit rows and the request row together.
    async fn delete_request(&self, id: i64) -> StoreResult<()>;

    async fn list_attachments(&self, request_id: i64) -> StoreResult<Vec<Attachment>>;

    async fn count_attachments(&self, request_id: i64) -> StoreResult<i64>;

    /// Inserts unless the request already holds `max_per_request`
    /// attachments. The count and the insert are one unit of work.
    async fn insert_attachment(
        &self,
        attachment: &Attachment,
        max_per_request: usize,
    ) -> StoreResult<()>;

    async fn get_attachment(
        &self,
        request_id: i64,
        attachment_id: Uuid,
    ) -> StoreResult<Option<Attachment>>;

    async fn delete_attachment(&self, request_id: i64, attachment_id: Uuid) -> StoreResult<()>;
}

#[derive(Debug, Default)]
struct Tables {
    requests: BTreeMap<i64, MeetingRequest>,
    audit: Vec<AuditEntry>,
    attachments: Vec<Attachment>,
    next_request_id: i64,
    next_audit_id: i64,
}

impl Tables {
    /// Mirrors the UNIQUE constraint on `reference_number`.
    fn check_reference_free(&self, reference: Option<&str>, own_id: Option<i64>) -> StoreResult<()> {
        let Some(reference) = reference else {
            return Ok(());
        };
        let clash = self.requests.values().any(|r| {
            Some(r.id) != own_id && r.reference_number.as_deref() == Some(reference)
        });
        if clash {
            return Err(MeetingRequestsError::ReferenceTaken(reference.to_string()));
        }
        Ok(())
    }

    fn push_audit(&mut self, request_id: i64, audit: Vec<NewAuditEntry>) -> usize {
        let count = audit.len();
        for entry in audit {
            self.next_audit_id += 1;
            let id = self.next_audit_id;
            self.audit.push(entry.into_entry(id, request_id));
        }
        count
    }
}

/// Store kept entirely in process memory. Used by the test suites and for
/// running the server without a database.
#[derive(Debug, Default)]
pub struct InMemoryMeetingRequestStore {
    tables: RwLock<Tables>,
}

impl InMemoryMeetingRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MeetingRequestStore for InMemoryMeetingRequestStore {
    async fn insert(
        &self,
        request: NewMeetingRequest,
        audit: Vec<NewAuditEntry>,
    ) -> StoreResult<MeetingRequest> {
        let mut tables = self.tables.write().await;
        tables.check_reference_free(request.reference_number.as_deref(), None)?;

        tables.next_request_id += 1;
        let id = tables.next_request_id;
        let stored = request.into_request(id);
        tables.requests.insert(id, stored.clone());
        tables.push_audit(id, audit);
        Ok(stored)
    }

    async fn get(&self, id: i64) -> StoreResult<Option<MeetingRequest>> {
        Ok(self.tables.read().await.requests.get(&id).cloned())
    }

    async fn find_duplicate(
        &self,
        title: &str,
        meeting_date: NaiveDate,
        category: &str,
    ) -> StoreResult<Option<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .requests
            .values()
            .find(|r| {
                !r.is_draft
                    && r.title.eq_ignore_ascii_case(title)
                    && r.meeting_date == Some(meeting_date)
                    && r.category.eq_ignore_ascii_case(category)
            })
            .map(|r| r.id))
    }

    async fn reference_number_exists(&self, candidate: &str) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .requests
            .values()
            .any(|r| r.reference_number.as_deref() == Some(candidate)))
    }

    async fn commit_update(
        &self,
        request: &MeetingRequest,
        audit: Vec<NewAuditEntry>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.check_reference_free(request.reference_number.as_deref(), Some(request.id))?;
        match tables.requests.get_mut(&request.id) {
            Some(existing) => *existing = request.clone(),
            None => return Err(MeetingRequestsError::request_not_found(request.id)),
        }
        tables.push_audit(request.id, audit);
        Ok(())
    }

    async fn append_audit_entries(
        &self,
        request_id: i64,
        audit: Vec<NewAuditEntry>,
    ) -> StoreResult<usize> {
        let mut tables = self.tables.write().await;
        if !tables.requests.contains_key(&request_id) {
            return Err(MeetingRequestsError::request_not_found(request_id));
        }
        Ok(tables.push_audit(request_id, audit))
    }

    async fn audit_entries(&self, request_id: i64) -> StoreResult<Vec<AuditEntry>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<AuditEntry> = tables
            .audit
            .iter()
            .filter(|e| e.meeting_request_id == request_id)
            .cloned()
            .collect();
        sort_for_display(&mut entries);
        Ok(entries)
    }

    async fn list(
        &self,
        filters: &ListFilters,
        page: PageRequest,
    ) -> StoreResult<(Vec<MeetingRequest>, i64)> {
        let tables = self.tables.read().await;
        let mut matching: Vec<MeetingRequest> = tables
            .requests
            .values()
            .filter(|r| filters.matches(r))
            .cloned()
            .collect();
        sort_newest_first(&mut matching);

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .collect();
        Ok((items, total))
    }

    async fn delete_request(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.requests.remove(&id).is_none() {
            return Err(MeetingRequestsError::request_not_found(id));
        }
        tables.attachments.retain(|a| a.meeting_request_id != id);
        tables.audit.retain(|e| e.meeting_request_id != id);
        Ok(())
    }

    async fn list_attachments(&self, request_id: i64) -> StoreResult<Vec<Attachment>> {
        let tables = self.tables.read().await;
        let mut attachments: Vec<Attachment> = tables
            .attachments
            .iter()
            .filter(|a| a.meeting_request_id == request_id)
            .cloned()
            .collect();
        attachments.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(attachments)
    }

    async fn count_attachments(&self, request_id: i64) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .attachments
            .iter()
            .filter(|a| a.meeting_request_id == request_id)
            .count() as i64)
    }

    async fn insert_attachment(
        &self,
        attachment: &Attachment,
        max_per_request: usize,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let request_id = attachment.meeting_request_id;
        if !tables.requests.contains_key(&request_id) {
            return Err(MeetingRequestsError::request_not_found(request_id));
        }
        let existing = tables
            .attachments
            .iter()
            .filter(|a| a.meeting_request_id == request_id)
            .count();
        if existing >= max_per_request {
            return Err(MeetingRequestsError::attachment_limit(max_per_request));
        }
        tables.attachments.push(attachment.clone());
        Ok(())
    }

    async fn get_attachment(
        &self,
        request_id: i64,
        attachment_id: Uuid,
    ) -> StoreResult<Option<Attachment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attachments
            .iter()
            .find(|a| a.meeting_request_id == request_id && a.id == attachment_id)
            .cloned())
    }

    async fn delete_attachment(&self, request_id: i64, attachment_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.attachments.len();
        tables
            .attachments
            .retain(|a| !(a.meeting_request_id == request_id && a.id == attachment_id));
        if tables.attachments.len() == before {
            return Err(MeetingRequestsError::NotFound(format!(
                "Attachment {attachment_id} not found"
            )));
        }
        Ok(())
    }
}
