use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::core::shared::schema::{
    meeting_request_attachments, meeting_request_audit_logs, meeting_requests,
};
use crate::core::shared::utils::DbPool;

use super::error::MeetingRequestsError;
use super::query::{ListFilters, PageRequest};
use super::store::{MeetingRequestStore, StoreResult};
use super::types::{
    Attachment, AuditEntry, MeetingRequest, NewAuditEntry, NewMeetingRequest, RequestStatus,
};

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = meeting_requests)]
pub struct DbMeetingRequest {
    pub id: i64,
    pub reference_number: Option<String>,
    pub title: String,
    pub meeting_date: Option<NaiveDate>,
    pub alternate_date: Option<NaiveDate>,
    pub category: String,
    pub subcategory: String,
    pub description: String,
    pub comments: String,
    pub classification: String,
    pub requestor_name: String,
    pub requestor_email: Option<String>,
    pub request_type: String,
    pub country: String,
    pub status: String,
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = meeting_requests)]
pub struct DbNewMeetingRequest {
    pub reference_number: Option<String>,
    pub title: String,
    pub meeting_date: Option<NaiveDate>,
    pub alternate_date: Option<NaiveDate>,
    pub category: String,
    pub subcategory: String,
    pub description: String,
    pub comments: String,
    pub classification: String,
    pub requestor_name: String,
    pub requestor_email: Option<String>,
    pub request_type: String,
    pub country: String,
    pub status: String,
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

/// Full overwrite of the mutable columns; `None` clears the column.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = meeting_requests, treat_none_as_null = true)]
pub struct DbMeetingRequestChanges {
    pub reference_number: Option<String>,
    pub title: String,
    pub meeting_date: Option<NaiveDate>,
    pub alternate_date: Option<NaiveDate>,
    pub category: String,
    pub subcategory: String,
    pub description: String,
    pub comments: String,
    pub classification: String,
    pub requestor_name: String,
    pub requestor_email: Option<String>,
    pub request_type: String,
    pub country: String,
    pub status: String,
    pub is_draft: bool,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = meeting_request_audit_logs)]
pub struct DbAuditLog {
    pub id: i64,
    pub meeting_request_id: i64,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = meeting_request_audit_logs)]
pub struct DbNewAuditLog {
    pub meeting_request_id: i64,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = meeting_request_attachments)]
pub struct DbAttachment {
    pub id: Uuid,
    pub meeting_request_id: i64,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub storage_path: String,
}

impl TryFrom<DbMeetingRequest> for MeetingRequest {
    type Error = MeetingRequestsError;

    fn try_from(row: DbMeetingRequest) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<RequestStatus>()
            .map_err(|e: String| MeetingRequestsError::Database(format!("Row {}: {e}", row.id)))?;
        Ok(Self {
            id: row.id,
            reference_number: row.reference_number,
            title: row.title,
            meeting_date: row.meeting_date,
            alternate_date: row.alternate_date,
            category: row.category,
            subcategory: row.subcategory,
            description: row.description,
            comments: row.comments,
            classification: row.classification,
            requestor_name: row.requestor_name,
            requestor_email: row.requestor_email,
            request_type: row.request_type,
            country: row.country,
            status,
            is_draft: row.is_draft,
            created_at: row.created_at,
            created_by: row.created_by,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        })
    }
}

impl From<NewMeetingRequest> for DbNewMeetingRequest {
    fn from(new: NewMeetingRequest) -> Self {
        Self {
            reference_number: new.reference_number,
            title: new.title,
            meeting_date: new.meeting_date,
            alternate_date: new.alternate_date,
            category: new.category,
            subcategory: new.subcategory,
            description: new.description,
            comments: new.comments,
            classification: new.classification,
            requestor_name: new.requestor_name,
            requestor_email: new.requestor_email,
            request_type: new.request_type,
            country: new.country,
            status: new.status.as_str().to_string(),
            is_draft: new.is_draft,
            created_at: new.created_at,
            updated_at: new.created_at,
            updated_by: new.created_by.clone(),
            created_by: new.created_by,
        }
    }
}

impl From<&MeetingRequest> for DbMeetingRequestChanges {
    fn from(request: &MeetingRequest) -> Self {
        Self {
            reference_number: request.reference_number.clone(),
            title: request.title.clone(),
            meeting_date: request.meeting_date,
            alternate_date: request.alternate_date,
            category: request.category.clone(),
            subcategory: request.subcategory.clone(),
            description: request.description.clone(),
            comments: request.comments.clone(),
            classification: request.classification.clone(),
            requestor_name: request.requestor_name.clone(),
            requestor_email: request.requestor_email.clone(),
            request_type: request.request_type.clone(),
            country: request.country.clone(),
            status: request.status.as_str().to_string(),
            is_draft: request.is_draft,
            updated_at: request.updated_at,
            updated_by: request.updated_by.clone(),
        }
    }
}

impl From<DbAuditLog> for AuditEntry {
    fn from(row: DbAuditLog) -> Self {
        Self {
            id: row.id,
            meeting_request_id: row.meeting_request_id,
            field_name: row.field_name,
            old_value: row.old_value,
            new_value: row.new_value,
            changed_by: row.changed_by,
            changed_at: row.changed_at,
        }
    }
}

impl From<DbAttachment> for Attachment {
    fn from(row: DbAttachment) -> Self {
        Self {
            id: row.id,
            meeting_request_id: row.meeting_request_id,
            file_name: row.file_name,
            file_size: row.file_size,
            content_type: row.content_type,
            uploaded_by: row.uploaded_by,
            uploaded_at: row.uploaded_at,
            storage_path: row.storage_path,
        }
    }
}

impl From<&Attachment> for DbAttachment {
    fn from(attachment: &Attachment) -> Self {
        Self {
            id: attachment.id,
            meeting_request_id: attachment.meeting_request_id,
            file_name: attachment.file_name.clone(),
            file_size: attachment.file_size,
            content_type: attachment.content_type.clone(),
            uploaded_by: attachment.uploaded_by.clone(),
            uploaded_at: attachment.uploaded_at,
            storage_path: attachment.storage_path.clone(),
        }
    }
}

fn audit_rows(request_id: i64, audit: Vec<NewAuditEntry>) -> Vec<DbNewAuditLog> {
    audit
        .into_iter()
        .map(|entry| DbNewAuditLog {
            meeting_request_id: request_id,
            field_name: entry.field_name,
            old_value: entry.old_value,
            new_value: entry.new_value,
            changed_by: entry.changed_by,
            changed_at: entry.changed_at,
        })
        .collect()
}

/// ILIKE pattern that matches `value` exactly, ignoring case.
fn exact_ci_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern
}

fn filtered_requests(filters: &ListFilters) -> meeting_requests::BoxedQuery<'static, Pg> {
    let mut query = meeting_requests::table.into_boxed();

    if let Some(ref classification) = filters.classification {
        query = query.filter(meeting_requests::classification.ilike(exact_ci_pattern(classification)));
    }
    if let Some(ref category) = filters.category {
        query = query.filter(meeting_requests::category.ilike(exact_ci_pattern(category)));
    }
    if let Some(ref status) = filters.status {
        query = query.filter(meeting_requests::status.ilike(exact_ci_pattern(status)));
    }
    if let Some(start) = filters.start_date {
        query = query.filter(meeting_requests::meeting_date.ge(start));
    }
    if let Some(end) = filters.end_date {
        query = query.filter(meeting_requests::meeting_date.le(end));
    }
    if let Some(ref identity) = filters.requestor_identity {
        let pattern = exact_ci_pattern(identity);
        query = query.filter(
            meeting_requests::requestor_email
                .ilike(pattern.clone())
                .or(meeting_requests::requestor_name.nullable().ilike(pattern)),
        );
    }

    query
}

pub struct PgMeetingRequestStore {
    pool: DbPool,
}

impl PgMeetingRequestStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| MeetingRequestsError::Database(e.to_string()))?;
            f(&mut conn)
        })
        .await?
    }
}

#[async_trait]
impl MeetingRequestStore for PgMeetingRequestStore {
    async fn insert(
        &self,
        request: NewMeetingRequest,
        audit: Vec<NewAuditEntry>,
    ) -> StoreResult<MeetingRequest> {
        self.run(move |conn| {
            conn.transaction::<_, MeetingRequestsError, _>(|conn| {
                let row: DbMeetingRequest = diesel::insert_into(meeting_requests::table)
                    .values(&DbNewMeetingRequest::from(request))
                    .get_result(conn)?;
                let rows = audit_rows(row.id, audit);
                if !rows.is_empty() {
                    diesel::insert_into(meeting_request_audit_logs::table)
                        .values(&rows)
                        .execute(conn)?;
                }
                MeetingRequest::try_from(row)
            })
        })
        .await
    }

    async fn get(&self, id: i64) -> StoreResult<Option<MeetingRequest>> {
        self.run(move |conn| {
            meeting_requests::table
                .find(id)
                .first::<DbMeetingRequest>(conn)
                .optional()?
                .map(MeetingRequest::try_from)
                .transpose()
        })
        .await
    }

    async fn find_duplicate(
        &self,
        title: &str,
        meeting_date: NaiveDate,
        category: &str,
    ) -> StoreResult<Option<i64>> {
        let title = exact_ci_pattern(title);
        let category = exact_ci_pattern(category);
        self.run(move |conn| {
            Ok(meeting_requests::table
                .filter(meeting_requests::is_draft.eq(false))
                .filter(meeting_requests::title.ilike(title))
                .filter(meeting_requests::meeting_date.eq(meeting_date))
                .filter(meeting_requests::category.ilike(category))
                .select(meeting_requests::id)
                .order(meeting_requests::id.asc())
                .first::<i64>(conn)
                .optional()?)
        })
        .await
    }

    async fn reference_number_exists(&self, candidate: &str) -> StoreResult<bool> {
        let candidate = candidate.to_string();
        self.run(move |conn| {
            Ok(diesel::select(diesel::dsl::exists(
                meeting_requests::table
                    .filter(meeting_requests::reference_number.eq(candidate)),
            ))
            .get_result::<bool>(conn)?)
        })
        .await
    }

    async fn commit_update(
        &self,
        request: &MeetingRequest,
        audit: Vec<NewAuditEntry>,
    ) -> StoreResult<()> {
        let id = request.id;
        let changes = DbMeetingRequestChanges::from(request);
        self.run(move |conn| {
            conn.transaction::<_, MeetingRequestsError, _>(|conn| {
                let updated = diesel::update(meeting_requests::table.find(id))
                    .set(&changes)
                    .execute(conn)?;
                if updated == 0 {
                    return Err(MeetingRequestsError::request_not_found(id));
                }
                let rows = audit_rows(id, audit);
                if !rows.is_empty() {
                    diesel::insert_into(meeting_request_audit_logs::table)
                        .values(&rows)
                        .execute(conn)?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn append_audit_entries(
        &self,
        request_id: i64,
        audit: Vec<NewAuditEntry>,
    ) -> StoreResult<usize> {
        let rows = audit_rows(request_id, audit);
        if rows.is_empty() {
            return Ok(0);
        }
        self.run(move |conn| {
            Ok(diesel::insert_into(meeting_request_audit_logs::table)
                .values(&rows)
                .execute(conn)?)
        })
        .await
    }

    async fn audit_entries(&self, request_id: i64) -> StoreResult<Vec<AuditEntry>> {
        self.run(move |conn| {
            let rows: Vec<DbAuditLog> = meeting_request_audit_logs::table
                .filter(meeting_request_audit_logs::meeting_request_id.eq(request_id))
                .order((
                    meeting_request_audit_logs::changed_at.desc(),
                    meeting_request_audit_logs::id.desc(),
                ))
                .load(conn)?;
            Ok(rows.into_iter().map(AuditEntry::from).collect())
        })
        .await
    }

    async fn list(
        &self,
        filters: &ListFilters,
        page: PageRequest,
    ) -> StoreResult<(Vec<MeetingRequest>, i64)> {
        let filters = filters.clone();
        self.run(move |conn| {
            let total: i64 = filtered_requests(&filters).count().get_result(conn)?;
            let rows: Vec<DbMeetingRequest> = filtered_requests(&filters)
                .order((meeting_requests::created_at.desc(), meeting_requests::id.desc()))
                .offset(page.offset())
                .limit(page.page_size)
                .load(conn)?;
            let items = rows
                .into_iter()
                .map(MeetingRequest::try_from)
                .collect::<StoreResult<Vec<_>>>()?;
            Ok((items, total))
        })
        .await
    }

    async fn delete_request(&self, id: i64) -> StoreResult<()> {
        self.run(move |conn| {
            conn.transaction::<_, MeetingRequestsError, _>(|conn| {
                diesel::delete(
                    meeting_request_attachments::table
                        .filter(meeting_request_attachments::meeting_request_id.eq(id)),
                )
                .execute(conn)?;
                diesel::delete(
                    meeting_request_audit_logs::table
                        .filter(meeting_request_audit_logs::meeting_request_id.eq(id)),
                )
                .execute(conn)?;
                let deleted = diesel::delete(meeting_requests::table.find(id)).execute(conn)?;
                if deleted == 0 {
                    return Err(MeetingRequestsError::request_not_found(id));
                }
                Ok(())
            })
        })
        .await
    }

    async fn list_attachments(&self, request_id: i64) -> StoreResult<Vec<Attachment>> {
        self.run(move |conn| {
            let rows: Vec<DbAttachment> = meeting_request_attachments::table
                .filter(meeting_request_attachments::meeting_request_id.eq(request_id))
                .order(meeting_request_attachments::uploaded_at.asc())
                .load(conn)?;
            Ok(rows.into_iter().map(Attachment::from).collect())
        })
        .await
    }

    async fn count_attachments(&self, request_id: i64) -> StoreResult<i64> {
        self.run(move |conn| {
            Ok(meeting_request_attachments::table
                .filter(meeting_request_attachments::meeting_request_id.eq(request_id))
                .count()
                .get_result(conn)?)
        })
        .await
    }

    async fn insert_attachment(
        &self,
        attachment: &Attachment,
        max_per_request: usize,
    ) -> StoreResult<()> {
        let row = DbAttachment::from(attachment);
        self.run(move |conn| {
            conn.transaction::<_, MeetingRequestsError, _>(|conn| {
                let request_id = row.meeting_request_id;
                // Row lock on the parent serializes concurrent uploads.
                meeting_requests::table
                    .find(request_id)
                    .select(meeting_requests::id)
                    .for_update()
                    .first::<i64>(conn)
                    .optional()?
                    .ok_or_else(|| MeetingRequestsError::request_not_found(request_id))?;

                let existing: i64 = meeting_request_attachments::table
                    .filter(meeting_request_attachments::meeting_request_id.eq(request_id))
                    .count()
                    .get_result(conn)?;
                if existing as usize >= max_per_request {
                    return Err(MeetingRequestsError::attachment_limit(max_per_request));
                }

                diesel::insert_into(meeting_request_attachments::table)
                    .values(&row)
                    .execute(conn)?;
                Ok(())
            })
        })
        .await
    }

    async fn get_attachment(
        &self,
        request_id: i64,
        attachment_id: Uuid,
    ) -> StoreResult<Option<Attachment>> {
        self.run(move |conn| {
            Ok(meeting_request_attachments::table
                .filter(meeting_request_attachments::meeting_request_id.eq(request_id))
                .filter(meeting_request_attachments::id.eq(attachment_id))
                .first::<DbAttachment>(conn)
                .optional()?
                .map(Attachment::from))
        })
        .await
    }

    async fn delete_attachment(&self, request_id: i64, attachment_id: Uuid) -> StoreResult<()> {
        self.run(move |conn| {
            let deleted = diesel::delete(
                meeting_request_attachments::table
                    .filter(meeting_request_attachments::meeting_request_id.eq(request_id))
                    .filter(meeting_request_attachments::id.eq(attachment_id)),
            )
            .execute(conn)?;
            if deleted == 0 {
                return Err(MeetingRequestsError::NotFound(format!(
                    "Attachment {attachment_id} not found"
                )));
            }
            Ok(())
        })
        .await
    }
}
