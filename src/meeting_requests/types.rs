use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::dates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Draft,
    Pending,
    Approved,
    Confirmed,
    Announced,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Confirmed => "Confirmed",
            Self::Announced => "Announced",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Announced | Self::Cancelled)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "confirmed" => Ok(Self::Confirmed),
            "announced" => Ok(Self::Announced),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(format!("Unknown request status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRequest {
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
    pub status: RequestStatus,
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

/// Row shape handed to a store for insertion; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeetingRequest {
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
    pub status: RequestStatus,
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl NewMeetingRequest {
    pub fn from_body(body: MeetingRequestBody, actor: &str, now: DateTime<Utc>) -> Self {
        Self {
            reference_number: None,
            title: body.title.unwrap_or_default(),
            meeting_date: body.meeting_date,
            alternate_date: body.alternate_date,
            category: body.category.unwrap_or_default(),
            subcategory: body.subcategory.unwrap_or_default(),
            description: body.description.unwrap_or_default(),
            comments: body.comments.unwrap_or_default(),
            classification: body.classification.unwrap_or_default(),
            requestor_name: body.requestor_name.unwrap_or_default(),
            requestor_email: body.requestor_email.filter(|e| !e.trim().is_empty()),
            request_type: body.request_type.unwrap_or_default(),
            country: body.country.unwrap_or_default(),
            status: RequestStatus::Draft,
            is_draft: true,
            created_at: now,
            created_by: actor.to_string(),
        }
    }

    pub fn into_request(self, id: i64) -> MeetingRequest {
        MeetingRequest {
            id,
            reference_number: self.reference_number,
            title: self.title,
            meeting_date: self.meeting_date,
            alternate_date: self.alternate_date,
            category: self.category,
            subcategory: self.subcategory,
            description: self.description,
            comments: self.comments,
            classification: self.classification,
            requestor_name: self.requestor_name,
            requestor_email: self.requestor_email,
            request_type: self.request_type,
            country: self.country,
            status: self.status,
            is_draft: self.is_draft,
            created_at: self.created_at,
            updated_at: self.created_at,
            updated_by: self.created_by.clone(),
            created_by: self.created_by,
        }
    }
}

/// Create/draft/update payload. Every field is optional; on update an
/// absent field keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRequestBody {
    #[serde(default, alias = "meetingTitle")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "dates::deserialize_optional_date")]
    pub meeting_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "dates::deserialize_optional_date")]
    pub alternate_date: Option<NaiveDate>,
    #[serde(default, alias = "meetingCategory")]
    pub category: Option<String>,
    #[serde(default, alias = "meetingSubcategory")]
    pub subcategory: Option<String>,
    #[serde(default, alias = "meetingDescription")]
    pub description: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub requestor_name: Option<String>,
    #[serde(default)]
    pub requestor_email: Option<String>,
    #[serde(default)]
    pub request_type: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub is_draft: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub meeting_request_id: i64,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

/// An audit row before it is attached to a request and persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

impl NewAuditEntry {
    pub fn into_entry(self, id: i64, meeting_request_id: i64) -> AuditEntry {
        AuditEntry {
            id,
            meeting_request_id,
            field_name: self.field_name,
            old_value: self.old_value,
            new_value: self.new_value,
            changed_by: self.changed_by,
            changed_at: self.changed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub meeting_request_id: i64,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub storage_path: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRequestDetail {
    pub id: i64,
    pub meeting_request: MeetingRequest,
    pub audit_logs: Vec<AuditEntry>,
    pub status_changes: Vec<AuditEntry>,
    pub attachments: Vec<Attachment>,
}

/// Result of a create call: either a fresh row or the id of a likely duplicate.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(MeetingRequest),
    Duplicate(i64),
}

impl From<CreateOutcome> for CreatedResponse {
    fn from(outcome: CreateOutcome) -> Self {
        match outcome {
            CreateOutcome::Created(request) => Self {
                id: request.id,
                duplicate: None,
            },
            CreateOutcome::Duplicate(id) => Self {
                id,
                duplicate: Some(true),
            },
        }
    }
}
