use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use super::audit::{AuditRecorder, FieldChange, ATTACHMENT_FIELD};
use super::error::MeetingRequestsError;
use super::store::MeetingRequestStore;
use super::types::{Attachment, MeetingRequest, RequestStatus};
use crate::security::file_validation::{validate_file_upload, FileValidationConfig};

pub const DEFAULT_MAX_ATTACHMENTS: usize = 5;

/// Byte storage for attachment contents, addressed by relative path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, data: Bytes) -> Result<(), MeetingRequestsError>;
    async fn get(&self, path: &str) -> Result<Bytes, MeetingRequestsError>;
    /// Removing a path that does not exist succeeds.
    async fn delete(&self, path: &str) -> Result<(), MeetingRequestsError>;
}

pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, MeetingRequestsError> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || path.is_empty() {
            return Err(MeetingRequestsError::Storage(format!(
                "Refusing storage path {path:?}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, data: Bytes) -> Result<(), MeetingRequestsError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MeetingRequestsError::Storage(e.to_string()))?;
        }
        tokio::fs::write(&full, &data)
            .await
            .map_err(|e| MeetingRequestsError::Storage(e.to_string()))
    }

    async fn get(&self, path: &str) -> Result<Bytes, MeetingRequestsError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                MeetingRequestsError::NotFound(format!("Stored file {path} is missing")),
            ),
            Err(e) => Err(MeetingRequestsError::Storage(e.to_string())),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), MeetingRequestsError> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Stored file {path} was already gone");
                Ok(())
            }
            Err(e) => Err(MeetingRequestsError::Storage(e.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, path: &str, data: Bytes) -> Result<(), MeetingRequestsError> {
        self.blobs.write().await.insert(path.to_string(), data);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Bytes, MeetingRequestsError> {
        self.blobs
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| MeetingRequestsError::NotFound(format!("Stored file {path} is missing")))
    }

    async fn delete(&self, path: &str) -> Result<(), MeetingRequestsError> {
        self.blobs.write().await.remove(path);
        Ok(())
    }
}

/// Last path segment of a client supplied name, with control characters
/// removed.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    base.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn storage_path(request_id: i64, attachment_id: Uuid, file_name: &str) -> String {
    format!("{request_id}/{attachment_id}_{file_name}")
}

#[derive(Clone)]
pub struct AttachmentService {
    store: Arc<dyn MeetingRequestStore>,
    blobs: Arc<dyn BlobStore>,
    audit: AuditRecorder,
    validation: FileValidationConfig,
    max_attachments: usize,
}

impl AttachmentService {
    pub fn new(
        store: Arc<dyn MeetingRequestStore>,
        blobs: Arc<dyn BlobStore>,
        validation: FileValidationConfig,
        max_attachments: usize,
    ) -> Self {
        Self {
            audit: AuditRecorder::new(store.clone()),
            store,
            blobs,
            validation,
            max_attachments,
        }
    }

    async fn load_request(&self, request_id: i64) -> Result<MeetingRequest, MeetingRequestsError> {
        self.store
            .get(request_id)
            .await?
            .ok_or_else(|| MeetingRequestsError::request_not_found(request_id))
    }

    async fn load_attachment(
        &self,
        request_id: i64,
        attachment_id: Uuid,
    ) -> Result<Attachment, MeetingRequestsError> {
        self.store
            .get_attachment(request_id, attachment_id)
            .await?
            .ok_or_else(|| {
                MeetingRequestsError::NotFound(format!(
                    "Attachment {attachment_id} not found on meeting request {request_id}"
                ))
            })
    }

    pub async fn list(&self, request_id: i64) -> Result<Vec<Attachment>, MeetingRequestsError> {
        self.load_request(request_id).await?;
        self.store.list_attachments(request_id).await
    }

    pub async fn upload(
        &self,
        request_id: i64,
        file_name: &str,
        data: Bytes,
        actor: &str,
    ) -> Result<Attachment, MeetingRequestsError> {
        self.load_request(request_id).await?;

        let file_name = sanitize_file_name(file_name);
        if file_name.is_empty() {
            return Err(MeetingRequestsError::Validation(
                "File name is required".to_string(),
            ));
        }

        // Early reject before touching blob storage; the store re-checks.
        let existing = self.store.count_attachments(request_id).await?;
        if existing as usize >= self.max_attachments {
            return Err(MeetingRequestsError::attachment_limit(self.max_attachments));
        }

        let validation = validate_file_upload(&file_name, &data, &self.validation);
        if !validation.is_valid {
            return Err(MeetingRequestsError::Validation(validation.errors.join("; ")));
        }

        let content_type = mime_guess::from_path(&file_name)
            .first_raw()
            .map(str::to_string)
            .or(validation.detected_type)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let id = Uuid::new_v4();
        let now = Utc::now();
        let attachment = Attachment {
            id,
            meeting_request_id: request_id,
            file_size: data.len() as i64,
            storage_path: storage_path(request_id, id, &file_name),
            file_name,
            content_type,
            uploaded_by: actor.to_string(),
            uploaded_at: now,
        };

        self.blobs.put(&attachment.storage_path, data).await?;
        if let Err(e) = self
            .store
            .insert_attachment(&attachment, self.max_attachments)
            .await
        {
            self.blobs.delete(&attachment.storage_path).await?;
            return Err(e);
        }

        self.audit
            .record_field_changes(
                request_id,
                actor,
                now,
                vec![FieldChange::new(
                    ATTACHMENT_FIELD,
                    None::<String>,
                    attachment.file_name.as_str(),
                )],
            )
            .await?;

        info!(
            "Attachment {} ({} bytes) added to meeting request {} by {}",
            attachment.file_name, attachment.file_size, request_id, actor
        );
        Ok(attachment)
    }

    pub async fn download(
        &self,
        request_id: i64,
        attachment_id: Uuid,
    ) -> Result<(Attachment, Bytes), MeetingRequestsError> {
        let attachment = self.load_attachment(request_id, attachment_id).await?;
        let data = self.blobs.get(&attachment.storage_path).await?;
        Ok((attachment, data))
    }

    /// Attachments can only be removed while the request is still a draft.
    pub async fn delete(
        &self,
        request_id: i64,
        attachment_id: Uuid,
        actor: &str,
    ) -> Result<(), MeetingRequestsError> {
        let request = self.load_request(request_id).await?;
        if request.status != RequestStatus::Draft {
            return Err(MeetingRequestsError::InvalidOperation(format!(
                "Attachments can only be removed from drafts; request {} is {}",
                request_id, request.status
            )));
        }

        let attachment = self.load_attachment(request_id, attachment_id).await?;
        self.blobs.delete(&attachment.storage_path).await?;
        self.store
            .delete_attachment(request_id, attachment_id)
            .await?;

        self.audit
            .record_field_changes(
                request_id,
                actor,
                Utc::now(),
                vec![FieldChange::new(
                    ATTACHMENT_FIELD,
                    attachment.file_name.as_str(),
                    None::<String>,
                )],
            )
            .await?;

        info!(
            "Attachment {} removed from meeting request {} by {}",
            attachment.file_name, request_id, actor
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meeting_requests::store::InMemoryMeetingRequestStore;
    use crate::meeting_requests::types::{MeetingRequestBody, NewMeetingRequest};

    async fn service_with_request(
        status: RequestStatus,
    ) -> (AttachmentService, Arc<InMemoryBlobStore>, i64) {
        let store = Arc::new(InMemoryMeetingRequestStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new());
        let mut new = NewMeetingRequest::from_body(
            MeetingRequestBody {
                title: Some("Budget review".into()),
                ..Default::default()
            },
            "alice@example.com",
            Utc::now(),
        );
        new.status = status;
        new.is_draft = status == RequestStatus::Draft;
        let request = store.insert(new, Vec::new()).await.expect("insert");

        let service = AttachmentService::new(
            store,
            blobs.clone(),
            FileValidationConfig::default(),
            DEFAULT_MAX_ATTACHMENTS,
        );
        (service, blobs, request.id)
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\agenda.pdf"), "agenda.pdf");
        assert_eq!(sanitize_file_name("notes\n.txt"), "notes.txt");
        assert_eq!(sanitize_file_name("dir/"), "");
    }

    #[tokio::test]
    async fn test_upload_download_and_audit() {
        let (service, blobs, id) = service_with_request(RequestStatus::Draft).await;

        let attachment = service
            .upload(id, "agenda.pdf", Bytes::from_static(b"%PDF-1.4 agenda"), "alice@example.com")
            .await
            .expect("upload");
        assert_eq!(attachment.content_type, "application/pdf");
        assert_eq!(attachment.file_size, 15);
        assert_eq!(blobs.len().await, 1);

        let (meta, data) = service.download(id, attachment.id).await.expect("download");
        assert_eq!(meta.file_name, "agenda.pdf");
        assert_eq!(&data[..], b"%PDF-1.4 agenda");

        let entries = service.audit.list_for_request(id).await.expect("audit");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].field_name, ATTACHMENT_FIELD);
        assert_eq!(entries[0].new_value.as_deref(), Some("agenda.pdf"));
    }

    #[tokio::test]
    async fn test_attachment_limit() {
        let (service, _, id) = service_with_request(RequestStatus::Pending).await;
        for i in 0..DEFAULT_MAX_ATTACHMENTS {
            service
                .upload(id, &format!("note{i}.txt"), Bytes::from_static(b"hello"), "alice@example.com")
                .await
                .expect("upload");
        }
        let err = service
            .upload(id, "one-too-many.txt", Bytes::from_static(b"hello"), "alice@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, MeetingRequestsError::Validation(_)));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_respect_limit() {
        let (service, blobs, id) = service_with_request(RequestStatus::Pending).await;
        for i in 0..DEFAULT_MAX_ATTACHMENTS - 1 {
            service
                .upload(id, &format!("note{i}.txt"), Bytes::from_static(b"hello"), "alice@example.com")
                .await
                .expect("upload");
        }

        let (first, second) = tokio::join!(
            service.upload(id, "left.txt", Bytes::from_static(b"left"), "alice@example.com"),
            service.upload(id, "right.txt", Bytes::from_static(b"right"), "bob@example.com"),
        );
        assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(service.list(id).await.expect("list").len(), DEFAULT_MAX_ATTACHMENTS);
        assert_eq!(blobs.len().await, DEFAULT_MAX_ATTACHMENTS);
    }

    #[tokio::test]
    async fn test_store_enforces_limit_on_insert() {
        let (service, _, id) = service_with_request(RequestStatus::Pending).await;
        let attachment = |name: &str| Attachment {
            id: Uuid::new_v4(),
            meeting_request_id: id,
            file_name: name.to_string(),
            file_size: 5,
            content_type: "text/plain".into(),
            uploaded_by: "alice@example.com".into(),
            uploaded_at: Utc::now(),
            storage_path: format!("{id}/{name}"),
        };

        service
            .store
            .insert_attachment(&attachment("a.txt"), 2)
            .await
            .expect("first");
        service
            .store
            .insert_attachment(&attachment("b.txt"), 2)
            .await
            .expect("second");
        let err = service
            .store
            .insert_attachment(&attachment("c.txt"), 2)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        assert_eq!(service.store.count_attachments(id).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn test_rejects_invalid_file() {
        let (service, blobs, id) = service_with_request(RequestStatus::Draft).await;
        let err = service
            .upload(id, "setup.exe", Bytes::from_static(&[0x4D, 0x5A, 0x00]), "alice@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, MeetingRequestsError::Validation(_)));
        assert!(blobs.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_only_from_drafts() {
        let (service, blobs, id) = service_with_request(RequestStatus::Draft).await;
        let attachment = service
            .upload(id, "notes.txt", Bytes::from_static(b"minutes"), "alice@example.com")
            .await
            .expect("upload");
        service
            .delete(id, attachment.id, "alice@example.com")
            .await
            .expect("delete");
        assert!(blobs.is_empty().await);
        assert!(service.list(id).await.expect("list").is_empty());

        let (pending, _, pending_id) = service_with_request(RequestStatus::Pending).await;
        let kept = pending
            .upload(pending_id, "notes.txt", Bytes::from_static(b"minutes"), "alice@example.com")
            .await
            .expect("upload");
        let err = pending
            .delete(pending_id, kept.id, "alice@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, MeetingRequestsError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn test_local_blob_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalBlobStore::new(dir.path());

        store
            .put("7/abc_notes.txt", Bytes::from_static(b"minutes"))
            .await
            .expect("put");
        assert_eq!(&store.get("7/abc_notes.txt").await.expect("get")[..], b"minutes");

        store.delete("7/abc_notes.txt").await.expect("delete");
        store.delete("7/abc_notes.txt").await.expect("second delete is a no-op");
        assert!(matches!(
            store.get("7/abc_notes.txt").await,
            Err(MeetingRequestsError::NotFound(_))
        ));
        assert!(store.put("../escape.txt", Bytes::new()).await.is_err());
    }
}
