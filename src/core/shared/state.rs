use std::sync::Arc;

use crate::core::config::{AppConfig, AuthConfig};
use crate::core::shared::utils::DbPool;
use crate::meeting_requests::attachments::{AttachmentService, BlobStore};
use crate::meeting_requests::service::MeetingRequestService;
use crate::meeting_requests::store::MeetingRequestStore;
use crate::security::capabilities::{CapabilityPolicy, RoleCapabilityPolicy};
use crate::security::file_validation::FileValidationConfig;

pub struct AppState {
    pub meeting_requests: MeetingRequestService,
    pub attachments: AttachmentService,
    pub policy: Arc<dyn CapabilityPolicy>,
    pub auth: AuthConfig,
    /// Present when running against Postgres; the health check pings it.
    pub conn: Option<DbPool>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn MeetingRequestStore>,
        blobs: Arc<dyn BlobStore>,
        conn: Option<DbPool>,
    ) -> Self {
        let validation =
            FileValidationConfig::default().with_max_size(config.storage.max_file_size);
        Self {
            meeting_requests: MeetingRequestService::new(store.clone(), blobs.clone()),
            attachments: AttachmentService::new(
                store,
                blobs,
                validation,
                config.storage.max_attachments_per_request,
            ),
            policy: Arc::new(RoleCapabilityPolicy::from_config(&config.roles)),
            auth: config.auth.clone(),
            conn,
        }
    }
}
