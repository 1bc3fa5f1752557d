use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use meetingserver::core::config::AppConfig;
use meetingserver::core::shared::state::AppState;
use meetingserver::main_module::build_router;
use meetingserver::meeting_requests::attachments::InMemoryBlobStore;
use meetingserver::meeting_requests::store::{InMemoryMeetingRequestStore, MeetingRequestStore};
use meetingserver::security::auth::{encode_token, Claims};

const SECRET: &str = "integration-test-secret";
const BOUNDARY: &str = "meetingserver-test-boundary";

struct TestApp {
    router: Router,
    store: Arc<InMemoryMeetingRequestStore>,
    blobs: Arc<InMemoryBlobStore>,
    config: AppConfig,
}

impl TestApp {
    fn new() -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = SECRET.to_string();

        let store = Arc::new(InMemoryMeetingRequestStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new());
        let state = AppState::new(&config, store.clone(), blobs.clone(), None);
        let router = build_router(Arc::new(state), config.storage.max_file_size);
        Self {
            router,
            store,
            blobs,
            config,
        }
    }

    fn token(&self, email: &str, roles: &[&str]) -> String {
        let claims = Claims {
            sub: format!("sub-{email}"),
            email: Some(email.to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            ..Default::default()
        };
        encode_token(&self.config.auth, &claims).expect("token")
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.call(request).await
    }

    async fn upload(&self, id: i64, token: &str, file_name: &str, data: &[u8]) -> (StatusCode, Value) {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/meetingrequests/{id}/attachments"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request");
        self.call(request).await
    }

    async fn create(&self, token: &str, body: Value) -> i64 {
        let (status, value) = self
            .send(Method::POST, "/api/meetingrequests", Some(token), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{value}");
        value["id"].as_i64().expect("id")
    }

    async fn detail(&self, id: i64, token: &str) -> Value {
        let (status, value) = self
            .send(Method::GET, &format!("/api/meetingrequests/{id}"), Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{value}");
        value
    }
}

fn request_body(title: &str, email: &str, name: &str) -> Value {
    json!({
        "title": title,
        "meetingDate": "2026-06-01",
        "category": "Governance",
        "classification": "Regular",
        "requestorName": name,
        "requestorEmail": email,
        "requestType": "Briefing",
        "country": "Kenya"
    })
}

#[tokio::test]
async fn test_full_review_flow() {
    let app = TestApp::new();
    let requestor = app.token("john.doe@example.com", &["requestor"]);
    let ed = app.token("ed@example.com", &["EdOffice"]);
    let mgmt = app.token("mgmt@example.com", &["ManagementOffice"]);

    let id = app
        .create(&requestor, request_body("Board Meeting", "john.doe@example.com", "John Doe"))
        .await;
    let reference = app.detail(id, &requestor).await["meetingRequest"]["referenceNumber"].clone();
    assert_eq!(reference.as_str().map(str::len), Some(5));

    for (action, token) in [("approve", &ed), ("confirm", &mgmt), ("announce", &mgmt)] {
        let (status, value) = app
            .send(Method::POST, &format!("/api/meetingrequests/{id}/{action}"), Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{action}: {value}");
        assert!(value["message"].is_string());
    }

    let detail = app.detail(id, &requestor).await;
    assert_eq!(detail["meetingRequest"]["status"], "Announced");
    assert_eq!(detail["meetingRequest"]["referenceNumber"], reference);
    assert_eq!(detail["meetingRequest"]["updatedBy"], "mgmt@example.com");

    let timeline: Vec<(String, String)> = detail["statusChanges"]
        .as_array()
        .expect("timeline")
        .iter()
        .map(|e| {
            (
                e["newValue"].as_str().unwrap_or_default().to_string(),
                e["changedBy"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    assert_eq!(
        timeline,
        vec![
            ("Announced".to_string(), "mgmt@example.com".to_string()),
            ("Confirmed".to_string(), "mgmt@example.com".to_string()),
            ("Approved".to_string(), "ed@example.com".to_string()),
            ("Pending".to_string(), "john.doe@example.com".to_string()),
        ]
    );

    let (status, value) = app
        .send(
            Method::PUT,
            &format!("/api/meetingrequests/{id}"),
            Some(&requestor),
            Some(json!({ "title": "Too late" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["kind"], "invalid_operation");
}

#[tokio::test]
async fn test_announce_requires_confirmed() {
    let app = TestApp::new();
    let requestor = app.token("john.doe@example.com", &["requestor"]);
    let mgmt = app.token("mgmt@example.com", &["ManagementOffice"]);
    let id = app
        .create(&requestor, request_body("Board Meeting", "john.doe@example.com", "John Doe"))
        .await;

    let (status, value) = app
        .send(Method::POST, &format!("/api/meetingrequests/{id}/announce"), Some(&mgmt), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["kind"], "invalid_transition");

    let detail = app.detail(id, &requestor).await;
    assert_eq!(detail["meetingRequest"]["status"], "Pending");
    assert_eq!(detail["auditLogs"].as_array().map(Vec::len), Some(1));

    let (status, _) = app
        .send(Method::POST, &format!("/api/meetingrequests/{id}/confirm"), Some(&mgmt), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send(Method::POST, &format!("/api/meetingrequests/{id}/announce"), Some(&mgmt), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_transitions_require_capability() {
    let app = TestApp::new();
    let requestor = app.token("john.doe@example.com", &["requestor"]);
    let id = app
        .create(&requestor, request_body("Board Meeting", "john.doe@example.com", "John Doe"))
        .await;

    for action in ["approve", "confirm", "announce"] {
        let (status, value) = app
            .send(Method::POST, &format!("/api/meetingrequests/{id}/{action}"), Some(&requestor), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{action}");
        assert_eq!(value["kind"], "forbidden");
    }

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/meetingrequests/{id}/cancel"),
            Some(&requestor),
            Some(json!({ "reason": "Changed my mind" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let detail = app.detail(id, &requestor).await;
    assert_eq!(detail["meetingRequest"]["status"], "Pending");
    assert_eq!(detail["auditLogs"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_cancel_requires_reason() {
    let app = TestApp::new();
    let requestor = app.token("john.doe@example.com", &["requestor"]);
    let ed = app.token("ed@example.com", &["EdOffice"]);
    let id = app
        .create(&requestor, request_body("Board Meeting", "john.doe@example.com", "John Doe"))
        .await;
    let uri = format!("/api/meetingrequests/{id}/cancel");

    let (status, value) = app
        .send(Method::POST, &uri, Some(&ed), Some(json!({ "reason": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["kind"], "validation_error");

    let (status, _) = app.send(Method::POST, &uri, Some(&ed), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.detail(id, &ed).await["meetingRequest"]["status"], "Pending");

    let (status, _) = app
        .send(Method::POST, &uri, Some(&ed), Some(json!({ "reason": "Room unavailable" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let detail = app.detail(id, &ed).await;
    assert_eq!(detail["meetingRequest"]["status"], "Cancelled");
    let reason = detail["auditLogs"]
        .as_array()
        .expect("audit")
        .iter()
        .find(|e| e["fieldName"] == "Cancellation Reason")
        .expect("reason entry");
    assert_eq!(reason["newValue"], "Room unavailable");

    let (status, value) = app
        .send(Method::POST, &uri, Some(&ed), Some(json!({ "reason": "Again" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["kind"], "invalid_transition");
}

#[tokio::test]
async fn test_draft_delete_cascades() {
    let app = TestApp::new();
    let requestor = app.token("john.doe@example.com", &["requestor"]);

    let (status, value) = app
        .send(
            Method::POST,
            "/api/meetingrequests/draft",
            Some(&requestor),
            Some(json!({ "title": "Half-written idea" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = value["id"].as_i64().expect("id");

    for name in ["agenda.pdf", "notes.txt"] {
        let data: &[u8] = if name.ends_with(".pdf") {
            b"%PDF-1.4 agenda"
        } else {
            b"meeting notes"
        };
        let (status, value) = app.upload(id, &requestor, name, data).await;
        assert_eq!(status, StatusCode::CREATED, "{value}");
        assert_eq!(value["fileName"], name);
        assert!(value.get("storagePath").is_none());
    }
    assert_eq!(app.blobs.len().await, 2);

    let detail = app.detail(id, &requestor).await;
    assert_eq!(detail["attachments"].as_array().map(Vec::len), Some(2));
    assert_eq!(detail["auditLogs"].as_array().map(Vec::len), Some(3));

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/meetingrequests/{id}"), Some(&requestor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.blobs.is_empty().await);
    assert!(app.store.audit_entries(id).await.expect("audit").is_empty());
    assert!(app.store.list_attachments(id).await.expect("attachments").is_empty());

    let (status, value) = app
        .send(Method::GET, &format!("/api/meetingrequests/{id}"), Some(&requestor), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(value["kind"], "not_found");
}

#[tokio::test]
async fn test_submitted_request_cannot_be_deleted() {
    let app = TestApp::new();
    let requestor = app.token("john.doe@example.com", &["requestor"]);
    let id = app
        .create(&requestor, request_body("Board Meeting", "john.doe@example.com", "John Doe"))
        .await;

    let (status, value) = app
        .send(Method::DELETE, &format!("/api/meetingrequests/{id}"), Some(&requestor), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["kind"], "invalid_operation");
    assert_eq!(app.detail(id, &requestor).await["meetingRequest"]["status"], "Pending");
}

#[tokio::test]
async fn test_attachment_download_and_draft_only_delete() {
    let app = TestApp::new();
    let requestor = app.token("john.doe@example.com", &["requestor"]);
    let id = app
        .create(&requestor, request_body("Board Meeting", "john.doe@example.com", "John Doe"))
        .await;

    let (status, value) = app.upload(id, &requestor, "agenda.pdf", b"%PDF-1.4 agenda").await;
    assert_eq!(status, StatusCode::CREATED);
    let attachment_id = value["id"].as_str().expect("attachment id").to_string();
    let uri = format!("/api/meetingrequests/{id}/attachments/{attachment_id}");

    let request = Request::builder()
        .method(Method::GET)
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {requestor}"))
        .body(Body::empty())
        .expect("request");
    let response = app.router.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"agenda.pdf\""
    );
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    assert_eq!(&bytes[..], b"%PDF-1.4 agenda");

    let (status, value) = app.send(Method::DELETE, &uri, Some(&requestor), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["kind"], "invalid_operation");

    let (status, value) = app
        .send(Method::GET, &format!("/api/meetingrequests/{id}/attachments"), Some(&requestor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_rejects_executable_upload() {
    let app = TestApp::new();
    let requestor = app.token("john.doe@example.com", &["requestor"]);
    let id = app
        .create(&requestor, request_body("Board Meeting", "john.doe@example.com", "John Doe"))
        .await;

    let (status, value) = app.upload(id, &requestor, "setup.exe", &[0x4D, 0x5A, 0x90, 0x00]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["kind"], "validation_error");
    assert!(app.blobs.is_empty().await);
}

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let app = TestApp::new();
    let ed = app.token("ed@example.com", &["EdOffice"]);

    let (status, _) = app
        .send(Method::GET, "/api/meetingrequests/4242", Some(&ed), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, value) = app
        .send(Method::POST, "/api/meetingrequests/4242/approve", Some(&ed), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(value["kind"], "not_found");
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = TestApp::new();
    let (status, value) = app
        .send(Method::GET, "/api/meetingrequests", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(value["kind"], "unauthorized");

    let (status, _) = app
        .send(Method::GET, "/api/meetingrequests", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, value) = app.send(Method::GET, "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["status"], "ok");

    let (status, value) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["status"], "healthy");
}

#[tokio::test]
async fn test_list_filters_by_requestor_email() {
    let app = TestApp::new();
    let john = app.token("john.doe@example.com", &["requestor"]);
    let jane = app.token("jane.smith@example.com", &["requestor"]);

    app.create(&john, request_body("John's Request 1", "john.doe@example.com", "John Doe"))
        .await;
    app.create(&john, request_body("John's Request 2", "john.doe@example.com", "John Doe"))
        .await;
    app.create(&jane, request_body("Jane's Request", "jane.smith@example.com", "Jane Smith"))
        .await;

    let (status, value) = app
        .send(
            Method::GET,
            "/api/meetingrequests?requestorEmail=john.doe%40example.com",
            Some(&john),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["totalCount"], 2);
    assert!(value["items"]
        .as_array()
        .expect("items")
        .iter()
        .all(|item| item["requestorEmail"] == "john.doe@example.com"));

    let (_, all) = app
        .send(Method::GET, "/api/meetingrequests", Some(&john), None)
        .await;
    assert_eq!(all["totalCount"], 3);
    assert_eq!(all["items"][0]["title"], "Jane's Request");

    let (_, pending) = app
        .send(Method::GET, "/api/meetingrequests?status=pending&category=governance", Some(&john), None)
        .await;
    assert_eq!(pending["totalCount"], 3);

    let (_, none) = app
        .send(Method::GET, "/api/meetingrequests?startDate=2026-07-01", Some(&john), None)
        .await;
    assert_eq!(none["totalCount"], 0);
}

#[tokio::test]
async fn test_pagination_covers_every_row_once() {
    let app = TestApp::new();
    let john = app.token("john.doe@example.com", &["requestor"]);
    for i in 0..24 {
        app.create(
            &john,
            request_body(&format!("John's Request {i}"), "john.doe@example.com", "John Doe"),
        )
        .await;
    }

    let (_, first) = app
        .send(
            Method::GET,
            "/api/meetingrequests?requestorEmail=john.doe%40example.com&page=1&pageSize=20",
            Some(&john),
            None,
        )
        .await;
    assert_eq!(first["items"].as_array().map(Vec::len), Some(20));
    assert_eq!(first["totalCount"], 24);
    assert_eq!(first["totalPages"], 2);
    assert_eq!(first["hasMore"], true);

    let (_, second) = app
        .send(
            Method::GET,
            "/api/meetingrequests?requestorEmail=john.doe%40example.com&page=2&pageSize=20",
            Some(&john),
            None,
        )
        .await;
    assert_eq!(second["items"].as_array().map(Vec::len), Some(4));
    assert_eq!(second["hasMore"], false);

    let mut ids: Vec<i64> = first["items"]
        .as_array()
        .into_iter()
        .chain(second["items"].as_array())
        .flatten()
        .filter_map(|item| item["id"].as_i64())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 24);
}

#[tokio::test]
async fn test_update_diffs_fields() {
    let app = TestApp::new();
    let requestor = app.token("john.doe@example.com", &["requestor"]);
    let body = request_body("Board Meeting", "john.doe@example.com", "John Doe");
    let id = app.create(&requestor, body.clone()).await;
    let uri = format!("/api/meetingrequests/{id}");

    let (status, value) = app.send(Method::PUT, &uri, Some(&requestor), Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["id"], id);
    assert_eq!(app.detail(id, &requestor).await["auditLogs"].as_array().map(Vec::len), Some(1));

    let (status, _) = app
        .send(
            Method::PUT,
            &uri,
            Some(&requestor),
            Some(json!({ "country": "Ghana", "meetingDate": "2026-06-02T09:30:00Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let detail = app.detail(id, &requestor).await;
    assert_eq!(detail["meetingRequest"]["country"], "Ghana");
    assert_eq!(detail["meetingRequest"]["meetingDate"], "2026-06-02");
    assert_eq!(detail["meetingRequest"]["title"], "Board Meeting");
    let fields: Vec<&str> = detail["auditLogs"]
        .as_array()
        .expect("audit")
        .iter()
        .filter_map(|e| e["fieldName"].as_str())
        .collect();
    assert_eq!(fields.len(), 3);
    assert!(fields.contains(&"Country"));
    assert!(fields.contains(&"Meeting Date"));
}

#[tokio::test]
async fn test_duplicate_submission_is_flagged() {
    let app = TestApp::new();
    let requestor = app.token("john.doe@example.com", &["requestor"]);
    let id = app
        .create(&requestor, request_body("Board Meeting", "john.doe@example.com", "John Doe"))
        .await;

    let (status, value) = app
        .send(
            Method::POST,
            "/api/meetingrequests",
            Some(&requestor),
            Some(request_body("BOARD MEETING", "john.doe@example.com", "John Doe")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!({ "id": id, "duplicate": true }));
}

#[tokio::test]
async fn test_create_validates_required_fields() {
    let app = TestApp::new();
    let requestor = app.token("john.doe@example.com", &["requestor"]);
    let (status, value) = app
        .send(
            Method::POST,
            "/api/meetingrequests",
            Some(&requestor),
            Some(json!({ "title": "No date yet" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["kind"], "validation_error");
}

#[tokio::test]
async fn test_malformed_input_reports_validation_error() {
    let app = TestApp::new();
    let requestor = app.token("john.doe@example.com", &["requestor"]);

    let (status, value) = app
        .send(
            Method::POST,
            "/api/meetingrequests",
            Some(&requestor),
            Some(json!({ "title": "Board", "meetingDate": "next tuesday" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["kind"], "validation_error");

    let (status, value) = app
        .send(Method::GET, "/api/meetingrequests?page=abc", Some(&requestor), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["kind"], "validation_error");

    let (status, value) = app
        .send(Method::GET, "/api/meetingrequests/not-a-number", Some(&requestor), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["kind"], "validation_error");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/meetingrequests/draft")
        .header(header::AUTHORIZATION, format!("Bearer {requestor}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .expect("request");
    let (status, value) = app.call(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["kind"], "validation_error");

    let (_, list) = app
        .send(Method::GET, "/api/meetingrequests", Some(&requestor), None)
        .await;
    assert_eq!(list["totalCount"], 0);
}

#[tokio::test]
async fn test_draft_submission_assigns_reference() {
    let app = TestApp::new();
    let requestor = app.token("john.doe@example.com", &["requestor"]);
    let (_, value) = app
        .send(
            Method::POST,
            "/api/meetingrequests/draft",
            Some(&requestor),
            Some(json!({ "title": "Board Meeting", "meetingDate": "2026-06-01" })),
        )
        .await;
    let id = value["id"].as_i64().expect("id");
    assert!(app.detail(id, &requestor).await["meetingRequest"]["referenceNumber"].is_null());

    let (status, _) = app
        .send(Method::POST, &format!("/api/meetingrequests/{id}/submit"), Some(&requestor), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let detail = app.detail(id, &requestor).await;
    assert_eq!(detail["meetingRequest"]["status"], "Pending");
    assert_eq!(detail["meetingRequest"]["isDraft"], false);
    assert!(detail["meetingRequest"]["referenceNumber"].is_string());
    assert_eq!(detail["statusChanges"][0]["oldValue"], "Draft");

    let (status, value) = app
        .send(Method::POST, &format!("/api/meetingrequests/{id}/submit"), Some(&requestor), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["kind"], "invalid_transition");
}
