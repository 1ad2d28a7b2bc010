use std::sync::Arc;

use async_trait::async_trait;
use investi_api::app::{AppServices, Backends, build_app};
use investi_api::config::AppConfig;
use investi_events::{AnalyticsError, AnalyticsSink, InMemoryAnalyticsSink, IntakeEvent};
use investi_infra::blob::InMemoryBlobStore;
use investi_infra::email_queue::{
    ClaimRequest, EmailJob, EmailJobId, EmailQueueStore, InMemoryEmailQueueStore, QueueStats,
};
use investi_infra::mailer::RecordingEmailSender;
use investi_infra::store::{InMemoryIntakeStore, IntakeStore, StoreError};
use reqwest::StatusCode;
use serde_json::{Value, json};

const CRON_SECRET: &str = "cron-secret";
const ADMIN_SECRET: &str = "admin-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
    intake: Arc<InMemoryIntakeStore>,
    queue: Arc<InMemoryEmailQueueStore>,
    sender: RecordingEmailSender,
    analytics: Arc<InMemoryAnalyticsSink>,
    blobs: Arc<InMemoryBlobStore>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(secured_config(), |b| b).await
    }

    async fn spawn_with(config: AppConfig, customize: impl FnOnce(Backends) -> Backends) -> Self {
        let intake = Arc::new(InMemoryIntakeStore::new());
        let queue = Arc::new(InMemoryEmailQueueStore::new());
        let sender = RecordingEmailSender::new();
        let analytics = Arc::new(InMemoryAnalyticsSink::default());
        let blobs = Arc::new(InMemoryBlobStore::new());

        let backends = customize(Backends {
            intake: intake.clone(),
            queue: queue.clone(),
            sender: Arc::new(sender.clone()),
            analytics: analytics.clone(),
            blobs: blobs.clone(),
        });

        // Same router as prod, bound to an ephemeral port.
        let app = build_app(Arc::new(AppServices::new(&config, backends)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            handle,
            intake,
            queue,
            sender,
            analytics,
            blobs,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn secured_config() -> AppConfig {
    AppConfig {
        cron_secret: Some(CRON_SECRET.to_string()),
        admin_secret: Some(ADMIN_SECRET.to_string()),
        ..AppConfig::default()
    }
}

fn founder_body(email: &str) -> Value {
    json!({
        "fullName": "Ada Obi",
        "email": email,
        "companyName": "Acme Payments",
        "sector": "fintech",
        "stage": "seed",
        "pitch": "We make cross-border payments simple for African SMEs."
    })
}

fn investor_body(email: &str) -> Value {
    json!({
        "fullName": "Grace Hopper",
        "email": email,
        "companyName": "Navy Fund",
        "investorType": "venture_capital",
        "investmentFocus": ["fintech", "healthtech"],
        "preferredStages": ["seed"],
        "ticketSize": "250k_1m"
    })
}

async fn post_json(client: &reqwest::Client, url: String, body: &Value) -> (StatusCode, Value) {
    let res = client.post(url).json(body).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn health_reports_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn waitlist_accepts_then_rejects_same_email() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = post_json(&client, srv.url("/api/waitlist"), &json!({"email": "x@y.co"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (status, body) = post_json(&client, srv.url("/api/waitlist"), &json!({"email": "X@Y.CO"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already registered");

    assert_eq!(srv.intake.counts().await.unwrap().waitlist, 1);
    // Exactly one welcome email queued.
    assert_eq!(srv.queue.stats().await.unwrap().pending, 1);
}

#[tokio::test]
async fn waitlist_rejects_bad_email_payloads() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for body in [json!({}), json!({"email": 42}), json!({"email": "not-an-email"}), json!(["x@y.co"])] {
        let (status, resp) = post_json(&client, srv.url("/api/waitlist"), &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {body}");
        assert_eq!(resp["error"], "Invalid email");
    }

    let res = client
        .post(srv.url("/api/waitlist"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(srv.intake.counts().await.unwrap().waitlist, 0);
}

#[tokio::test]
async fn cron_requires_secret_and_does_not_process_without_it() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    post_json(&client, srv.url("/api/waitlist"), &json!({"email": "a@example.com"})).await;
    assert_eq!(srv.queue.stats().await.unwrap().pending, 1);

    for auth in [None, Some("Bearer wrong"), Some(CRON_SECRET)] {
        let mut req = client.get(srv.url("/api/cron/process-emails"));
        if let Some(a) = auth {
            req = req.header("authorization", a);
        }
        let res = req.send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Unauthorized");
    }

    // Nothing was claimed or sent.
    assert_eq!(srv.queue.stats().await.unwrap().pending, 1);
    assert!(srv.sender.sent().is_empty());
}

#[tokio::test]
async fn cron_processes_queue_with_valid_secret() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    post_json(&client, srv.url("/api/applications/founder"), &founder_body("ada@example.com")).await;
    post_json(&client, srv.url("/api/newsletter"), &json!({"email": "n@example.com", "name": "Ngozi"})).await;

    let res = client
        .post(srv.url("/api/cron/process-emails"))
        .bearer_auth(CRON_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["processed"], 2);
    assert_eq!(body["sent"], 2);
    assert_eq!(body["failed"], 0);
    assert_eq!(body["queue"]["sent"], 2);
    assert_eq!(body["queue"]["pending"], 0);
    assert!(body["timestamp"].is_string());

    let sent = srv.sender.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|e| e.to == "ada@example.com" && e.subject.contains("Acme Payments")));
}

#[tokio::test]
async fn cron_is_open_when_no_secret_configured() {
    let srv = TestServer::spawn_with(AppConfig::default(), |b| b).await;
    let res = reqwest::get(srv.url("/api/cron/process-emails")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["processed"], 0);
}

#[tokio::test]
async fn failing_email_is_dead_lettered_and_can_be_replayed() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    srv.sender.fail_all(true);

    post_json(&client, srv.url("/api/waitlist"), &json!({"email": "a@example.com"})).await;

    let mut last = Value::Null;
    for _ in 0..3 {
        last = client
            .post(srv.url("/api/cron/process-emails"))
            .bearer_auth(CRON_SECRET)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
    }
    assert_eq!(last["failed"], 1);
    assert_eq!(last["queue"]["failed"], 1);

    let overview: Value = client
        .get(srv.url("/api/admin/email-queue"))
        .bearer_auth(ADMIN_SECRET)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(overview["stats"]["failed"], 1);
    let job_id = overview["failed"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(overview["failed"][0]["attempts"], 3);

    srv.sender.fail_all(false);
    let res = client
        .post(srv.url(&format!("/api/admin/email-queue/{job_id}/retry")))
        .bearer_auth(ADMIN_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = client
        .post(srv.url("/api/cron/process-emails"))
        .bearer_auth(CRON_SECRET)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["sent"], 1);
    assert_eq!(srv.sender.sent().len(), 1);
}

#[tokio::test]
async fn duplicate_founder_application_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) =
        post_json(&client, srv.url("/api/applications/founder"), &founder_body("ada@example.com")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "ada@example.com");
    assert!(body["message"].is_string());

    let (status, body) =
        post_json(&client, srv.url("/api/applications/founder"), &founder_body("ADA@example.com")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Application already exists");

    assert_eq!(srv.intake.counts().await.unwrap().founders, 1);
}

#[tokio::test]
async fn founder_validation_lists_every_bad_field() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = post_json(
        &client,
        srv.url("/api/applications/founder"),
        &json!({"email": "nope", "pitch": "short", "website": "ftp://x"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    for f in ["fullName", "email", "companyName", "sector", "stage", "pitch", "website"] {
        assert!(fields.contains(&f), "missing {f} in {fields:?}");
    }
    assert_eq!(srv.intake.counts().await.unwrap().founders, 0);
}

#[tokio::test]
async fn investor_requires_investment_focus() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let mut body = investor_body("vc@example.com");
    body["investmentFocus"] = json!([]);
    let (status, resp) = post_json(&client, srv.url("/api/applications/investor"), &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["details"].as_array().unwrap().iter().any(|d| d["field"] == "investmentFocus"));
    assert_eq!(srv.intake.counts().await.unwrap().investors, 0);

    let (status, _) = post_json(&client, srv.url("/api/applications/investor"), &investor_body("vc@example.com")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn career_applications_dedupe_per_position() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let body = |position: &str| {
        json!({
            "fullName": "Ada Obi",
            "email": "ada@example.com",
            "position": position,
            "yearsExperience": 4
        })
    };

    let (status, _) = post_json(&client, srv.url("/api/applications/career"), &body("Backend Engineer")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_json(&client, srv.url("/api/applications/career"), &body("Product Designer")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, resp) = post_json(&client, srv.url("/api/applications/career"), &body("backend engineer")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(resp["error"], "Application already exists");
}

#[tokio::test]
async fn newsletter_duplicate_uses_its_own_message() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, _) = post_json(&client, srv.url("/api/newsletter"), &json!({"email": "n@example.com"})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = post_json(&client, srv.url("/api/newsletter"), &json!({"email": "n@example.com"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already subscribed");
}

struct DownSink;

#[async_trait]
impl AnalyticsSink for DownSink {
    async fn track(&self, _event: &IntakeEvent) -> Result<(), AnalyticsError> {
        Err(AnalyticsError::Unavailable("analytics offline".into()))
    }
}

struct DownQueue;

#[async_trait]
impl EmailQueueStore for DownQueue {
    async fn enqueue(&self, _job: EmailJob) -> Result<EmailJobId, StoreError> {
        Err(StoreError::storage("queue offline"))
    }
    async fn claim_batch(&self, _request: ClaimRequest) -> Result<Vec<EmailJob>, StoreError> {
        Err(StoreError::storage("queue offline"))
    }
    async fn record_attempt(&self, _job: &EmailJob) -> Result<bool, StoreError> {
        Err(StoreError::storage("queue offline"))
    }
    async fn get(&self, _id: EmailJobId) -> Result<Option<EmailJob>, StoreError> {
        Err(StoreError::storage("queue offline"))
    }
    async fn stats(&self) -> Result<QueueStats, StoreError> {
        Err(StoreError::storage("queue offline"))
    }
    async fn list_failed(&self, _limit: usize) -> Result<Vec<EmailJob>, StoreError> {
        Err(StoreError::storage("queue offline"))
    }
    async fn retry_failed(&self, _id: EmailJobId) -> Result<EmailJob, StoreError> {
        Err(StoreError::storage("queue offline"))
    }
}

#[tokio::test]
async fn side_channel_failures_do_not_affect_the_response() {
    let srv = TestServer::spawn_with(secured_config(), |mut b| {
        b.analytics = Arc::new(DownSink);
        b.queue = Arc::new(DownQueue);
        b
    })
    .await;
    let client = reqwest::Client::new();

    let (status, body) =
        post_json(&client, srv.url("/api/applications/founder"), &founder_body("ada@example.com")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body.get("error").is_none());
    assert_eq!(srv.intake.counts().await.unwrap().founders, 1);

    let (status, _) = post_json(&client, srv.url("/api/waitlist"), &json!({"email": "w@example.com"})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn cron_reports_processor_failure_as_500() {
    let srv = TestServer::spawn_with(secured_config(), |mut b| {
        b.queue = Arc::new(DownQueue);
        b
    })
    .await;

    let res = reqwest::Client::new()
        .get(srv.url("/api/cron/process-emails"))
        .bearer_auth(CRON_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn analytics_event_is_emitted_after_commit() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    post_json(&client, srv.url("/api/waitlist"), &json!({"email": "a@example.com"})).await;

    // Emission is detached from the request; poll briefly.
    for _ in 0..50 {
        if !srv.analytics.events().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(srv.analytics.events().len(), 1);
}

#[tokio::test]
async fn admin_routes_require_admin_secret() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/api/admin/email-queue")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let res = client
        .get(srv.url("/api/admin/email-queue"))
        .bearer_auth(CRON_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Without ADMIN_SECRET the admin surface is closed entirely.
    let open = TestServer::spawn_with(AppConfig::default(), |b| b).await;
    let res = client
        .get(open.url("/api/admin/email-queue"))
        .bearer_auth("anything")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_can_delete_test_applications() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (_, body) =
        post_json(&client, srv.url("/api/applications/founder"), &founder_body("ada@example.com")).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let res = client
        .delete(srv.url(&format!("/api/admin/applications/founder/{id}")))
        .bearer_auth(ADMIN_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(srv.intake.counts().await.unwrap().founders, 0);

    let res = client
        .delete(srv.url(&format!("/api/admin/applications/founder/{id}")))
        .bearer_auth(ADMIN_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(srv.url(&format!("/api/admin/applications/unicorns/{id}")))
        .bearer_auth(ADMIN_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let counts: Value = client
        .get(srv.url("/api/admin/intake-counts"))
        .bearer_auth(ADMIN_SECRET)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(counts["founders"], 0);
}

#[tokio::test]
async fn resume_upload_checks_type_and_size() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/uploads/resume?filename=Ada%20CV.pdf"))
        .body(b"%PDF-1.7 resume".to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["url"].as_str().unwrap().ends_with(".pdf"));
    assert_eq!(srv.blobs.len(), 1);

    let res = client
        .post(srv.url("/api/uploads/resume?filename=payload.exe"))
        .body(vec![1u8; 16])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/api/uploads/resume?filename=big.pdf"))
        .body(vec![0u8; 5 * 1024 * 1024 + 1])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(srv.blobs.len(), 1);
}
