#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tower::ServiceExt;

use ragtutor_api::{
    config::{AccountSettings, Config, HintSettings, OpenAiSettings, QdrantSettings},
    create_router,
    middlewares::auth::{JwtClaims, JwtService},
    models::{document::DocumentChunk, hint::SourcePassage, user::UserRole},
    services::{
        hint_ledger::InMemoryHintLedger, llm::Generator, vector_store::Retriever, AppState,
    },
};

pub const JWT_SECRET: &str = "test-secret";
pub const TRAINER_PASSWORD: &str = "trainer2024";

pub fn student_password(lab_id: u32) -> String {
    format!("student{:02}-pw", lab_id)
}

pub fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        access_token_ttl_minutes: 60,
        openai: OpenAiSettings::default(),
        qdrant: QdrantSettings::default(),
        redis_uri: None,
        accounts: AccountSettings {
            trainer_password: TRAINER_PASSWORD.to_string(),
            student_passwords: (1..=5).map(student_password).collect(),
            bcrypt_cost: 4,
        },
        hints: HintSettings::default(),
    }
}

/// In-process knowledge base holding firewall material.
#[derive(Default)]
pub struct FakeRetriever {
    pub stored: Mutex<Vec<DocumentChunk>>,
    pub queries: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<SourcePassage>> {
        self.queries.lock().push((query.to_string(), limit));
        Ok(vec![SourcePassage {
            content: "ufw allow 22/tcp opens the SSH port on host 192.168.x.10.".to_string(),
            source: Some("firewall.md".to_string()),
            score: 0.87,
        }])
    }

    async fn add_documents(&self, chunks: &[DocumentChunk]) -> anyhow::Result<usize> {
        self.stored.lock().extend_from_slice(chunks);
        Ok(chunks.len())
    }

    async fn document_count(&self) -> anyhow::Result<u64> {
        Ok(self.stored.lock().len() as u64)
    }
}

/// Records every prompt and answers with a canned hint.
/// The next `failures` calls fail instead.
#[derive(Default)]
pub struct FakeGenerator {
    pub prompts: Mutex<Vec<(String, String)>>,
    pub failures: Mutex<u32>,
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, system: &str, user: &str) -> anyhow::Result<String> {
        {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                anyhow::bail!("upstream model returned 429");
            }
        }

        let mut prompts = self.prompts.lock();
        prompts.push((system.to_string(), user.to_string()));
        Ok(format!("Hint number {}", prompts.len()))
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub retriever: Arc<FakeRetriever>,
    pub generator: Arc<FakeGenerator>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// App wired to in-process fakes for the vector store and the LLM.
pub fn create_test_app() -> TestApp {
    init_tracing();

    let retriever = Arc::new(FakeRetriever::default());
    let generator = Arc::new(FakeGenerator::default());

    let state = Arc::new(
        AppState::with_collaborators(
            test_config(),
            Arc::new(InMemoryHintLedger::new()),
            Some(retriever.clone()),
            Some(generator.clone()),
        )
        .expect("Failed to initialize test app state"),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        retriever,
        generator,
    }
}

/// App without vector store and LLM, as when no API key is configured.
pub fn create_degraded_app() -> TestApp {
    init_tracing();

    let state = Arc::new(
        AppState::with_collaborators(
            test_config(),
            Arc::new(InMemoryHintLedger::new()),
            None,
            None,
        )
        .expect("Failed to initialize test app state"),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        retriever: Arc::new(FakeRetriever::default()),
        generator: Arc::new(FakeGenerator::default()),
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

pub async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, body) = send(app, request).await;
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&body).into_owned())
        })
    };
    (status, json)
}

/// Logs in through `POST /token` and returns the bearer token.
pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send_json(
        app,
        Request::builder()
            .method("POST")
            .uri("/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "username={}&password={}",
                username, password
            )))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "login failed for {}: {}", username, body);
    body["access_token"].as_str().unwrap().to_string()
}

pub async fn login_student(app: &Router, lab_id: u32) -> String {
    login(app, &format!("student{:02}", lab_id), &student_password(lab_id)).await
}

pub async fn login_trainer(app: &Router) -> String {
    login(app, "trainer", TRAINER_PASSWORD).await
}

/// Signs a token directly, bypassing the account registry.
pub fn forge_token(subject: &str, role: UserRole) -> String {
    let now = chrono::Utc::now().timestamp();
    JwtService::new(JWT_SECRET)
        .generate_token(&JwtClaims {
            sub: subject.to_string(),
            role,
            exp: (now + 3600) as usize,
            iat: now as usize,
        })
        .unwrap()
}

pub fn json_post(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn multipart_upload(token: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let boundary = "ragtutor-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body))
        .unwrap()
}
