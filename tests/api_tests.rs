// tests/api_tests.rs

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use exam_composer::{
    config::Config,
    engine::{ComposerPolicy, CurriculumPattern, ExamDraft, Question},
    models::exam::{Exam, StoredQuestion},
    routes,
    services::drafts::DraftRegistry,
    state::AppState,
    store::{ExamStore, MemoryStore, StoreError},
};
use serde_json::{Value, json};

fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        port: 0,
        composer_policy: ComposerPolicy::default(),
        curriculum_pattern_path: None,
        max_drafts_per_user: 3,
    }
}

/// Spawns the app on a random port over the given stores.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app_with(exams: Arc<dyn ExamStore>) -> String {
    let state = AppState {
        users: Arc::new(MemoryStore::new()),
        exams,
        pattern: Arc::new(CurriculumPattern::default()),
        drafts: Arc::new(DraftRegistry::new(3)),
        config: test_config(),
    };

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn spawn_app() -> String {
    spawn_app_with(Arc::new(MemoryStore::new())).await
}

/// Registers a fresh user and returns a bearer token.
async fn signup_and_login(client: &reqwest::Client, address: &str) -> String {
    let email = format!("t_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    let register = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "email": email,
            "password": password,
            "confirm_password": password,
            "full_name": "Test Teacher"
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(register.status().as_u16(), 201);

    let login: Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({"email": email, "password": password}))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    login["token"].as_str().expect("Token not found").to_string()
}

async fn open_draft(client: &reqwest::Client, address: &str, token: &str) -> String {
    let resp = client
        .post(format!("{}/api/drafts", address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let body: Value = resp.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

async fn add_question(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    draft: &str,
    section: &str,
    text: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/api/drafts/{}/questions", address, draft))
        .bearer_auth(token)
        .json(&json!({"section": section, "question_text": text}))
        .send()
        .await
        .unwrap()
}

async fn set_title(client: &reqwest::Client, address: &str, token: &str, draft: &str, title: &str) {
    let resp = client
        .put(format!("{}/api/drafts/{}/title", address, draft))
        .bearer_auth(token)
        .json(&json!({"title": title}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn pattern_is_public() {
    let address = spawn_app().await;

    let body: Value = reqwest::get(format!("{}/api/pattern", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["total_required_questions"], 38);
    assert_eq!(body["total_required_marks"], 80);
    assert_eq!(body["subject"], "Mathematics");
    assert_eq!(body["duration_minutes"], 180);
    assert_eq!(body["sections"].as_array().unwrap().len(), 5);
    assert_eq!(body["sections"][0]["section"], "A");
    assert_eq!(body["sections"][0]["question_type"], "MCQ");
    assert_eq!(body["sections"][4]["marks_per_question"], 5);
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    for path in ["/api/exams", "/api/auth/me"] {
        let resp = client
            .get(format!("{}{}", address, path))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 401, "{}", path);
    }

    let resp = client
        .post(format!("{}/api/drafts", address))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn registration_rules() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let mismatch = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "email": "a@example.com",
            "password": "password123",
            "confirm_password": "password124",
            "full_name": "A"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(mismatch.status().as_u16(), 400);

    let payload = json!({
        "email": "Dup@Example.com",
        "password": "password123",
        "confirm_password": "password123",
        "full_name": "Dup"
    });
    let first = client
        .post(format!("{}/api/auth/register", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);
    let created: Value = first.json().await.unwrap();
    assert_eq!(created["email"], "dup@example.com");
    assert!(created.get("password").is_none());

    let second = client
        .post(format!("{}/api/auth/register", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);

    let bad_login = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({"email": "dup@example.com", "password": "wrong-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_login.status().as_u16(), 401);
}

#[tokio::test]
async fn me_returns_identity() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = signup_and_login(&client, &address).await;

    let me: Value = client
        .get(format!("{}/api/auth/me", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(me["id"].as_i64().unwrap() > 0);
    assert!(me["email"].as_str().unwrap().ends_with("@example.com"));
    assert_eq!(me["display_name"], "Test Teacher");
}

#[tokio::test]
async fn draft_flow_end_to_end() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = signup_and_login(&client, &address).await;
    let draft = open_draft(&client, &address, &token).await;

    // Two MCQs in section A
    for text in ["If x + 3 = 5, find x.", "The HCF of 6 and 20 is"] {
        let resp = add_question(&client, &address, &token, &draft, "A", text).await;
        assert_eq!(resp.status().as_u16(), 201);
    }

    let progress: Value = client
        .get(format!("{}/api/drafts/{}/progress", address, draft))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(progress["sections"][0]["section"], "A");
    assert_eq!(progress["sections"][0]["added"], 2);
    assert_eq!(progress["sections"][0]["required"], 20);
    assert_eq!(progress["complete"], false);

    // Add and remove in section C; the number is reused
    let c1: Value = add_question(&client, &address, &token, &draft, "c", "Prove root 2 is irrational.")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(c1["question_number"], 1);
    assert_eq!(c1["marks"], 3);
    assert_eq!(c1["question_type"], "SA");

    let after_remove: Value = client
        .delete(format!("{}/api/drafts/{}/questions/C/1", address, draft))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(after_remove["sections"][2]["questions"].as_array().unwrap().len(), 0);

    let c_again: Value = add_question(&client, &address, &token, &draft, "C", "Find the zeroes of x^2 - 4.")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(c_again["question_number"], 1);

    set_title(&client, &address, &token, &draft, "Mid-Term").await;

    let submit = client
        .post(format!("{}/api/drafts/{}/submit", address, draft))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(submit.status().as_u16(), 201);
    let exam_id = submit.json::<Value>().await.unwrap()["id"].as_i64().unwrap();

    // The draft is gone once saved
    let gone = client
        .get(format!("{}/api/drafts/{}", address, draft))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);

    let view: Value = client
        .get(format!("{}/api/exams/{}", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["title"], "Mid-Term");
    assert_eq!(view["board"], "CBSE");
    assert_eq!(view["total_marks"], 5);
    assert_eq!(view["duration_minutes"], 180);
    assert_eq!(view["question_count"], 3);

    let sections = view["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0]["section"], "A");
    assert_eq!(sections[0]["questions"][0]["question_number"], 1);
    assert_eq!(sections[0]["questions"][0]["marks"], 1);
    assert_eq!(sections[0]["questions"][1]["question_text"], "The HCF of 6 and 20 is");
    assert_eq!(sections[1]["section"], "C");
}

#[tokio::test]
async fn draft_rules_are_enforced() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = signup_and_login(&client, &address).await;
    let draft = open_draft(&client, &address, &token).await;

    for i in 0..3 {
        let resp = add_question(&client, &address, &token, &draft, "D", &format!("D{}", i)).await;
        assert_eq!(resp.status().as_u16(), 201);
    }
    let full = add_question(&client, &address, &token, &draft, "D", "one too many").await;
    assert_eq!(full.status().as_u16(), 422);

    let unknown = add_question(&client, &address, &token, &draft, "Z", "nowhere").await;
    assert_eq!(unknown.status().as_u16(), 400);

    let blank = add_question(&client, &address, &token, &draft, "A", "   ").await;
    assert_eq!(blank.status().as_u16(), 400);

    let missing = client
        .delete(format!("{}/api/drafts/{}/questions/A/7", address, draft))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);

    // No title yet
    let untitled = client
        .post(format!("{}/api/drafts/{}/submit", address, draft))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(untitled.status().as_u16(), 400);

    // Another user cannot see the draft
    let other = signup_and_login(&client, &address).await;
    let foreign = client
        .get(format!("{}/api/drafts/{}", address, draft))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status().as_u16(), 404);

    // Discarding leaves nothing behind
    let discard = client
        .delete(format!("{}/api/drafts/{}", address, draft))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(discard.status().as_u16(), 204);

    let exams: Vec<Value> = client
        .get(format!("{}/api/exams", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(exams.is_empty());
}

#[tokio::test]
async fn empty_draft_cannot_be_submitted() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = signup_and_login(&client, &address).await;
    let draft = open_draft(&client, &address, &token).await;
    set_title(&client, &address, &token, &draft, "Nothing here").await;

    let resp = client
        .post(format!("{}/api/drafts/{}/submit", address, draft))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn draft_limit_per_user() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = signup_and_login(&client, &address).await;

    for _ in 0..3 {
        open_draft(&client, &address, &token).await;
    }

    let resp = client
        .post(format!("{}/api/drafts", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn one_shot_create_and_dashboard() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = signup_and_login(&client, &address).await;

    let empty = client
        .post(format!("{}/api/exams", address))
        .bearer_auth(&token)
        .json(&json!({"title": "Empty", "questions": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status().as_u16(), 422);

    let mut ids = Vec::new();
    for title in ["Unit Test 1", "Unit Test 2"] {
        let resp = client
            .post(format!("{}/api/exams", address))
            .bearer_auth(&token)
            .json(&json!({
                "title": title,
                "questions": [
                    {"section": "E", "question_text": "Long answer"},
                    {"section": "B", "question_text": "Very short 1"},
                    {"section": "B", "question_text": "Very short 2"}
                ]
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 201);
        ids.push(resp.json::<Value>().await.unwrap()["id"].as_i64().unwrap());
    }

    let exams: Vec<Value> = client
        .get(format!("{}/api/exams", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(exams.len(), 2);
    assert_eq!(exams[0]["title"], "Unit Test 2");
    assert_eq!(exams[1]["title"], "Unit Test 1");
    assert_eq!(exams[0]["total_marks"], 5 + 2 + 2);

    let view: Value = client
        .get(format!("{}/api/exams/{}", address, ids[0]))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let sections = view["sections"].as_array().unwrap();
    assert_eq!(sections[0]["section"], "B");
    assert_eq!(sections[0]["questions"][1]["question_number"], 2);
    assert_eq!(sections[1]["section"], "E");

    // Exams are private to their owner
    let other = signup_and_login(&client, &address).await;
    let foreign = client
        .get(format!("{}/api/exams/{}", address, ids[0]))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status().as_u16(), 404);
}

/// Exam store whose question batch insert can be made to fail.
struct FlakyStore {
    inner: MemoryStore,
    fail_questions: AtomicBool,
}

#[async_trait]
impl ExamStore for FlakyStore {
    async fn insert_exam(&self, owner_id: i64, exam: &ExamDraft) -> Result<Exam, StoreError> {
        self.inner.insert_exam(owner_id, exam).await
    }

    async fn insert_questions(&self, exam_id: i64, questions: &[Question]) -> Result<(), StoreError> {
        if self.fail_questions.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.insert_questions(exam_id, questions).await
    }

    async fn delete_exam(&self, exam_id: i64) -> Result<(), StoreError> {
        self.inner.delete_exam(exam_id).await
    }

    async fn find_exam(&self, exam_id: i64) -> Result<Option<Exam>, StoreError> {
        self.inner.find_exam(exam_id).await
    }

    async fn list_questions(&self, exam_id: i64) -> Result<Vec<StoredQuestion>, StoreError> {
        self.inner.list_questions(exam_id).await
    }

    async fn list_exams_by_owner(&self, owner_id: i64) -> Result<Vec<Exam>, StoreError> {
        self.inner.list_exams_by_owner(owner_id).await
    }
}

#[tokio::test]
async fn failed_save_keeps_draft_and_leaves_no_orphan() {
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::new(),
        fail_questions: AtomicBool::new(true),
    });
    let address = spawn_app_with(store.clone()).await;
    let client = reqwest::Client::new();
    let token = signup_and_login(&client, &address).await;
    let draft = open_draft(&client, &address, &token).await;

    add_question(&client, &address, &token, &draft, "A", "What is 7 x 8?").await;
    set_title(&client, &address, &token, &draft, "Retry Me").await;

    let failed = client
        .post(format!("{}/api/drafts/{}/submit", address, draft))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(failed.status().as_u16(), 500);
    let body: Value = failed.json().await.unwrap();
    assert_eq!(body["error"], "Failed to save exam, please retry");

    // Orphaned exam row was removed
    let exams: Vec<Value> = client
        .get(format!("{}/api/exams", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(exams.is_empty());

    // Draft survived, frozen but intact
    let kept: Value = client
        .get(format!("{}/api/drafts/{}", address, draft))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(kept["title"], "Retry Me");
    assert_eq!(kept["state"], "finalized");
    assert_eq!(kept["progress"]["added"], 1);

    let late_edit = add_question(&client, &address, &token, &draft, "A", "late").await;
    assert_eq!(late_edit.status().as_u16(), 409);

    store.fail_questions.store(false, Ordering::SeqCst);

    let retried = client
        .post(format!("{}/api/drafts/{}/submit", address, draft))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(retried.status().as_u16(), 201);
    let exam_id = retried.json::<Value>().await.unwrap()["id"].as_i64().unwrap();

    let view: Value = client
        .get(format!("{}/api/exams/{}", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["title"], "Retry Me");
    assert_eq!(view["sections"][0]["questions"][0]["question_text"], "What is 7 x 8?");
}

/// Exam store whose question batch insert takes a while.
struct SlowStore {
    inner: MemoryStore,
}

#[async_trait]
impl ExamStore for SlowStore {
    async fn insert_exam(&self, owner_id: i64, exam: &ExamDraft) -> Result<Exam, StoreError> {
        self.inner.insert_exam(owner_id, exam).await
    }

    async fn insert_questions(&self, exam_id: i64, questions: &[Question]) -> Result<(), StoreError> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        self.inner.insert_questions(exam_id, questions).await
    }

    async fn delete_exam(&self, exam_id: i64) -> Result<(), StoreError> {
        self.inner.delete_exam(exam_id).await
    }

    async fn find_exam(&self, exam_id: i64) -> Result<Option<Exam>, StoreError> {
        self.inner.find_exam(exam_id).await
    }

    async fn list_questions(&self, exam_id: i64) -> Result<Vec<StoredQuestion>, StoreError> {
        self.inner.list_questions(exam_id).await
    }

    async fn list_exams_by_owner(&self, owner_id: i64) -> Result<Vec<Exam>, StoreError> {
        self.inner.list_exams_by_owner(owner_id).await
    }
}

#[tokio::test]
async fn overlapping_submits_save_one_exam() {
    let address = spawn_app_with(Arc::new(SlowStore {
        inner: MemoryStore::new(),
    }))
    .await;
    let client = reqwest::Client::new();
    let token = signup_and_login(&client, &address).await;
    let draft = open_draft(&client, &address, &token).await;

    add_question(&client, &address, &token, &draft, "A", "What is 9 x 9?").await;
    set_title(&client, &address, &token, &draft, "Submitted Twice").await;

    let submit = || {
        client
            .post(format!("{}/api/drafts/{}/submit", address, draft))
            .bearer_auth(&token)
            .send()
    };
    let (first, second) = tokio::join!(submit(), submit());

    let mut statuses = vec![
        first.unwrap().status().as_u16(),
        second.unwrap().status().as_u16(),
    ];
    statuses.sort();
    assert_eq!(statuses, vec![201, 409]);

    let exams: Vec<Value> = client
        .get(format!("{}/api/exams", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(exams.len(), 1);
    assert_eq!(exams[0]["title"], "Submitted Twice");

    // Draft is gone once the winning submit finished
    let gone = client
        .get(format!("{}/api/drafts/{}", address, draft))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);
}
