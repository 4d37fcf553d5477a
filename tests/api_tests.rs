// tests/api_tests.rs

use std::{collections::HashSet, sync::Arc};

use mock_exam::{
    auth::Argon2CredentialVerifier,
    config::Config,
    models::question::CreateQuestionRequest,
    routes,
    state::AppState,
    store::QuestionStore,
};
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;

const ADMIN_USER: &str = "admin";
const ADMIN_PASS: &str = "correct-horse";

struct TestApp {
    address: String,
    store: QuestionStore,
}

/// Helper function to spawn the app on a random port for testing.
/// Backed by a private in-memory SQLite database.
async fn spawn_app() -> TestApp {
    // 1. Create a pool; a single never-recycled connection keeps the
    //    in-memory database alive for the whole test.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        admin_username: Some(ADMIN_USER.to_string()),
        admin_password: Some(ADMIN_PASS.to_string()),
        cors_origins: vec!["http://localhost:3000".to_string()],
        default_question_limit: 10,
        max_question_limit: 100,
    };

    let store = QuestionStore::new(pool);
    let verifier = Argon2CredentialVerifier::from_plaintext(ADMIN_USER, ADMIN_PASS).unwrap();
    let state = AppState {
        store: store.clone(),
        config,
        verifier: Arc::new(verifier),
    };

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, store }
}

/// Seeds `count` questions whose correct answer is `i % 4`. Returns their ids.
async fn seed(store: &QuestionStore, count: usize) -> Vec<(String, i64)> {
    let mut seeded = Vec::new();
    for i in 0..count {
        let correct = (i % 4) as i64;
        let q = store
            .insert(CreateQuestionRequest {
                question_text: format!("Question {}", i),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                correct_answer_index: correct,
            })
            .await
            .unwrap();
        seeded.push((q.id, correct));
    }
    seeded
}

async fn admin_token(client: &reqwest::Client, address: &str) -> String {
    let body: Value = client
        .post(format!("{}/admin/login", address))
        .json(&json!({ "username": ADMIN_USER, "password": ADMIN_PASS }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .unwrap();
    body["token"].as_str().expect("Token not found").to_string()
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn sampled_questions_hide_the_answer() {
    let app = spawn_app().await;
    seed(&app.store, 12).await;
    let client = reqwest::Client::new();

    let questions: Vec<Value> = client
        .get(format!("{}/questions?limit=5", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(questions.len(), 5);
    let ids: HashSet<&str> = questions.iter().map(|q| q["_id"].as_str().unwrap()).collect();
    assert_eq!(ids.len(), 5);
    for q in &questions {
        let obj = q.as_object().unwrap();
        assert_eq!(obj.len(), 3, "unexpected fields: {:?}", obj.keys());
        assert!(obj.contains_key("questionText"));
        assert_eq!(q["options"].as_array().unwrap().len(), 4);
        assert!(!obj.contains_key("correctAnswerIndex"));
    }
}

#[tokio::test]
async fn sampling_defaults_and_caps_at_store_size() {
    let app = spawn_app().await;
    seed(&app.store, 3).await;
    let client = reqwest::Client::new();

    for query in ["", "?limit=abc", "?limit=50"] {
        let questions: Vec<Value> = client
            .get(format!("{}/questions{}", app.address, query))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(questions.len(), 3, "query {:?}", query);
    }
}

#[tokio::test]
async fn submit_scores_half() {
    let app = spawn_app().await;
    let seeded = seed(&app.store, 2).await;
    let client = reqwest::Client::new();

    let (q1, c1) = &seeded[0];
    let (q2, c2) = &seeded[1];
    let response = client
        .post(format!("{}/submit", app.address))
        .json(&json!({
            "answers": [
                { "questionId": q1, "selectedAnswer": c1 },
                { "questionId": q2, "selectedAnswer": (c2 + 1) % 4 }
            ]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["totalQuestions"], 2);
    assert_eq!(result["correctAnswers"], 1);
    assert_eq!(result["score"], 50);
    assert_eq!(result["details"][0]["isCorrect"], true);
    assert_eq!(result["details"][1]["isCorrect"], false);
    assert_eq!(result["details"][1]["correctAnswer"], *c2);
    assert_eq!(result["details"][0]["questionText"], "Question 0");
}

#[tokio::test]
async fn submit_empty_answers_scores_zero() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let result: Value = client
        .post(format!("{}/submit", app.address))
        .json(&json!({ "answers": [] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(
        result,
        json!({ "totalQuestions": 0, "correctAnswers": 0, "score": 0, "details": [] })
    );
}

#[tokio::test]
async fn submit_rejects_malformed_bodies() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    for body in [json!({}), json!({ "answers": "nope" }), json!({ "answers": null })] {
        let response = client
            .post(format!("{}/submit", app.address))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400, "body {}", body);
    }

    let response = client
        .post(format!("{}/submit", app.address))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn unknown_question_inflates_total() {
    // Preserved behaviour: the denominator is the submitted count.
    let app = spawn_app().await;
    let seeded = seed(&app.store, 1).await;
    let client = reqwest::Client::new();

    let result: Value = client
        .post(format!("{}/submit", app.address))
        .json(&json!({
            "answers": [
                { "questionId": seeded[0].0, "selectedAnswer": seeded[0].1 },
                { "questionId": "does-not-exist", "selectedAnswer": 0 }
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(result["totalQuestions"], 2);
    assert_eq!(result["correctAnswers"], 1);
    assert_eq!(result["score"], 50);
    assert_eq!(result["details"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unanswered_and_missing_selection_are_wrong() {
    let app = spawn_app().await;
    let seeded = seed(&app.store, 2).await;
    let client = reqwest::Client::new();

    let result: Value = client
        .post(format!("{}/submit", app.address))
        .json(&json!({
            "answers": [
                { "questionId": seeded[0].0, "selectedAnswer": -1 },
                { "questionId": seeded[1].0 }
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(result["correctAnswers"], 0);
    assert_eq!(result["details"][1]["selectedAnswer"], -1);
}

#[tokio::test]
async fn admin_routes_require_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/admin/questions", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .get(format!("{}/admin/questions", app.address))
        .header("Authorization", "Bearer garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .post(format!("{}/admin/login", app.address))
        .json(&json!({ "username": ADMIN_USER, "password": "admin123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_question_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;
    let auth = format!("Bearer {}", token);

    // Create
    let response = client
        .post(format!("{}/admin/questions", app.address))
        .header("Authorization", &auth)
        .json(&json!({
            "questionText": "Which planet is red?",
            "options": ["Venus", "Mars", "Jupiter", "Saturn"],
            "correctAnswerIndex": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let created: Value = response.json().await.unwrap();
    let id = created["_id"].as_str().unwrap().to_string();
    assert_eq!(created["correctAnswerIndex"], 1);

    // Read
    let fetched: Value = client
        .get(format!("{}/admin/questions/{}", app.address, id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["questionText"], "Which planet is red?");

    // Update (partial)
    let response = client
        .put(format!("{}/admin/questions/{}", app.address, id))
        .header("Authorization", &auth)
        .json(&json!({ "correctAnswerIndex": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["correctAnswerIndex"], 2);
    assert_eq!(updated["options"][1], "Mars");

    // List
    let listed: Vec<Value> = client
        .get(format!("{}/admin/questions", app.address))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    // Delete, then 404 everywhere
    let response = client
        .delete(format!("{}/admin/questions/{}", app.address, id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    for response in [
        client
            .get(format!("{}/admin/questions/{}", app.address, id))
            .header("Authorization", &auth)
            .send()
            .await
            .unwrap(),
        client
            .delete(format!("{}/admin/questions/{}", app.address, id))
            .header("Authorization", &auth)
            .send()
            .await
            .unwrap(),
        client
            .put(format!("{}/admin/questions/{}", app.address, id))
            .header("Authorization", &auth)
            .json(&json!({ "questionText": "gone" }))
            .send()
            .await
            .unwrap(),
    ] {
        assert_eq!(response.status().as_u16(), 404);
    }
}

#[tokio::test]
async fn admin_create_rejects_invalid_questions() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let auth = format!("Bearer {}", admin_token(&client, &app.address).await);

    let invalid = [
        json!({ "questionText": "Three options", "options": ["a", "b", "c"], "correctAnswerIndex": 0 }),
        json!({ "questionText": "Bad index", "options": ["a", "b", "c", "d"], "correctAnswerIndex": 4 }),
        json!({ "questionText": "Negative", "options": ["a", "b", "c", "d"], "correctAnswerIndex": -1 }),
        json!({ "options": ["a", "b", "c", "d"], "correctAnswerIndex": 0 }),
    ];

    for body in invalid {
        let response = client
            .post(format!("{}/admin/questions", app.address))
            .header("Authorization", &auth)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400, "body {}", body);
    }

    assert!(app.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = spawn_app().await;
    let doc: Value = reqwest::get(format!("{}/api-docs/openapi.json", app.address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(doc["paths"]["/questions"]["get"].is_object());
    assert!(doc["paths"]["/submit"]["post"].is_object());
}

#[tokio::test]
async fn large_submission_is_scored() {
    let app = spawn_app().await;
    let seeded = seed(&app.store, 1).await;
    let client = reqwest::Client::new();

    let mut answers: Vec<Value> = (0..33_000)
        .map(|i| json!({ "questionId": format!("x{}", i), "selectedAnswer": 0 }))
        .collect();
    answers.push(json!({ "questionId": seeded[0].0, "selectedAnswer": seeded[0].1 }));

    let response = client
        .post(format!("{}/submit", app.address))
        .json(&json!({ "answers": answers }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["totalQuestions"], 33_001);
    assert_eq!(result["correctAnswers"], 1);
    assert_eq!(result["details"].as_array().unwrap().len(), 1);
}
