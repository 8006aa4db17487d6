// tests/api_tests.rs
//
// Integration tests against a live Postgres. Run them with a database:
//   DATABASE_URL=postgres://... cargo test -- --ignored

use asterisk_backend::{config::Config, models::subject::SubjectCatalog, routes, state::AppState};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL and a pool for seeding.
async fn spawn_app(free_daily_attempt_limit: i64) -> (String, PgPool) {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        free_daily_attempt_limit,
        free_subject_limit: 3,
        // Full-width band: the flow tests care about exclusion and quota
        // semantics, not band placement (which is unit-tested).
        difficulty_tolerance: 100.0,
        subject_catalog_path: "subjects.json".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let catalog = SubjectCatalog::load("subjects.json").expect("Failed to load subject catalog");

    // No model client: generation is disabled in tests, so every served
    // question must come from the seeded corpus.
    let state = AppState::new(pool.clone(), config, catalog, None);

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

    (address, pool)
}

/// Registers, verifies (reading the code straight from the store), and logs
/// in a fresh user. Returns (token, username).
async fn signup_and_login(address: &str, pool: &PgPool) -> (String, String) {
    let client = reqwest::Client::new();
    let unique = &uuid::Uuid::new_v4().to_string()[..8];
    let username = format!("u_{unique}");
    let email = format!("{username}@example.com");

    let resp = client
        .post(format!("{address}/api/auth/register"))
        .json(&serde_json::json!({
            "username": username,
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(resp.status().as_u16(), 201);

    let code: String =
        sqlx::query_scalar("SELECT verification_code FROM users WHERE username = $1")
            .bind(&username)
            .fetch_one(pool)
            .await
            .expect("Failed to read verification code");

    let resp = client
        .post(format!("{address}/api/auth/verify"))
        .json(&serde_json::json!({ "email": email, "code": code }))
        .send()
        .await
        .expect("Verify failed");
    assert_eq!(resp.status().as_u16(), 200);

    let login_resp = client
        .post(format!("{address}/api/auth/login"))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    assert_eq!(login_resp["is_verified"], true);
    let token = login_resp["token"].as_str().expect("Token not found");
    (token.to_string(), username)
}

/// Seeds one question in subject 0620 at the given difficulty.
async fn seed_question(pool: &PgPool, difficulty: f64) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO questions
            (subject_code, subject_name, level, topic, subtopic, question_text,
             options, correct_option, explanation, difficulty_rating)
        VALUES ('0620', 'Chemistry', 'IGCSE', 'Stoichiometry', 'The mole concept',
                'How many moles are in 36 g of water?', $1, 'B',
                'The molar mass of water is 18 g/mol, so 36 g is 2 mol.', $2)
        RETURNING id
        "#,
    )
    .bind(serde_json::json!([
        {"option": "A", "text": "1"},
        {"option": "B", "text": "2"},
        {"option": "C", "text": "18"},
        {"option": "D", "text": "36"}
    ]))
    .bind(difficulty)
    .fetch_one(pool)
    .await
    .expect("Failed to seed question")
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn health_check_404() {
    // Arrange
    let (address, _pool) = spawn_app(20).await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{address}/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn register_fails_validation() {
    // Arrange
    let (address, _pool) = spawn_app(20).await;
    let client = reqwest::Client::new();

    // Act: Send a username that is too short
    let response = client
        .post(format!("{address}/api/auth/register"))
        .json(&serde_json::json!({
            "username": "yo",
            "email": "yo@example.com",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn practice_flow_serves_and_excludes_attempted_questions() {
    // Arrange
    let (address, pool) = spawn_app(20).await;
    let client = reqwest::Client::new();
    let (token, _username) = signup_and_login(&address, &pool).await;

    // Two unseen questions for this user.
    seed_question(&pool, 50.0).await;
    seed_question(&pool, 50.0).await;

    // Act: first question
    let first: serde_json::Value = client
        .get(format!("{address}/api/practice/next?subject_code=0620"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("next failed")
        .json()
        .await
        .expect("next json");

    let first_id = first["id"].as_i64().expect("question id");

    // Submit an answer for it
    let submit: serde_json::Value = client
        .post(format!("{address}/api/practice/submit"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "question_id": first_id,
            "answer": "B",
            "is_correct": true,
            "time_taken_seconds": 30.0,
            "subject_code": "0620",
            "level": "IGCSE",
            "topic": "Stoichiometry",
            "subtopic": "The mole concept",
            "served_difficulty": 50.0
        }))
        .send()
        .await
        .expect("submit failed")
        .json()
        .await
        .expect("submit json");

    // One attempt, one correct -> subject rating 100.
    assert_eq!(submit["subject_rating"], 100.0);
    // Generation is disabled in tests, so no follow-up question.
    assert!(submit["next_question"].is_null());

    // The next question must not be the one already attempted.
    let second: serde_json::Value = client
        .get(format!("{address}/api/practice/next?subject_code=0620"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("next failed")
        .json()
        .await
        .expect("next json");

    let second_id = second["id"].as_i64().expect("question id");
    assert_ne!(second_id, first_id);

    // The attempt record is visible in history and immutable fields match.
    let history: serde_json::Value = client
        .get(format!("{address}/api/profile/history"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("history failed")
        .json()
        .await
        .expect("history json");
    let entry = &history.as_array().expect("history array")[0];
    assert_eq!(entry["question_id"].as_i64(), Some(first_id));
    assert_eq!(entry["is_correct"], true);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn daily_quota_blocks_free_tier() {
    // Arrange: a limit of 1 attempt per day.
    let (address, pool) = spawn_app(1).await;
    let client = reqwest::Client::new();
    let (token, _username) = signup_and_login(&address, &pool).await;

    let q1 = seed_question(&pool, 50.0).await;
    seed_question(&pool, 50.0).await;

    // Use up the quota.
    let resp = client
        .post(format!("{address}/api/practice/submit"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "question_id": q1,
            "answer": "A",
            "is_correct": false,
            "time_taken_seconds": 12.0,
            "subject_code": "0620",
            "served_difficulty": 50.0
        }))
        .send()
        .await
        .expect("submit failed");
    assert_eq!(resp.status().as_u16(), 200);

    // Act: the next request must be rejected with 429.
    let blocked = client
        .get(format!("{address}/api/practice/next?subject_code=0620"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("next failed");

    // Assert
    assert_eq!(blocked.status().as_u16(), 429);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn subject_personalization_enforces_limit_and_cooldown() {
    // Arrange
    let (address, pool) = spawn_app(20).await;
    let client = reqwest::Client::new();
    let (token, _username) = signup_and_login(&address, &pool).await;

    // Act: add three subjects (the free-tier limit).
    for code in ["0580", "0620", "0625"] {
        let resp = client
            .post(format!("{address}/api/subjects/selected"))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "subject_code": code }))
            .send()
            .await
            .expect("add subject failed");
        assert_eq!(resp.status().as_u16(), 201);
    }

    // A fourth is over the free-tier limit.
    let over = client
        .post(format!("{address}/api/subjects/selected"))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "subject_code": "0610" }))
        .send()
        .await
        .expect("add subject failed");
    assert_eq!(over.status().as_u16(), 429);

    // Removal inside the cooldown window is blocked for free users.
    let removed = client
        .delete(format!("{address}/api/subjects/selected/0620"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("remove subject failed");
    assert_eq!(removed.status().as_u16(), 400);
}
