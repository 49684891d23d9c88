//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use fincopilot_core::ai::MockBackend;
use fincopilot_core::db::Database;
use http_body_util::BodyExt;
use tower::ServiceExt;

const TEST_SECRET: &str = "server-test-secret";

fn auth_config() -> ServerConfig {
    ServerConfig {
        require_auth: true,
        tokens: TokenConfig::new(TEST_SECRET),
        ..Default::default()
    }
}

fn no_auth_config() -> ServerConfig {
    ServerConfig {
        require_auth: false,
        allowed_origins: vec![],
        ..Default::default()
    }
}

fn app_with(db: Database, config: ServerConfig, ai: Option<AIClient>) -> Router {
    create_router_with_options(db, config, ai, &mut PromptLibrary::embedded_only())
}

fn setup_test_app() -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    let app = app_with(db.clone(), auth_config(), None);
    (app, db)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        "authorization",
        format!("Bearer {}", token).parse().unwrap(),
    );
    request
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn register(app: &Router, name: &str, email: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/register",
            serde_json::json!({"name": name, "email": email, "password": "correct horse"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    get_body_json(response).await
}

async fn login(app: &Router, email: &str, password: &str) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/login",
            serde_json::json!({"email": email, "password": password}),
        ))
        .await
        .unwrap()
}

async fn register_and_login(app: &Router) -> String {
    register(app, "Asha", "asha@example.com").await;
    let response = login(app, "asha@example.com", "correct horse").await;
    assert_eq!(response.status(), StatusCode::OK);
    get_body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

// ========== Public endpoints ==========

#[tokio::test]
async fn test_root_banner() {
    let (app, _) = setup_test_app();

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );

    let json = get_body_json(response).await;
    assert_eq!(json["message"], "AI Finance Copilot Backend Running");
}

#[tokio::test]
async fn test_health_reports_ai() {
    let (app, _) = setup_test_app();
    let json = get_body_json(app.oneshot(get("/api/health")).await.unwrap()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["ai"], false);

    let db = Database::in_memory().unwrap();
    let app = app_with(db, auth_config(), Some(AIClient::mock()));
    let json = get_body_json(app.oneshot(get("/api/health")).await.unwrap()).await;
    assert_eq!(json["ai"], true);

    let db = Database::in_memory().unwrap();
    let app = app_with(
        db,
        auth_config(),
        Some(AIClient::Mock(MockBackend::unhealthy())),
    );
    let json = get_body_json(app.oneshot(get("/api/health")).await.unwrap()).await;
    assert_eq!(json["ai"], false);
}

// ========== Registration and login ==========

#[tokio::test]
async fn test_register_hides_password_hash() {
    let (app, db) = setup_test_app();

    let json = register(&app, "Asha", "Asha@Example.com").await;
    assert_eq!(json["name"], "Asha");
    assert_eq!(json["email"], "asha@example.com");
    assert!(json.get("password_hash").is_none());

    let audit = db.list_audit_log(10).unwrap();
    assert_eq!(audit[0].action, "register");
}

#[tokio::test]
async fn test_register_duplicate_email_conflict() {
    let (app, _) = setup_test_app();
    register(&app, "Asha", "asha@example.com").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/register",
            serde_json::json!({"name": "Other", "email": "asha@example.com", "password": "long enough"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let (app, _) = setup_test_app();

    let short_password = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/register",
            serde_json::json!({"name": "Asha", "email": "asha@example.com", "password": "short"}),
        ))
        .await
        .unwrap();
    assert_eq!(short_password.status(), StatusCode::BAD_REQUEST);

    let missing_field = app
        .oneshot(json_request(
            "POST",
            "/api/register",
            serde_json::json!({"name": "Asha"}),
        ))
        .await
        .unwrap();
    assert_eq!(missing_field.status(), StatusCode::BAD_REQUEST);
}

fn register_request(name: &str, email: &str) -> Request<Body> {
    json_request(
        "POST",
        "/api/register",
        serde_json::json!({"name": name, "email": email, "password": "correct horse"}),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_registrations() {
    let (app, db) = setup_test_app();

    // Same email: exactly one wins, the other is a conflict, never a 500
    let (first, second) = tokio::join!(
        app.clone().oneshot(register_request("Asha", "asha@example.com")),
        app.clone().oneshot(register_request("Asha K", "asha@example.com")),
    );
    let mut statuses = [first.unwrap().status(), second.unwrap().status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

    // Distinct users hash in parallel without blocking each other
    let (ravi, meera) = tokio::join!(
        app.clone().oneshot(register_request("Ravi", "ravi@example.com")),
        app.clone().oneshot(register_request("Meera", "meera@example.com")),
    );
    assert_eq!(ravi.unwrap().status(), StatusCode::CREATED);
    assert_eq!(meera.unwrap().status(), StatusCode::CREATED);

    assert_eq!(db.list_users().unwrap().len(), 3);
}

#[tokio::test]
async fn test_login_issues_bearer_token() {
    let (app, _) = setup_test_app();
    register(&app, "Asha", "asha@example.com").await;

    let response = login(&app, "ASHA@example.com", "correct horse").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["token_type"], "bearer");
    assert_eq!(json["expires_in"], 3600);

    let token = json["access_token"].as_str().unwrap();
    let claims = verify_token(token, &TokenConfig::new(TEST_SECRET)).unwrap();
    assert_eq!(claims.email, "asha@example.com");
}

#[tokio::test]
async fn test_login_wrong_password_or_unknown_email() {
    let (app, db) = setup_test_app();
    register(&app, "Asha", "asha@example.com").await;

    let wrong = login(&app, "asha@example.com", "incorrect horse").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong_body = get_body_json(wrong).await;

    let unknown = login(&app, "nobody@example.com", "correct horse").await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(get_body_json(unknown).await, wrong_body);

    assert_eq!(db.list_audit_log(1).unwrap()[0].action, "login_failed");
}

#[tokio::test]
async fn test_login_without_secret_unavailable() {
    let db = Database::in_memory().unwrap();
    let app = app_with(db, no_auth_config(), None);
    register(&app, "Asha", "asha@example.com").await;

    let response = login(&app, "asha@example.com", "correct horse").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ========== Authentication ==========

#[tokio::test]
async fn test_protected_routes_require_auth() {
    let (app, _) = setup_test_app();

    for uri in [
        "/api/me",
        "/api/income",
        "/api/expenses",
        "/api/summary",
        "/api/ai-stream",
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn test_me_with_token() {
    let (app, _) = setup_test_app();
    let token = register_and_login(&app).await;

    let response = app
        .oneshot(with_bearer(get("/api/me"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["email"], "asha@example.com");
}

#[tokio::test]
async fn test_tampered_and_foreign_tokens_rejected() {
    let (app, _) = setup_test_app();
    let token = register_and_login(&app).await;

    let mut tampered = token.clone();
    tampered.push('x');
    let response = app
        .clone()
        .oneshot(with_bearer(get("/api/me"), &tampered))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let user = fincopilot_core::User {
        id: 1,
        name: "Asha".into(),
        email: "asha@example.com".into(),
        password_hash: String::new(),
        created_at: chrono::Utc::now(),
    };
    let foreign = issue_token(&user, &TokenConfig::new("some-other-secret")).unwrap();
    let response = app
        .oneshot(with_bearer(get("/api/me"), &foreign))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_header_ignored_when_auth_required() {
    let (app, db) = setup_test_app();
    register(&app, "Asha", "asha@example.com").await;
    let user_id = db.list_users().unwrap()[0].id;

    let request = Request::builder()
        .uri("/api/summary")
        .header(USER_ID_HEADER, user_id.to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_no_auth_uses_user_id_header() {
    let db = Database::in_memory().unwrap();
    let app = app_with(db.clone(), no_auth_config(), None);
    let user = register(&app, "Asha", "asha@example.com").await;
    let user_id = user["id"].as_i64().unwrap();

    let request = Request::builder()
        .uri("/api/me")
        .header(USER_ID_HEADER, user_id.to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Missing header
    let response = app.clone().oneshot(get("/api/me")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Unknown user
    let request = Request::builder()
        .uri("/api/me")
        .header(USER_ID_HEADER, "9999")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ========== Ledger entries ==========

#[tokio::test]
async fn test_add_and_list_entries() {
    let (app, db) = setup_test_app();
    let token = register_and_login(&app).await;

    let response = app
        .clone()
        .oneshot(with_bearer(
            json_request(
                "POST",
                "/api/income",
                serde_json::json!({"amount": 10000.0, "source": "Salary", "date": "2026-02-13"}),
            ),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let income = get_body_json(response).await;
    assert_eq!(income["source"], "Salary");
    assert_eq!(income["date"], "2026-02-13");

    for (amount, category) in [(2500.0, "Rent"), (500.0, "Groceries")] {
        let response = app
            .clone()
            .oneshot(with_bearer(
                json_request(
                    "POST",
                    "/api/expenses",
                    serde_json::json!({"amount": amount, "category": category}),
                ),
                &token,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(with_bearer(get("/api/expenses"), &token))
        .await
        .unwrap();
    let expenses = get_body_json(response).await;
    let expenses = expenses.as_array().unwrap();
    assert_eq!(expenses.len(), 2);
    assert_eq!(expenses[0]["category"], "Groceries");

    let response = app
        .oneshot(with_bearer(get("/api/income"), &token))
        .await
        .unwrap();
    assert_eq!(get_body_json(response).await.as_array().unwrap().len(), 1);

    let creates = db
        .list_audit_log(10)
        .unwrap()
        .into_iter()
        .filter(|e| e.action == "create")
        .count();
    assert_eq!(creates, 3);
}

#[tokio::test]
async fn test_invalid_amounts_rejected() {
    let (app, _) = setup_test_app();
    let token = register_and_login(&app).await;

    let bodies = [
        serde_json::json!({"amount": -5.0, "category": "Refund"}),
        serde_json::json!({"amount": 5.0, "category": "   "}),
        serde_json::json!({"amount": "five", "category": "Tea"}),
        serde_json::json!({"category": "Tea"}),
        serde_json::json!({"amount": 1e13, "category": "Yacht"}),
    ];
    for body in bodies {
        let response = app
            .clone()
            .oneshot(with_bearer(
                json_request("POST", "/api/expenses", body.clone()),
                &token,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
    }

    let response = app
        .oneshot(with_bearer(get("/api/expenses"), &token))
        .await
        .unwrap();
    assert!(get_body_json(response).await.as_array().unwrap().is_empty());
}

// ========== Summary ==========

#[tokio::test]
async fn test_summary_round_trip() {
    let (app, db) = setup_test_app();
    let token = register_and_login(&app).await;

    // Fresh user: all zeros, baseline score 50
    let response = app
        .clone()
        .oneshot(with_bearer(get("/api/summary"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total_income"], 0.0);
    assert_eq!(json["savings_percent"], 0.0);
    assert_eq!(json["financial_score"], 50);

    let user_id = db.list_users().unwrap()[0].id;
    db.add_income(
        user_id,
        &fincopilot_core::NewEntry::new(10000.0, "Salary", None),
    )
    .unwrap();
    db.add_expense(user_id, &fincopilot_core::NewEntry::new(6000.0, "Rent", None))
        .unwrap();

    let response = app
        .clone()
        .oneshot(with_bearer(get("/api/summary"), &token))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total_income"], 10000.0);
    assert_eq!(json["total_expense"], 6000.0);
    assert_eq!(json["savings"], 4000.0);
    assert_eq!(json["savings_percent"], 40.0);
    assert_eq!(json["financial_score"], 80);
    assert_eq!(json.as_object().unwrap().len(), 5);

    let response = app
        .clone()
        .oneshot(with_bearer(
            get("/api/summary?score_policy=weighted"),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(get_body_json(response).await["financial_score"], 100);

    let response = app
        .oneshot(with_bearer(get("/api/summary?score_policy=zzz"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary_uses_configured_default_policy() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        score_policy: ScorePolicy::Weighted,
        ..auth_config()
    };
    let app = app_with(db, config, None);
    let token = register_and_login(&app).await;

    let response = app
        .oneshot(with_bearer(get("/api/summary"), &token))
        .await
        .unwrap();
    // No income, no expenses: 10 + 5 + 0
    assert_eq!(get_body_json(response).await["financial_score"], 15);
}

#[tokio::test]
async fn test_users_only_see_their_own_ledger() {
    let (app, _) = setup_test_app();
    let asha = register_and_login(&app).await;

    register(&app, "Ravi", "ravi@example.com").await;
    let ravi = get_body_json(login(&app, "ravi@example.com", "correct horse").await).await
        ["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    app.clone()
        .oneshot(with_bearer(
            json_request(
                "POST",
                "/api/income",
                serde_json::json!({"amount": 500.0, "source": "Gift"}),
            ),
            &ravi,
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(with_bearer(get("/api/summary"), &asha))
        .await
        .unwrap();
    assert_eq!(get_body_json(response).await["total_income"], 0.0);
}

// ========== Insight stream ==========

#[tokio::test]
async fn test_ai_stream_unconfigured() {
    let (app, _) = setup_test_app();
    let token = register_and_login(&app).await;

    let response = app
        .oneshot(with_bearer(get("/api/ai-stream"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_ai_stream_relays_chunks_in_order() {
    let db = Database::in_memory().unwrap();
    let mock = MockBackend::with_chunks(&["Save ", "₹2,000 ", "more each month."]);
    let app = app_with(db.clone(), auth_config(), Some(AIClient::Mock(mock.clone())));
    let token = register_and_login(&app).await;

    let user_id = db.list_users().unwrap()[0].id;
    db.add_income(
        user_id,
        &fincopilot_core::NewEntry::new(123456.5, "Salary", None),
    )
    .unwrap();

    let response = app
        .oneshot(with_bearer(get("/api/ai-stream"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(
        get_body_text(response).await,
        "Save ₹2,000 more each month."
    );

    let prompt = mock.last_prompt().unwrap();
    assert!(prompt.user.contains("₹1,23,456.50"));
    assert!(!prompt.user.contains('$'));

    assert_eq!(db.list_audit_log(1).unwrap()[0].action, "stream");
}

#[tokio::test]
async fn test_ai_stream_backend_down() {
    let db = Database::in_memory().unwrap();
    let app = app_with(
        db,
        auth_config(),
        Some(AIClient::Mock(MockBackend::unhealthy())),
    );
    let token = register_and_login(&app).await;

    let response = app
        .oneshot(with_bearer(get("/api/ai-stream"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_ai_stream_mid_stream_failure_cuts_body() {
    let db = Database::in_memory().unwrap();
    let app = app_with(
        db,
        auth_config(),
        Some(AIClient::Mock(MockBackend::failing_after(&["Partial "]))),
    );
    let token = register_and_login(&app).await;

    let response = app
        .oneshot(with_bearer(get("/api/ai-stream"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.into_body().collect().await.is_err());
}

// ========== Config helpers ==========

#[test]
fn test_parse_allowed_origins() {
    assert_eq!(
        parse_allowed_origins("http://localhost:5173, https://app.example.com,,"),
        vec!["http://localhost:5173", "https://app.example.com"]
    );
    assert!(parse_allowed_origins("").is_empty());
}

#[test]
fn test_core_errors_map_to_statuses() {
    use fincopilot_core::Error as CoreError;

    let cases = [
        (CoreError::InvalidData("x".into()), StatusCode::BAD_REQUEST),
        (CoreError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (CoreError::Conflict("x".into()), StatusCode::CONFLICT),
        (CoreError::Auth("x".into()), StatusCode::UNAUTHORIZED),
        (CoreError::Ai("x".into()), StatusCode::BAD_GATEWAY),
        (
            CoreError::Encryption("x".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];
    for (err, status) in cases {
        assert_eq!(AppError::from(err).status(), status);
    }
}
