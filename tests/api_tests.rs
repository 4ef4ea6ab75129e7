use asset_manager::{
    AppConfig, AppState, create_router,
    auth::hash_password,
    models::{LoginResponse, Role, User, UserProfile},
    repository::NewUser,
};
use serde_json::json;
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct TestApp {
    pub address: String,
    pub state: AppState,
}

async fn spawn_app() -> TestApp {
    let state = AppState::in_memory(AppConfig::default())
        .await
        .expect("Failed to build in-memory state");
    let router = create_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, state }
}

impl TestApp {
    async fn seed_user(&self, email: &str, password: &str, role: Role) -> User {
        let password_hash = hash_password(password, 4).await.unwrap();
        self.state
            .repo
            .create_user(NewUser {
                email: email.to_string(),
                name: "API Tester".to_string(),
                password_hash,
                role,
                department_id: None,
            })
            .await
            .unwrap()
    }

    async fn login(&self, client: &reqwest::Client, email: &str, password: &str) -> LoginResponse {
        let response = client
            .post(format!("{}/auth/login", self.address))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = reqwest::get(format!("{}/health", app.address))
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    for path in ["/me", "/assets", "/documents", "/dashboard/stats", "/admin/backups"] {
        let response = client
            .get(format!("{}{}", app.address, path))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), 401, "{path}");
    }

    let bad_token = client
        .get(format!("{}/me", app.address))
        .bearer_auth("definitely-not-a-jwt")
        .send()
        .await
        .expect("req fail");
    assert_eq!(bad_token.status(), 401);
}

#[tokio::test]
async fn test_login_then_profile() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = app.seed_user("api@example.com", "password123", Role::User).await;

    let wrong = client
        .post(format!("{}/auth/login", app.address))
        .json(&json!({ "email": "api@example.com", "password": "nope-nope" }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(wrong.status(), 401);
    let body: serde_json::Value = wrong.json().await.unwrap();
    assert_eq!(body["code"], "unauthorized");

    let login = app.login(&client, "api@example.com", "password123").await;
    assert_eq!(login.user.id, user.id);

    let profile: UserProfile = client
        .get(format!("{}/me", app.address))
        .bearer_auth(&login.token)
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(profile.user.email, "api@example.com");
    // No department: read-only everywhere.
    assert!(profile.permissions.iter().all(|p| p.can_read && !p.can_write && !p.can_delete));
}

#[tokio::test]
async fn test_asset_round_trip_over_http() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    app.seed_user("boss@example.com", "password123", Role::Admin).await;
    let login = app.login(&client, "boss@example.com", "password123").await;

    let created = client
        .post(format!("{}/assets", app.address))
        .bearer_auth(&login.token)
        .header("x-forwarded-for", "198.51.100.7, 10.0.0.1")
        .json(&json!({ "name": "Server rack", "category": "ELECTRONICS" }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(created.status(), 201);
    let asset: serde_json::Value = created.json().await.unwrap();
    let barcode = asset["barcode"].as_str().unwrap().to_string();
    assert!(barcode.starts_with("0001.001.001."));
    assert!(barcode.ends_with(".ELC"));

    let scanned = client
        .get(format!("{}/assets/barcode/{}", app.address, barcode))
        .bearer_auth(&login.token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(scanned.status(), 200);

    let logs: serde_json::Value = client
        .get(format!("{}/audit-logs?entity_type=ASSET", app.address))
        .bearer_auth(&login.token)
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(logs["total"], 1);
    assert_eq!(logs["items"][0]["ip_address"], "198.51.100.7");
}

#[tokio::test]
async fn test_admin_routes_reject_non_admins() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    app.seed_user("manager@example.com", "password123", Role::Manager).await;
    let login = app.login(&client, "manager@example.com", "password123").await;

    let response = client
        .get(format!("{}/admin/ai-settings", app.address))
        .bearer_auth(&login.token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let doc: serde_json::Value = reqwest::get(format!("{}/api-docs/openapi.json", app.address))
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert!(doc["paths"]["/assets"].is_object());
    assert!(doc["paths"]["/admin/backups/settings"].is_object());
}
