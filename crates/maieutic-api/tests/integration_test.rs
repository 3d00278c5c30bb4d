// Integration tests for the Maieutic API
// Run with: DATABASE_URL=... cargo run -p maieutic-api, then:
//   cargo test --test integration_test -- --ignored

use maieutic_contracts::{Conflict, Project, Session};
use serde_json::json;

const API_BASE_URL: &str = "http://localhost:8080";

async fn register_and_login(client: &reqwest::Client, login_handle: &str) -> String {
    let register_response = client
        .post(format!("{}/v1/auth/register", API_BASE_URL))
        .json(&json!({"login_handle": login_handle, "password": "correct horse battery staple"}))
        .send()
        .await
        .expect("failed to call register");
    assert_eq!(register_response.status(), 201, "register should 201");

    let login_response = client
        .post(format!("{}/v1/auth/login", API_BASE_URL))
        .json(&json!({"login_handle": login_handle, "password": "correct horse battery staple"}))
        .send()
        .await
        .expect("failed to call login");
    assert_eq!(login_response.status(), 200, "login should 200");

    let body: serde_json::Value = login_response.json().await.expect("failed to parse login response");
    body["refresh_token"].as_str().expect("login response missing refresh_token").to_string()
}

#[tokio::test]
#[ignore] // requires a running `maieutic-api` server (`cargo run -p maieutic-api`)
async fn test_full_specification_workflow() {
    let client = reqwest::Client::new();

    println!("🧪 Testing full specification-gathering workflow...");

    println!("\n🔑 Step 1: Registering and logging in...");
    let token = register_and_login(&client, &format!("testuser-{}", uuid::Uuid::new_v4())).await;
    println!("✅ Authenticated, refresh token issued");

    println!("\n📝 Step 2: Creating a project...");
    let create_response = client
        .post(format!("{}/v1/projects", API_BASE_URL))
        .bearer_auth(&token)
        .json(&json!({"name": "Order Routing Service", "description": "Replaces the legacy dispatcher"}))
        .send()
        .await
        .expect("failed to create project");
    assert_eq!(create_response.status(), 200, "create_project should 200 via the orchestrator outcome envelope");

    let create_body: serde_json::Value = create_response.json().await.expect("failed to parse create response");
    assert_eq!(create_body["success"], true);
    let project: Project = serde_json::from_value(create_body["data"].clone()).expect("failed to parse project from orchestrator data");
    println!("✅ Created project: {} ({})", project.name, project.id);

    println!("\n📋 Step 3: Listing projects...");
    let list_response = client
        .get(format!("{}/v1/projects", API_BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("failed to list projects");
    assert_eq!(list_response.status(), 200);
    let list_body: serde_json::Value = list_response.json().await.expect("failed to parse list response");
    let projects: Vec<Project> = serde_json::from_value(list_body["data"].clone()).expect("failed to parse project list");
    assert!(projects.iter().any(|p| p.id == project.id));
    println!("✅ Found {} project(s) for this owner", projects.len());

    println!("\n🗣️  Step 4: Starting a socratic session...");
    let session_response = client
        .post(format!("{}/v1/projects/{}/sessions", API_BASE_URL, project.id))
        .bearer_auth(&token)
        .json(&json!({"mode": "socratic"}))
        .send()
        .await
        .expect("failed to start session");
    assert_eq!(session_response.status(), 200);
    let session: Session = session_response.json().await.expect("failed to parse session");
    println!("✅ Started session: {}", session.id);

    println!("\n📖 Step 5: Extracting specifications from free text...");
    let extract_response = client
        .post(format!("{}/v1/projects/{}/extract", API_BASE_URL, project.id))
        .bearer_auth(&token)
        .json(&json!({"text": "We need to support at least 500 orders per minute, with a Postgres-backed queue."}))
        .send()
        .await
        .expect("failed to extract specifications");
    assert_eq!(extract_response.status(), 200);
    println!("✅ Extraction completed");

    println!("\n📈 Step 6: Checking coverage...");
    let coverage_response = client
        .get(format!("{}/v1/projects/{}/coverage", API_BASE_URL, project.id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("failed to fetch coverage");
    assert_eq!(coverage_response.status(), 200);
    let coverage_body: serde_json::Value = coverage_response.json().await.expect("failed to parse coverage response");
    println!("✅ Overall maturity: {}", coverage_body["data"]["overall_maturity"]);

    println!("\n📤 Step 7: Exporting the project as markdown...");
    let export_response = client
        .get(format!("{}/v1/projects/{}/export?format=markdown", API_BASE_URL, project.id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("failed to export project");
    assert_eq!(export_response.status(), 200);
    let export_text = export_response.text().await.expect("failed to read export body");
    assert!(export_text.contains("Order Routing Service"));
    println!("✅ Export contains the project name");

    println!("\n🚪 Step 8: Logging out...");
    let logout_response = client
        .post(format!("{}/v1/auth/logout", API_BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("failed to log out");
    assert_eq!(logout_response.status(), 204);
    println!("✅ Logged out, refresh token revoked");
}

#[tokio::test]
#[ignore]
async fn test_conflict_listing_for_fresh_project() {
    let client = reqwest::Client::new();

    println!("⚔️  Testing conflict listing on a fresh project...");
    let token = register_and_login(&client, &format!("testuser-{}", uuid::Uuid::new_v4())).await;

    let create_response = client
        .post(format!("{}/v1/projects", API_BASE_URL))
        .bearer_auth(&token)
        .json(&json!({"name": "Fresh Project"}))
        .send()
        .await
        .expect("failed to create project");
    let create_body: serde_json::Value = create_response.json().await.expect("failed to parse create response");
    let project: Project = serde_json::from_value(create_body["data"].clone()).expect("failed to parse project");

    let conflicts_response = client
        .get(format!("{}/v1/projects/{}/conflicts", API_BASE_URL, project.id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("failed to list conflicts");
    assert_eq!(conflicts_response.status(), 200);
    let body: serde_json::Value = conflicts_response.json().await.expect("failed to parse conflicts response");
    let conflicts: Vec<Conflict> = serde_json::from_value(body["data"].clone()).expect("failed to parse conflicts");
    assert!(conflicts.is_empty(), "a freshly created project should have no conflicts yet");
    println!("✅ No conflicts on a fresh project, as expected");
}

#[tokio::test]
#[ignore]
async fn test_health_endpoint() {
    let client = reqwest::Client::new();

    println!("🏥 Testing health endpoint...");
    let response = client
        .get(format!("{}/health", API_BASE_URL))
        .send()
        .await
        .expect("failed to call health endpoint");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("failed to parse response");
    println!("✅ Health check: {:?}", body);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
#[ignore]
async fn test_openapi_spec() {
    let client = reqwest::Client::new();

    println!("📖 Testing OpenAPI spec endpoint...");
    let response = client
        .get(format!("{}/api-doc/openapi.json", API_BASE_URL))
        .send()
        .await
        .expect("failed to get OpenAPI spec");

    assert_eq!(response.status(), 200);
    let spec: serde_json::Value = response.json().await.expect("failed to parse spec");
    println!("✅ OpenAPI spec title: {}", spec["info"]["title"]);
    assert_eq!(spec["info"]["title"], "Maieutic API");
}
