//! RBAC Workflow End-to-End Test
//!
//! Exercises the role and permission endpoints over a real HTTP server with
//! a migrated SQLite database:
//! 1. The seeded permission catalog
//! 2. Role CRUD with permission attachment and pagination metadata
//! 3. System role protection
//! 4. Tenant scoping of every role operation
//! 5. Role assignment, resolved user permissions and idempotency
//! 6. Permission guards on the management routes
//! 7. Deletion guards for roles with assigned users
//! 8. Validation and duplicate-name conflicts

use anyhow::Result;
use axum::http::StatusCode;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::{net::SocketAddr, time::Duration};
use tempfile::TempDir;
use tokio::net::TcpListener;

use vigil_auth::PasswordHasher;
use vigil_config::VigilConfig;
use vigil_interfaces::NewUser;
use vigil_rest_api::{create_app, AppConfig, AppContext};
use vigil_server::ServiceContainer;

const TEST_SECRET: &str = "integration-test-signing-secret-0123456789";

struct TestServer {
    addr: SocketAddr,
    client: Client,
    context: AppContext,
    _temp_dir: TempDir,
}

struct Session {
    access_token: String,
    user_id: i32,
    organization_id: i32,
}

fn init_quiet_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_target(false)
            .without_time()
            .try_init();
    });
}

async fn setup_test_server() -> Result<TestServer> {
    init_quiet_logging();

    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("vigil-test.db");

    let mut config = VigilConfig::default();
    config.auth.signing_secret = TEST_SECRET.to_string();
    config.database.url = format!("sqlite://{}?mode=rwc", db_path.display());
    config.database.max_connections = 5;
    config.rate_limit.enabled = false;

    let services = ServiceContainer::new(&config).await?;
    let context = services.rest_context();

    let app = create_app(
        context.clone(),
        AppConfig {
            cors: None,
            rate_limits: None,
            ..AppConfig::default()
        },
    );

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        {
            eprintln!("Test server error: {}", e);
        }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    Ok(TestServer {
        addr,
        client: Client::builder().timeout(Duration::from_secs(10)).build()?,
        context,
        _temp_dir: temp_dir,
    })
}

impl TestServer {
    async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let url = format!("http://{}/api/v1{}", self.addr, path);

        let mut request = self.client.request(method, &url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        Ok((status, body))
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, path, token, None).await
    }

    async fn post(
        &self,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, path, token, Some(body)).await
    }

    async fn patch(
        &self,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> Result<(StatusCode, Value)> {
        self.request(Method::PATCH, path, token, Some(body)).await
    }

    async fn delete(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, path, token, None).await
    }

    /// Register a fresh organization and return the admin session
    async fn register_admin(&self, email: &str, organization: &str) -> Result<Session> {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                json!({
                    "email": email,
                    "password": "a sufficiently long password",
                    "organizationName": organization,
                }),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED, "registration should succeed: {body}");
        Ok(session_from(&body))
    }

    /// Seed a user into an existing organization, bypassing registration
    async fn seed_user(&self, organization_id: i32, email: &str, password: &str) -> Result<i32> {
        let hash = PasswordHasher::with_cost(4).hash(password)?;
        let user = self
            .context
            .repositories
            .user_repository()
            .create(
                organization_id,
                NewUser {
                    email: email.to_string(),
                    password_hash: hash,
                },
            )
            .await?;
        Ok(user.id)
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let (status, body) = self
            .post(
                "/auth/login",
                None,
                json!({ "email": email, "password": password }),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "login should succeed: {body}");
        Ok(session_from(&body))
    }

    /// Resolve a catalog permission name to its seeded id
    async fn permission_id(&self, token: &str, name: &str) -> Result<i64> {
        let (status, body) = self.get("/permissions", Some(token)).await?;
        assert_eq!(status, StatusCode::OK);
        let id = body["data"]
            .as_array()
            .expect("permission list")
            .iter()
            .find(|p| p["name"] == name)
            .unwrap_or_else(|| panic!("permission {name} should be seeded"))["id"]
            .as_str()
            .expect("permission id")
            .parse()?;
        Ok(id)
    }

    /// Find a role id by name in the caller's organization
    async fn role_id(&self, token: &str, name: &str) -> Result<i64> {
        let (status, body) = self.get("/roles", Some(token)).await?;
        assert_eq!(status, StatusCode::OK);
        let id = body["data"]
            .as_array()
            .expect("role list")
            .iter()
            .find(|r| r["name"] == name)
            .unwrap_or_else(|| panic!("role {name} should exist"))["id"]
            .as_str()
            .expect("role id")
            .parse()?;
        Ok(id)
    }
}

fn session_from(body: &Value) -> Session {
    Session {
        access_token: body["data"]["accessToken"].as_str().expect("access token").to_string(),
        user_id: body["data"]["user"]["user"]["id"]
            .as_str()
            .expect("user id")
            .parse()
            .expect("numeric user id"),
        organization_id: body["data"]["user"]["user"]["organizationId"]
            .as_str()
            .expect("organization id")
            .parse()
            .expect("numeric organization id"),
    }
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("<missing>")
}

/// Test 1: The global permission catalog is migration-seeded
#[tokio::test]
async fn test_permission_catalog_is_seeded() -> Result<()> {
    let server = setup_test_server().await?;
    let admin = server.register_admin("ops@acme.example", "Acme").await?;

    println!("🧪 Testing the seeded permission catalog...");

    let (status, body) = server.get("/permissions", Some(&admin.access_token)).await?;
    assert_eq!(status, StatusCode::OK);

    let permissions = body["data"].as_array().expect("permission list");
    assert_eq!(permissions.len(), 15, "the catalog holds fifteen permissions");

    let names: Vec<&str> = permissions.iter().filter_map(|p| p["name"].as_str()).collect();
    for expected in ["containers:read", "incidents:operate", "roles:manage", "api-keys:manage", "organization:manage"] {
        assert!(names.contains(&expected), "catalog should contain {expected}");
    }

    let containers_read = permissions.iter().find(|p| p["name"] == "containers:read").unwrap();
    assert_eq!(containers_read["resource"], "containers");
    assert_eq!(containers_read["action"], "read");

    // The catalog requires authentication
    let (status, _) = server.get("/permissions", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    println!("✅ Permission catalog is seeded and guarded");
    Ok(())
}

/// Test 2: Role CRUD against the caller's organization
#[tokio::test]
async fn test_role_crud_workflow() -> Result<()> {
    let server = setup_test_server().await?;
    let admin = server.register_admin("ops@acme.example", "Acme").await?;

    println!("🧪 Testing role CRUD...");

    let read_id = server.permission_id(&admin.access_token, "containers:read").await?;
    let operate_id = server.permission_id(&admin.access_token, "containers:operate").await?;

    let (status, body) = server
        .post(
            "/roles",
            Some(&admin.access_token),
            json!({
                "name": "Deploy Bot",
                "description": "Rolls deployments forward and back",
                "permissionIds": [read_id, operate_id],
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "role creation should succeed: {body}");
    assert_eq!(body["data"]["name"], "Deploy Bot");
    assert_eq!(body["data"]["isSystemRole"], false);
    assert_eq!(body["data"]["permissions"].as_array().unwrap().len(), 2);
    let role_id: i64 = body["data"]["id"].as_str().unwrap().parse()?;

    // Listing shows the three system roles plus the new one
    let (status, body) = server.get("/roles", Some(&admin.access_token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 4);
    assert_eq!(body["meta"]["pagination"]["total"], 4);

    let (status, body) = server
        .get(&format!("/roles/{role_id}"), Some(&admin.access_token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Deploy Bot");

    // Updates replace the permission set when one is supplied
    let roles_read_id = server.permission_id(&admin.access_token, "roles:read").await?;
    let (status, body) = server
        .patch(
            &format!("/roles/{role_id}"),
            Some(&admin.access_token),
            json!({
                "name": "Release Bot",
                "permissionIds": [roles_read_id],
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "role update should succeed: {body}");
    assert_eq!(body["data"]["name"], "Release Bot");
    let updated: Vec<&str> = body["data"]["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert_eq!(updated, vec!["roles:read"]);

    let (status, _) = server
        .delete(&format!("/roles/{role_id}"), Some(&admin.access_token))
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = server
        .get(&format!("/roles/{role_id}"), Some(&admin.access_token))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");

    println!("✅ Role CRUD works end to end");
    Ok(())
}

/// Test 3: System roles refuse updates and deletion
#[tokio::test]
async fn test_system_roles_are_protected() -> Result<()> {
    let server = setup_test_server().await?;
    let admin = server.register_admin("ops@acme.example", "Acme").await?;

    let admin_role_id = server.role_id(&admin.access_token, "Admin").await?;

    let (status, body) = server
        .patch(
            &format!("/roles/{admin_role_id}"),
            Some(&admin.access_token),
            json!({ "name": "Weakened Admin" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "SYSTEM_ROLE_PROTECTED");

    let (status, body) = server
        .delete(&format!("/roles/{admin_role_id}"), Some(&admin.access_token))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "SYSTEM_ROLE_PROTECTED");
    Ok(())
}

/// Test 4: Every role operation is scoped to the caller's tenant
#[tokio::test]
async fn test_role_operations_are_tenant_scoped() -> Result<()> {
    let server = setup_test_server().await?;
    let admin_a = server.register_admin("ops@acme.example", "Acme").await?;
    let admin_b = server.register_admin("ops@umbrella.example", "Umbrella").await?;

    println!("🧪 Testing tenant scoping...");

    let read_id = server.permission_id(&admin_a.access_token, "containers:read").await?;
    let (status, body) = server
        .post(
            "/roles",
            Some(&admin_a.access_token),
            json!({ "name": "Acme Only", "permissionIds": [read_id] }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let acme_role_id: i64 = body["data"]["id"].as_str().unwrap().parse()?;

    // The foreign tenant reads it as absent, not forbidden
    let (status, body) = server
        .get(&format!("/roles/{acme_role_id}"), Some(&admin_b.access_token))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");

    let (status, _) = server
        .patch(
            &format!("/roles/{acme_role_id}"),
            Some(&admin_b.access_token),
            json!({ "name": "Stolen" }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .delete(&format!("/roles/{acme_role_id}"), Some(&admin_b.access_token))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The organization-scoped listing rejects a foreign org id outright
    let (status, body) = server
        .get(
            &format!("/orgs/{}/roles", admin_a.organization_id),
            Some(&admin_b.access_token),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "CROSS_TENANT_ACCESS_DENIED");

    // The caller's own organization id is accepted
    let (status, body) = server
        .get(
            &format!("/orgs/{}/roles", admin_b.organization_id),
            Some(&admin_b.access_token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"].as_array().unwrap().len(),
        3,
        "a fresh organization carries exactly the system roles"
    );

    // Assigning an Acme role to an Acme user is out of reach for Umbrella
    let (status, body) = server
        .post(
            &format!("/users/{}/roles/{}", admin_a.user_id, acme_role_id),
            Some(&admin_b.access_token),
            json!({}),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "foreign roles are invisible: {body}");

    println!("✅ Tenant scoping holds on every role operation");
    Ok(())
}

/// Test 5: Assignment grants permissions, removal takes them back
#[tokio::test]
async fn test_role_assignment_grants_permissions() -> Result<()> {
    let server = setup_test_server().await?;
    let admin = server.register_admin("ops@acme.example", "Acme").await?;

    println!("🧪 Testing role assignment...");

    let dev_id = server
        .seed_user(admin.organization_id, "dev@acme.example", "a second user password")
        .await?;
    let dev = server.login("dev@acme.example", "a second user password").await?;

    // A freshly seeded user has no roles and no permissions
    let (status, body) = server.get("/auth/me", Some(&dev.access_token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["roles"], json!([]));
    assert_eq!(body["data"]["permissions"], json!([]));

    let operator_id = server.role_id(&admin.access_token, "Operator").await?;

    let (status, body) = server
        .post(
            &format!("/users/{dev_id}/roles/{operator_id}"),
            Some(&admin.access_token),
            json!({}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["assigned"], true);

    // Idempotent: a second assignment reports nothing new
    let (status, body) = server
        .post(
            &format!("/users/{dev_id}/roles/{operator_id}"),
            Some(&admin.access_token),
            json!({}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["assigned"], false);

    let (status, body) = server
        .get(&format!("/users/{dev_id}/permissions"), Some(&admin.access_token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userId"], dev_id);
    let permissions = body["data"]["permissions"].as_array().unwrap();
    assert!(permissions.contains(&json!("containers:operate")));
    assert!(
        !permissions.contains(&json!("roles:manage")),
        "operator must not gain role management"
    );

    // A fresh login reflects the assignment in the token claims
    let dev = server.login("dev@acme.example", "a second user password").await?;
    let (status, body) = server.get("/auth/me", Some(&dev.access_token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["roles"], json!(["Operator"]));

    let (status, body) = server
        .delete(
            &format!("/users/{dev_id}/roles/{operator_id}"),
            Some(&admin.access_token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], true);

    let (status, body) = server
        .delete(
            &format!("/users/{dev_id}/roles/{operator_id}"),
            Some(&admin.access_token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], false);

    let (status, body) = server
        .get(&format!("/users/{dev_id}/permissions"), Some(&admin.access_token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["permissions"], json!([]));

    println!("✅ Assignment and removal resolve into permissions");
    Ok(())
}

/// Test 6: Management routes demand their permissions
#[tokio::test]
async fn test_management_routes_demand_permissions() -> Result<()> {
    let server = setup_test_server().await?;
    let admin = server.register_admin("ops@acme.example", "Acme").await?;

    let dev_id = server
        .seed_user(admin.organization_id, "dev@acme.example", "a second user password")
        .await?;
    let dev = server.login("dev@acme.example", "a second user password").await?;
    let operator_id = server.role_id(&admin.access_token, "Operator").await?;

    // Without roles:read the listing is forbidden
    let (status, body) = server.get("/roles", Some(&dev.access_token)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "INSUFFICIENT_PERMISSIONS");

    // Without roles:manage no role can be created
    let (status, body) = server
        .post(
            "/roles",
            Some(&dev.access_token),
            json!({ "name": "Sneaky", "permissionIds": [1] }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "INSUFFICIENT_PERMISSIONS");

    // Without users:manage nobody can hand out roles, even to themselves
    let (status, body) = server
        .post(
            &format!("/users/{dev_id}/roles/{operator_id}"),
            Some(&dev.access_token),
            json!({}),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "INSUFFICIENT_PERMISSIONS");

    // Without users:read resolved permissions stay private
    let (status, body) = server
        .get(&format!("/users/{}/permissions", admin.user_id), Some(&dev.access_token))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "INSUFFICIENT_PERMISSIONS");
    Ok(())
}

/// Test 7: Roles with assigned users refuse deletion
#[tokio::test]
async fn test_role_with_assignments_cannot_be_deleted() -> Result<()> {
    let server = setup_test_server().await?;
    let admin = server.register_admin("ops@acme.example", "Acme").await?;

    let read_id = server.permission_id(&admin.access_token, "containers:read").await?;
    let (_, body) = server
        .post(
            "/roles",
            Some(&admin.access_token),
            json!({ "name": "Deploy Bot", "permissionIds": [read_id] }),
        )
        .await?;
    let role_id: i64 = body["data"]["id"].as_str().unwrap().parse()?;

    let (status, _) = server
        .post(
            &format!("/users/{}/roles/{role_id}", admin.user_id),
            Some(&admin.access_token),
            json!({}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .delete(&format!("/roles/{role_id}"), Some(&admin.access_token))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "ROLE_HAS_ASSIGNED_USERS");

    // Removing the assignment unblocks the delete
    let (status, _) = server
        .delete(
            &format!("/users/{}/roles/{role_id}", admin.user_id),
            Some(&admin.access_token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .delete(&format!("/roles/{role_id}"), Some(&admin.access_token))
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    Ok(())
}

/// Test 8: Validation and duplicate names
#[tokio::test]
async fn test_role_validation_and_duplicates() -> Result<()> {
    let server = setup_test_server().await?;
    let admin = server.register_admin("ops@acme.example", "Acme").await?;

    // A role without permissions is rejected
    let (status, body) = server
        .post(
            "/roles",
            Some(&admin.access_token),
            json!({ "name": "Empty Role", "permissionIds": [] }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");

    // Unknown permission ids are named in the rejection
    let (status, body) = server
        .post(
            "/roles",
            Some(&admin.access_token),
            json!({ "name": "Phantom Role", "permissionIds": [99999] }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
    assert!(
        body["error"]["message"].as_str().unwrap().contains("99999"),
        "rejection should name the unknown id"
    );

    // Role names are unique within the organization, system roles included
    let read_id = server.permission_id(&admin.access_token, "containers:read").await?;
    let (status, _) = server
        .post(
            "/roles",
            Some(&admin.access_token),
            json!({ "name": "Deploy Bot", "permissionIds": [read_id] }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    for taken in ["Deploy Bot", "Admin"] {
        let (status, body) = server
            .post(
                "/roles",
                Some(&admin.access_token),
                json!({ "name": taken, "permissionIds": [read_id] }),
            )
            .await?;
        assert_eq!(status, StatusCode::CONFLICT, "{taken} is already taken: {body}");
        assert_eq!(error_code(&body), "DUPLICATE_RESOURCE");
    }
    Ok(())
}
