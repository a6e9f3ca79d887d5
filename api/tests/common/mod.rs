#![allow(dead_code)]

use std::sync::Arc;

use async_graphql::{EmptySubscription, Request, Schema, Variables};
use migration::{Migrator, MigratorTrait};
use optitalent_api::{
    AppSchema, MutationRoot, QueryRoot,
    auth::{AuthConfig, CurrentUser, load_roles},
    build_schema,
    seed::{SEED_EMAIL_DOMAIN, SeededRecords, seed_demo},
};
use platform_genai::CannedClient;
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;

pub const SEED_PASSWORD: &str = "demo-password";

pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub schema: Schema<QueryRoot, MutationRoot, EmptySubscription>,
    pub seeded: SeededRecords,
    pub genai: Arc<CannedClient>,
}

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret-test-secret-test-secret!".into(),
        session_ttl_minutes: 60,
        default_tenant_slug: "default".into(),
        secure_cookies: false,
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_client(CannedClient::new()).await
    }

    /// Seeded in-memory SQLite database with `client` answering AI flows.
    pub async fn with_client(client: CannedClient) -> Self {
        let conn = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&conn, None).await.unwrap();
        let seeded = seed_demo(&conn, "default", "Default", SEED_PASSWORD)
            .await
            .unwrap();
        let db = Arc::new(conn);
        let genai = Arc::new(client);
        let AppSchema(schema) = build_schema(db.clone(), Arc::new(auth_config()), genai.clone());
        Self {
            db,
            schema,
            seeded,
            genai,
        }
    }

    /// The seeded account `<local>@optitalent.test` as a request principal.
    pub async fn user(&self, local: &str) -> CurrentUser {
        let email = format!("{local}@{SEED_EMAIL_DOMAIN}");
        let user = self
            .seeded
            .user_email(&email)
            .unwrap_or_else(|| panic!("no seeded user {email}"));
        let roles = load_roles(self.db.as_ref(), user.id).await.unwrap();
        CurrentUser {
            user_id: user.id,
            tenant_id: user.tenant_id,
            employee_id: user.employee_id,
            roles,
        }
    }

    pub fn employee_id(&self, local: &str) -> String {
        let email = format!("{local}@{SEED_EMAIL_DOMAIN}");
        self.seeded
            .employee_email(&email)
            .unwrap_or_else(|| panic!("no seeded employee {email}"))
            .id
            .to_string()
    }

    /// Runs `query` as `user` and returns the whole response as JSON.
    pub async fn exec_as(&self, user: Option<CurrentUser>, query: &str, vars: Value) -> Value {
        let mut request = Request::new(query).variables(Variables::from_json(vars));
        if let Some(user) = user {
            request = request.data(user);
        }
        let response = self.schema.execute(request).await;
        serde_json::to_value(&response).unwrap()
    }

    /// Runs `query` as the seeded `local` account and expects success.
    pub async fn ok(&self, local: &str, query: &str, vars: Value) -> Value {
        let user = self.user(local).await;
        let response = self.exec_as(Some(user), query, vars).await;
        assert!(
            response.get("errors").is_none(),
            "unexpected errors: {response}"
        );
        response["data"].clone()
    }

    /// Runs `query` as the seeded `local` account and returns the first error code.
    pub async fn error_code(&self, local: &str, query: &str, vars: Value) -> String {
        let user = self.user(local).await;
        let response = self.exec_as(Some(user), query, vars).await;
        first_error_code(&response)
    }
}

pub fn first_error_code(response: &Value) -> String {
    response["errors"][0]["extensions"]["code"]
        .as_str()
        .unwrap_or_else(|| panic!("expected an error code: {response}"))
        .to_string()
}
