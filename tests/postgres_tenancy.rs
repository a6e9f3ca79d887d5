use std::sync::Arc;

use anyhow::Result;
use async_graphql::Request;
use migration::{Migrator, MigratorTrait};
use optitalent_api::{
    AppSchema,
    auth::{AuthConfig, CurrentUser, load_roles},
    build_schema,
    seed::{SeededRecords, seed_demo},
};
use optitalent_tests::{database_url, postgres_image};
use platform_db::{DatabaseSettings, connect};
use platform_genai::CannedClient;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use testcontainers::clients::Cli;

fn auth() -> Arc<AuthConfig> {
    Arc::new(AuthConfig {
        jwt_secret: "postgres-suite-secret-postgres-suite!".into(),
        session_ttl_minutes: 30,
        default_tenant_slug: "alpha".into(),
        secure_cookies: false,
    })
}

async fn principal(db: &DatabaseConnection, seeded: &SeededRecords, email: &str) -> CurrentUser {
    let user = seeded.user_email(email).unwrap();
    CurrentUser {
        user_id: user.id,
        tenant_id: user.tenant_id,
        employee_id: user.employee_id,
        roles: load_roles(db, user.id).await.unwrap(),
    }
}

async fn run(schema: &AppSchema, user: CurrentUser, query: &str, vars: Value) -> Value {
    let request = Request::new(query)
        .variables(async_graphql::Variables::from_json(vars))
        .data(user);
    serde_json::to_value(schema.0.execute(request).await).unwrap()
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn tenants_never_see_each_other() -> Result<()> {
    let docker = Cli::default();
    let container = docker.run(postgres_image());
    let url = database_url(container.get_host_port_ipv4(5432));
    let pool = connect(&DatabaseSettings::new(url)).await?;
    Migrator::up(&pool, None).await?;

    // both tenants reuse the same seeded emails
    let alpha = seed_demo(&pool, "alpha", "Alpha", "alpha-password").await?;
    let beta = seed_demo(&pool, "beta", "Beta", "beta-password").await?;
    let db = Arc::new(pool);
    let schema = build_schema(db.clone(), auth(), Arc::new(CannedClient::new()));

    let hr_alpha = principal(&db, &alpha, "hr@optitalent.test").await;
    let listed = run(&schema, hr_alpha.clone(), "{ employees { totalCount nodes { id } } }", json!({})).await;
    assert_eq!(listed["data"]["employees"]["totalCount"], 6);
    let alpha_ids: Vec<&str> = listed["data"]["employees"]["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    for employee in &beta.employees {
        assert!(!alpha_ids.contains(&employee.id.to_string().as_str()));
    }

    let foreign = beta.employees[0].id.to_string();
    let fetched = run(
        &schema,
        hr_alpha.clone(),
        "query($id: ID!) { employee(id: $id) { id } }",
        json!({ "id": foreign }),
    )
    .await;
    assert!(fetched["data"]["employee"].is_null());

    let updated = run(
        &schema,
        hr_alpha,
        "mutation($id: ID!) { updateEmployee(id: $id, input: { phone: \"555\" }) { id } }",
        json!({ "id": foreign }),
    )
    .await;
    assert_eq!(updated["errors"][0]["extensions"]["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn migrations_roll_back_and_reapply() -> Result<()> {
    let docker = Cli::default();
    let container = docker.run(postgres_image());
    let url = database_url(container.get_host_port_ipv4(5432));
    let pool = connect(&DatabaseSettings::new(url)).await?;

    Migrator::up(&pool, None).await?;
    assert!(Migrator::get_pending_migrations(&pool).await?.is_empty());
    Migrator::reset(&pool).await?;
    assert!(!Migrator::get_pending_migrations(&pool).await?.is_empty());
    Migrator::up(&pool, None).await?;
    seed_demo(&pool, "alpha", "Alpha", "alpha-password").await?;
    Ok(())
}
