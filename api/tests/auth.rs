mod common;

use common::{SEED_PASSWORD, TestApp, auth_config, first_error_code};
use optitalent_api::auth::{authenticate, decode_token};
use serde_json::json;

const LOGIN: &str = r#"
    mutation($email: String!, $password: String!) {
        login(email: $email, password: $password) {
            ok token error user { email roles }
        }
    }
"#;

#[tokio::test]
async fn login_issues_a_token_for_the_stored_user() {
    let app = TestApp::new().await;
    let response = app
        .exec_as(
            None,
            LOGIN,
            json!({ "email": "HR@optitalent.test", "password": SEED_PASSWORD }),
        )
        .await;
    let payload = &response["data"]["login"];
    assert_eq!(payload["ok"], true);
    assert_eq!(payload["user"]["email"], "hr@optitalent.test");
    let roles: Vec<&str> = payload["user"]["roles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r.as_str().unwrap())
        .collect();
    assert!(roles.contains(&"HR"));
    assert!(roles.contains(&"EMPLOYEE"));

    let token = payload["token"].as_str().unwrap();
    let config = auth_config();
    let claims = decode_token(token, &config).unwrap();
    assert_eq!(claims.tid, app.seeded.tenant.id);
    let principal = authenticate(app.db.as_ref(), &config, token).await.unwrap();
    assert_eq!(principal.user_id, claims.sub);
}

#[tokio::test]
async fn wrong_password_is_reported_without_a_token() {
    let app = TestApp::new().await;
    for (email, password) in [
        ("hr@optitalent.test", "not-the-password"),
        ("ghost@optitalent.test", SEED_PASSWORD),
        ("not-an-email", SEED_PASSWORD),
    ] {
        let response = app
            .exec_as(None, LOGIN, json!({ "email": email, "password": password }))
            .await;
        let payload = &response["data"]["login"];
        assert_eq!(payload["ok"], false, "{email}");
        assert!(payload["token"].is_null());
        assert_eq!(payload["error"], "Invalid credentials");
    }
}

#[tokio::test]
async fn anonymous_requests_are_unauthenticated() {
    let app = TestApp::new().await;
    let response = app.exec_as(None, "{ me { email } }", json!({})).await;
    assert_eq!(first_error_code(&response), "UNAUTHENTICATED");

    let response = app
        .exec_as(None, "{ employees { totalCount } }", json!({}))
        .await;
    assert_eq!(first_error_code(&response), "UNAUTHENTICATED");
}

#[tokio::test]
async fn deactivated_users_lose_access() {
    let app = TestApp::new().await;
    let trainee = app.user("trainee").await;
    let config = auth_config();
    let token = optitalent_api::auth::issue_token(
        trainee.user_id,
        trainee.tenant_id,
        &trainee.roles,
        &config,
    )
    .unwrap();

    app.ok(
        "admin",
        "mutation($id: ID!) { setUserActive(id: $id, active: false) { isActive } }",
        json!({ "id": trainee.user_id.to_string() }),
    )
    .await;

    assert!(authenticate(app.db.as_ref(), &config, &token).await.is_err());
    let response = app
        .exec_as(
            None,
            LOGIN,
            json!({ "email": "trainee@optitalent.test", "password": SEED_PASSWORD }),
        )
        .await;
    assert_eq!(response["data"]["login"]["error"], "Account disabled");
}

#[tokio::test]
async fn tampered_tokens_are_refused() {
    let app = TestApp::new().await;
    let config = auth_config();
    let err = authenticate(app.db.as_ref(), &config, "not.a.jwt")
        .await
        .unwrap_err();
    assert_eq!(err.code().as_str(), "UNAUTHENTICATED");
}

const CREATE_USER: &str = r#"
    mutation($input: NewUserInput!) {
        createUser(input: $input) { id email displayName roles isActive }
    }
"#;

#[tokio::test]
async fn admins_create_users_who_can_log_in() {
    let app = TestApp::new().await;
    let input = json!({ "input": {
        "email": " New.Recruiter@OptiTalent.test ",
        "displayName": "Nia Recruiter",
        "password": "long-enough-1",
        "roles": ["RECRUITER", "EMPLOYEE", "RECRUITER"]
    }});
    let data = app.ok("admin", CREATE_USER, input.clone()).await;
    let user = &data["createUser"];
    assert_eq!(user["email"], "new.recruiter@optitalent.test");
    assert_eq!(user["isActive"], true);
    assert_eq!(user["roles"].as_array().unwrap().len(), 2);

    let response = app
        .exec_as(
            None,
            LOGIN,
            json!({ "email": "new.recruiter@optitalent.test", "password": "long-enough-1" }),
        )
        .await;
    assert_eq!(response["data"]["login"]["ok"], true);

    let code = app.error_code("admin", CREATE_USER, input).await;
    assert_eq!(code, "CONFLICT");
}

#[tokio::test]
async fn user_creation_rules() {
    let app = TestApp::new().await;
    let input = |email: &str, password: &str, roles: serde_json::Value| {
        json!({ "input": {
            "email": email,
            "displayName": "Someone",
            "password": password,
            "roles": roles
        }})
    };

    let code = app
        .error_code("hr", CREATE_USER, input("a@optitalent.test", "long-enough-1", json!(["EMPLOYEE"])))
        .await;
    assert_eq!(code, "FORBIDDEN");

    let code = app
        .error_code("admin", CREATE_USER, input("b@optitalent.test", "long-enough-1", json!(["SUPER_ADMIN"])))
        .await;
    assert_eq!(code, "FORBIDDEN");

    let code = app
        .error_code("admin", CREATE_USER, input("c@optitalent.test", "short", json!(["EMPLOYEE"])))
        .await;
    assert_eq!(code, "VALIDATION");

    let code = app
        .error_code("admin", CREATE_USER, input("d@optitalent.test", "long-enough-1", json!([])))
        .await;
    assert_eq!(code, "VALIDATION");

    app.ok("super", CREATE_USER, input("e@optitalent.test", "long-enough-1", json!(["SUPER_ADMIN"])))
        .await;
}
