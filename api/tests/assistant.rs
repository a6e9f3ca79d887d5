mod common;

use common::{TestApp, first_error_code};
use platform_genai::CannedClient;
use serde_json::json;

const CHAT: &str = r#"
    mutation($message: String!, $history: [ChatTurnInput!]) {
        chatbotReply(message: $message, history: $history) { reply }
    }
"#;

const COMPARE: &str = r#"
    mutation($a: String!, $b: String!) {
        compareFaces(referencePhoto: $a, candidatePhoto: $b) { isMatch confidence reasoning }
    }
"#;

const SUGGEST: &str = r#"
    query($id: ID!, $skills: [String!]) {
        suggestRole(employeeId: $id, skills: $skills) { suggestedRole confidence reasoning }
    }
"#;

const PHOTO: &str = "data:image/jpeg;base64,aGVsbG8=";

#[tokio::test]
async fn chatbot_answers_with_or_without_history() {
    let client = CannedClient::new().with_reply(
        "chatbotReply",
        "```json\n{\"reply\":\"You have 12 days of annual leave left.\"}\n```",
    );
    let app = TestApp::with_client(client).await;

    let data = app
        .ok("employee", CHAT, json!({ "message": "How much leave do I have?", "history": null }))
        .await;
    assert_eq!(data["chatbotReply"]["reply"], "You have 12 days of annual leave left.");

    let data = app
        .ok(
            "employee",
            CHAT,
            json!({
                "message": "And sick leave?",
                "history": [
                    { "role": "USER", "content": "How much leave do I have?" },
                    { "role": "ASSISTANT", "content": "You have 12 days of annual leave left." }
                ]
            }),
        )
        .await;
    assert!(data["chatbotReply"]["reply"].is_string());
    assert_eq!(app.genai.calls(), 2);

    let response = app.exec_as(None, CHAT, json!({ "message": "hi" })).await;
    assert_eq!(first_error_code(&response), "UNAUTHENTICATED");
}

#[tokio::test]
async fn chatbot_failures_surface_as_ai_errors() {
    let app = TestApp::new().await;
    let code = app
        .error_code("employee", CHAT, json!({ "message": "hello" }))
        .await;
    assert_eq!(code, "AI_SERVICE");

    let code = app.error_code("employee", CHAT, json!({ "message": "   " })).await;
    assert_eq!(code, "VALIDATION");
}

#[tokio::test]
async fn compare_faces_is_for_hr() {
    let client = CannedClient::new().with_reply(
        "compareFaces",
        r#"{"isMatch":true,"confidence":0.88,"reasoning":"matching features"}"#,
    );
    let app = TestApp::with_client(client).await;

    let data = app.ok("hr", COMPARE, json!({ "a": PHOTO, "b": PHOTO })).await;
    assert_eq!(data["compareFaces"]["isMatch"], true);
    assert_eq!(data["compareFaces"]["confidence"], 0.88);

    let code = app
        .error_code("employee", COMPARE, json!({ "a": PHOTO, "b": PHOTO }))
        .await;
    assert_eq!(code, "FORBIDDEN");

    let code = app
        .error_code("hr", COMPARE, json!({ "a": PHOTO, "b": "data:text/plain;base64,aGk=" }))
        .await;
    assert_eq!(code, "VALIDATION");
    assert_eq!(app.genai.calls(), 1);
}

#[tokio::test]
async fn role_suggestions_for_managers_and_hr() {
    let client = CannedClient::new().with_reply(
        "suggestRole",
        r#"{"suggestedRole":"Engineering Manager","confidence":0.7,"reasoning":"leads reviews"}"#,
    );
    let app = TestApp::with_client(client).await;
    let employee = app.employee_id("employee");

    let data = app
        .ok("manager", SUGGEST, json!({ "id": employee, "skills": null }))
        .await;
    assert_eq!(data["suggestRole"]["suggestedRole"], "Engineering Manager");

    let data = app
        .ok("hr", SUGGEST, json!({ "id": employee, "skills": ["mentoring", " "] }))
        .await;
    assert_eq!(data["suggestRole"]["confidence"], 0.7);

    let code = app
        .error_code("employee", SUGGEST, json!({ "id": employee }))
        .await;
    assert_eq!(code, "FORBIDDEN");

    let code = app
        .error_code("hr", SUGGEST, json!({ "id": uuid::Uuid::new_v4().to_string() }))
        .await;
    assert_eq!(code, "NOT_FOUND");
}
