mod common;

use common::TestApp;
use platform_genai::CannedClient;
use serde_json::json;

const SUBMIT_TYPING: &str = r#"
    mutation($typed: String!, $elapsed: Float!) {
        submitTypingTest(promptId: "policy", typed: $typed, elapsedSeconds: $elapsed) {
            employeeId kind score wpm accuracy details
        }
    }
"#;

#[tokio::test]
async fn verbatim_typing_scores_full_accuracy() {
    let app = TestApp::new().await;
    let prompt = app
        .ok("trainee", r#"{ typingPrompt(id: "policy") { id text timeLimitSeconds } }"#, json!({}))
        .await;
    let text = prompt["typingPrompt"]["text"].as_str().unwrap().to_string();
    assert_eq!(prompt["typingPrompt"]["timeLimitSeconds"], 60);

    let data = app
        .ok("trainee", SUBMIT_TYPING, json!({ "typed": text, "elapsed": 30.0 }))
        .await;
    let result = &data["submitTypingTest"];
    assert_eq!(result["kind"], "TYPING");
    assert_eq!(result["employeeId"], app.employee_id("trainee").as_str());
    assert_eq!(result["accuracy"], 100);
    assert_eq!(result["score"], 100);
    assert!(result["wpm"].as_i64().unwrap() > 0);
    assert_eq!(result["details"]["promptId"], "policy");

    let own = app
        .ok("trainee", "{ assessments(kind: TYPING) { accuracy } }", json!({}))
        .await;
    assert_eq!(own["assessments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_prompt_and_negative_time_are_rejected() {
    let app = TestApp::new().await;
    let code = app
        .error_code(
            "trainee",
            r#"mutation { submitTypingTest(promptId: "nope", typed: "x", elapsedSeconds: 1.0) { id } }"#,
            json!({}),
        )
        .await;
    assert_eq!(code, "NOT_FOUND");

    let code = app
        .error_code("trainee", SUBMIT_TYPING, json!({ "typed": "All", "elapsed": -1.0 }))
        .await;
    assert_eq!(code, "VALIDATION");
}

#[tokio::test]
async fn call_quality_is_recorded_by_qa() {
    let client = CannedClient::new().with_reply(
        "evaluateCallQuality",
        r#"{"score":82,"summary":"Polite and accurate.","strengths":["greeting"],"improvements":["closing"]}"#,
    );
    let app = TestApp::with_client(client).await;
    let trainee = app.employee_id("trainee");
    let query = r#"
        mutation($emp: ID!) {
            evaluateCallQuality(employeeId: $emp, transcript: "Agent: Hello, how can I help?") {
                kind score details assessedBy
            }
        }
    "#;

    let code = app
        .error_code("manager", query, json!({ "emp": trainee }))
        .await;
    assert_eq!(code, "FORBIDDEN");

    let data = app.ok("qa", query, json!({ "emp": trainee })).await;
    let result = &data["evaluateCallQuality"];
    assert_eq!(result["kind"], "QA_CALL");
    assert_eq!(result["score"], 82);
    assert_eq!(result["details"]["summary"], "Polite and accurate.");
    assert_eq!(result["details"]["improvements"][0], "closing");
    assert!(result["assessedBy"].is_string());

    let visible = app
        .ok(
            "manager",
            "query($emp: ID) { assessments(employeeId: $emp) { kind } }",
            json!({ "emp": trainee }),
        )
        .await;
    assert_eq!(visible["assessments"][0]["kind"], "QA_CALL");
}
