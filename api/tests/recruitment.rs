mod common;

use common::TestApp;
use platform_genai::CannedClient;
use serde_json::{Value, json};

const CREATE_APPLICANT: &str = r#"
    mutation($input: NewApplicantInput!) {
        createApplicant(input: $input) { id fullName email position status aiScore aiSummary }
    }
"#;

const MOVE_APPLICANT: &str = r#"
    mutation($id: ID!, $status: ApplicantStage!) {
        updateApplicantStatus(id: $id, status: $status) { status }
    }
"#;

const SCORE_APPLICANT: &str = r#"
    mutation($id: ID!, $jd: String!) {
        scoreApplicant(id: $id, jobDescription: $jd) { aiScore aiSummary }
    }
"#;

fn applicant_input() -> Value {
    json!({ "input": {
        "fullName": "Ada Lovelace",
        "email": " Ada@Example.COM ",
        "position": "Software Engineer",
        "resumeText": "Ten years of analytical engine programming."
    }})
}

async fn create_applicant(app: &TestApp) -> Value {
    let data = app.ok("recruiter", CREATE_APPLICANT, applicant_input()).await;
    data["createApplicant"]["id"].clone()
}

#[tokio::test]
async fn recruiters_create_applicants_in_the_applied_stage() {
    let app = TestApp::new().await;
    let data = app.ok("recruiter", CREATE_APPLICANT, applicant_input()).await;
    let applicant = &data["createApplicant"];
    assert_eq!(applicant["email"], "ada@example.com");
    assert_eq!(applicant["status"], "APPLIED");
    assert!(applicant["aiScore"].is_null());

    let listed = app
        .ok("hr", "{ applicants { fullName status } }", json!({}))
        .await;
    assert_eq!(listed["applicants"][0]["fullName"], "Ada Lovelace");

    let code = app
        .error_code("employee", CREATE_APPLICANT, applicant_input())
        .await;
    assert_eq!(code, "FORBIDDEN");
    let code = app
        .error_code("employee", "{ applicants { id } }", json!({}))
        .await;
    assert_eq!(code, "FORBIDDEN");
}

#[tokio::test]
async fn stages_advance_one_step_or_reject() {
    let app = TestApp::new().await;
    let id = create_applicant(&app).await;

    let code = app
        .error_code("recruiter", MOVE_APPLICANT, json!({ "id": id, "status": "INTERVIEW" }))
        .await;
    assert_eq!(code, "CONFLICT");

    for stage in ["SCREENING", "INTERVIEW"] {
        let data = app
            .ok("recruiter", MOVE_APPLICANT, json!({ "id": id, "status": stage }))
            .await;
        assert_eq!(data["updateApplicantStatus"]["status"], stage);
    }

    let code = app
        .error_code("recruiter", MOVE_APPLICANT, json!({ "id": id, "status": "SCREENING" }))
        .await;
    assert_eq!(code, "CONFLICT");

    let data = app
        .ok("recruiter", MOVE_APPLICANT, json!({ "id": id, "status": "REJECTED" }))
        .await;
    assert_eq!(data["updateApplicantStatus"]["status"], "REJECTED");

    // rejected is final
    let code = app
        .error_code("recruiter", MOVE_APPLICANT, json!({ "id": id, "status": "OFFERED" }))
        .await;
    assert_eq!(code, "CONFLICT");
}

#[tokio::test]
async fn scoring_stores_the_model_verdict() {
    let client = CannedClient::new().with_reply(
        "scoreResume",
        r#"{"score":78,"summary":"Strong fundamentals, little web work.","strengths":["math"],"gaps":["http"]}"#,
    );
    let app = TestApp::with_client(client).await;
    let id = create_applicant(&app).await;

    let data = app
        .ok("recruiter", SCORE_APPLICANT, json!({ "id": id, "jd": "Backend engineer" }))
        .await;
    assert_eq!(data["scoreApplicant"]["aiScore"], 78);
    assert_eq!(
        data["scoreApplicant"]["aiSummary"],
        "Strong fundamentals, little web work."
    );

    let fetched = app
        .ok("hr", "query($id: ID!) { applicant(id: $id) { aiScore } }", json!({ "id": id }))
        .await;
    assert_eq!(fetched["applicant"]["aiScore"], 78);
}

#[tokio::test]
async fn failed_scoring_leaves_the_applicant_unscored() {
    let client = CannedClient::new().with_reply("scoreResume", r#"{"score":140,"summary":"x"}"#);
    let app = TestApp::with_client(client).await;
    let id = create_applicant(&app).await;

    let code = app
        .error_code("recruiter", SCORE_APPLICANT, json!({ "id": id, "jd": "Backend engineer" }))
        .await;
    assert_eq!(code, "AI_SERVICE");

    let fetched = app
        .ok(
            "recruiter",
            "query($id: ID!) { applicant(id: $id) { aiScore aiSummary } }",
            json!({ "id": id }),
        )
        .await;
    assert!(fetched["applicant"]["aiScore"].is_null());
    assert!(fetched["applicant"]["aiSummary"].is_null());
}

#[tokio::test]
async fn generated_hiring_material_comes_from_the_model() {
    let client = CannedClient::new()
        .with_reply(
            "generateJobDescription",
            r#"{"title":"Support Lead","summary":"Runs the support desk.","responsibilities":["Triage"],"requirements":["3 years support"]}"#,
        )
        .with_reply(
            "generateInterviewQuestions",
            r#"{"questions":[{"question":"Describe a hard escalation.","focus":"judgement"}]}"#,
        );
    let app = TestApp::with_client(client).await;

    let data = app
        .ok(
            "recruiter",
            r#"mutation { generateJobDescription(input: { title: "Support Lead", keySkills: null }) { title responsibilities } }"#,
            json!({}),
        )
        .await;
    assert_eq!(data["generateJobDescription"]["title"], "Support Lead");
    assert_eq!(data["generateJobDescription"]["responsibilities"][0], "Triage");

    let data = app
        .ok(
            "recruiter",
            r#"mutation { generateInterviewQuestions(role: "Support Lead", count: 1) { question focus } }"#,
            json!({}),
        )
        .await;
    assert_eq!(data["generateInterviewQuestions"][0]["focus"], "judgement");

    let code = app
        .error_code(
            "recruiter",
            r#"mutation { generateInterviewQuestions(role: "Support Lead", count: 21) { question } }"#,
            json!({}),
        )
        .await;
    assert_eq!(code, "VALIDATION");
}
