mod common;

use common::TestApp;
use serde_json::json;

const SUBMIT: &str = r#"
    mutation($input: LeaveRequestInput!) {
        submitLeaveRequest(input: $input) { id employeeId days status }
    }
"#;

const DECIDE: &str = r#"
    mutation($id: ID!, $approve: Boolean!) {
        decideLeaveRequest(id: $id, approve: $approve, note: "enjoy") {
            status decisionNote decidedAt
        }
    }
"#;

fn week_of_march(start: &str, end: &str) -> serde_json::Value {
    json!({ "input": { "leaveType": "ANNUAL", "startDate": start, "endDate": end, "reason": "trip" } })
}

#[tokio::test]
async fn approved_leave_notifies_the_employee() {
    let app = TestApp::new().await;
    let submitted = app
        .ok("employee", SUBMIT, week_of_march("2024-03-04", "2024-03-10"))
        .await;
    let request = &submitted["submitLeaveRequest"];
    assert_eq!(request["employeeId"], app.employee_id("employee").as_str());
    // Saturday and Sunday are not counted
    assert_eq!(request["days"], 5);
    assert_eq!(request["status"], "PENDING");

    let decided = app
        .ok(
            "manager",
            DECIDE,
            json!({ "id": request["id"], "approve": true }),
        )
        .await;
    assert_eq!(decided["decideLeaveRequest"]["status"], "APPROVED");
    assert_eq!(decided["decideLeaveRequest"]["decisionNote"], "enjoy");
    assert!(decided["decideLeaveRequest"]["decidedAt"].is_string());

    let inbox = app
        .ok("employee", "{ notifications(unreadOnly: true) { title body isRead } }", json!({}))
        .await;
    let items = inbox["notifications"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Leave request decided");
    assert!(items[0]["body"].as_str().unwrap().contains("approved"));

    let code = app
        .error_code(
            "hr",
            DECIDE,
            json!({ "id": request["id"], "approve": false }),
        )
        .await;
    assert_eq!(code, "CONFLICT");
}

#[tokio::test]
async fn overlapping_open_requests_conflict() {
    let app = TestApp::new().await;
    app.ok("employee", SUBMIT, week_of_march("2024-03-04", "2024-03-08"))
        .await;
    let code = app
        .error_code("employee", SUBMIT, week_of_march("2024-03-08", "2024-03-12"))
        .await;
    assert_eq!(code, "CONFLICT");

    // adjacent ranges are fine
    app.ok("employee", SUBMIT, week_of_march("2024-03-11", "2024-03-12"))
        .await;
}

#[tokio::test]
async fn reversed_dates_are_rejected() {
    let app = TestApp::new().await;
    let code = app
        .error_code("employee", SUBMIT, week_of_march("2024-03-08", "2024-03-04"))
        .await;
    assert_eq!(code, "VALIDATION");
}

#[tokio::test]
async fn deciders_cannot_decide_their_own_request() {
    let app = TestApp::new().await;
    let submitted = app
        .ok("manager", SUBMIT, week_of_march("2024-03-04", "2024-03-05"))
        .await;
    let id = submitted["submitLeaveRequest"]["id"].clone();
    let code = app
        .error_code("manager", DECIDE, json!({ "id": id, "approve": true }))
        .await;
    assert_eq!(code, "FORBIDDEN");

    let code = app
        .error_code("employee", DECIDE, json!({ "id": id, "approve": true }))
        .await;
    assert_eq!(code, "FORBIDDEN");
}

#[tokio::test]
async fn employees_only_list_their_own_requests() {
    let app = TestApp::new().await;
    app.ok("employee", SUBMIT, week_of_march("2024-03-04", "2024-03-05"))
        .await;
    app.ok("trainee", SUBMIT, week_of_march("2024-03-04", "2024-03-05"))
        .await;

    let mine = app
        .ok("employee", "{ leaveRequests { employeeId } }", json!({}))
        .await;
    let mine = mine["leaveRequests"].as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["employeeId"], app.employee_id("employee").as_str());

    let all = app
        .ok("hr", "{ leaveRequests(status: PENDING) { id } }", json!({}))
        .await;
    assert_eq!(all["leaveRequests"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn cancelling_frees_the_dates() {
    let app = TestApp::new().await;
    let submitted = app
        .ok("employee", SUBMIT, week_of_march("2024-03-04", "2024-03-05"))
        .await;
    let id = submitted["submitLeaveRequest"]["id"].clone();
    let cancelled = app
        .ok(
            "employee",
            "mutation($id: ID!) { cancelLeaveRequest(id: $id) { status } }",
            json!({ "id": id }),
        )
        .await;
    assert_eq!(cancelled["cancelLeaveRequest"]["status"], "CANCELLED");
    app.ok("employee", SUBMIT, week_of_march("2024-03-04", "2024-03-05"))
        .await;
}
