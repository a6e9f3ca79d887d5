mod common;

use common::TestApp;
use serde_json::json;

const ENROLL_OTHER: &str = r#"
    mutation($course: ID!, $employee: ID) { enroll(courseId: $course, employeeId: $employee) { id } }
"#;

const LIST: &str = r#"
    query($unread: Boolean) { notifications(unreadOnly: $unread) { id title isRead link } }
"#;

/// Two enrollments by the manager leave the trainee two unread notifications.
async fn app_with_two_notifications() -> TestApp {
    let app = TestApp::new().await;
    let trainee = app.employee_id("trainee");
    for title in ["Workplace Safety Basics", "Effective Customer Calls"] {
        let course = app.seeded.course_titled(title).unwrap().id.to_string();
        app.ok("manager", ENROLL_OTHER, json!({ "course": course, "employee": trainee }))
            .await;
    }
    app
}

#[tokio::test]
async fn notifications_belong_to_their_recipient() {
    let app = app_with_two_notifications().await;
    let data = app.ok("trainee", LIST, json!({})).await;
    let rows = data["notifications"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|n| n["isRead"] == false));
    assert!(rows[0]["link"].as_str().unwrap().starts_with("/learning/"));

    let data = app.ok("manager", LIST, json!({})).await;
    assert_eq!(data["notifications"].as_array().unwrap().len(), 0);

    let code = app
        .error_code(
            "manager",
            "mutation($id: ID!) { markNotificationRead(id: $id) { id } }",
            json!({ "id": rows[0]["id"] }),
        )
        .await;
    assert_eq!(code, "NOT_FOUND");
}

#[tokio::test]
async fn marking_read_one_then_all() {
    let app = app_with_two_notifications().await;
    let data = app.ok("trainee", LIST, json!({})).await;
    let first = data["notifications"][0]["id"].clone();

    let data = app
        .ok(
            "trainee",
            "mutation($id: ID!) { markNotificationRead(id: $id) { id isRead } }",
            json!({ "id": first }),
        )
        .await;
    assert_eq!(data["markNotificationRead"]["isRead"], true);

    let unread = app.ok("trainee", LIST, json!({ "unread": true })).await;
    assert_eq!(unread["notifications"].as_array().unwrap().len(), 1);

    let data = app
        .ok("trainee", "mutation { markAllNotificationsRead }", json!({}))
        .await;
    assert_eq!(data["markAllNotificationsRead"], 1);

    let unread = app.ok("trainee", LIST, json!({ "unread": true })).await;
    assert_eq!(unread["notifications"].as_array().unwrap().len(), 0);
    let data = app
        .ok("trainee", "mutation { markAllNotificationsRead }", json!({}))
        .await;
    assert_eq!(data["markAllNotificationsRead"], 0);
}
