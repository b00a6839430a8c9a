use axum::http::Method;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use crate::tests::helper;

#[tokio::test]
async fn test_delete_meeting() {
    let (mut app, _) = helper::setup_test_app().await;

    let admin_token = helper::login(&mut app).await;

    let meeting =
        helper::create_meeting(&mut app, &admin_token, json!({ "agenda": "Kick-off" })).await;
    let id = helper::get_id(&meeting).to_string();

    let (status_code, body) = helper::delete_meeting(&mut app, &admin_token, &id).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!("Meeting deleted successfully", body["message"]);
    assert_eq!(id, body["result"]["id"]);
    assert_eq!(true, body["result"]["deleted"]);

    // gone from the list
    assert!(helper::list_meetings(&mut app, &admin_token, "").await.is_empty());

    // still there by ID
    let (status_code, body) = helper::single_meeting(&mut app, &admin_token, &id).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(true, body["deleted"]);
    assert_eq!("Kick-off", body["agenda"]);

    let (status_code, body) =
        helper::delete_meeting(&mut app, &admin_token, &Uuid::new_v4().to_string()).await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
    assert_eq!("Meeting not found", helper::get_error_message(&body));

    let (status_code, body) = helper::delete_meeting(&mut app, &admin_token, "not-an-id").await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Failed to delete meeting", helper::get_error_message(&body));
}

#[tokio::test]
async fn test_delete_many_meetings() {
    let (mut app, _) = helper::setup_test_app().await;

    let admin_token = helper::login(&mut app).await;

    let first = helper::create_meeting(&mut app, &admin_token, json!({ "agenda": "One" })).await;
    let second = helper::create_meeting(&mut app, &admin_token, json!({ "agenda": "Two" })).await;

    let first_id = helper::get_id(&first);
    let second_id = helper::get_id(&second);

    let (status_code, body) = helper::call(
        &mut app,
        Method::POST,
        "/api/meetings/delete-many",
        &admin_token,
        Some(json!([first_id, Uuid::new_v4()])),
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!("Meetings deleted successfully", body["message"]);
    assert_eq!(1, body["deletedCount"]);

    let meetings = helper::list_meetings(&mut app, &admin_token, "").await;
    assert_eq!(vec![second_id], helper::ids(&meetings));

    // already deleted meetings are not counted again
    let (status_code, body) = helper::call(
        &mut app,
        Method::POST,
        "/api/meetings/delete-many",
        &admin_token,
        Some(json!([first_id, second_id])),
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(1, body["deletedCount"]);

    let (status_code, body) = helper::call(
        &mut app,
        Method::POST,
        "/api/meetings/delete-many",
        &admin_token,
        Some(json!([])),
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(0, body["deletedCount"]);

    assert!(helper::list_meetings(&mut app, &admin_token, "").await.is_empty());
}
