use axum::http::Method;
use axum::http::StatusCode;

use crate::tests::helper;

#[tokio::test]
async fn test_invalid_json() {
    let (mut app, _) = helper::setup_test_app().await;

    let access_token = helper::login(&mut app).await;

    // missing data
    let (status_code, body) = helper::call_with_raw_body(
        &mut app,
        Method::POST,
        "/api/users",
        &access_token,
        r"{}",
        true,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    let error = helper::get_error(&body);
    assert_eq!("Data error".to_string(), error.error);
    assert!(
        error
            .description
            .unwrap()
            .starts_with("Failed to deserialize the JSON body into the target type")
    );

    // syntax error
    let (status_code, body) = helper::call_with_raw_body(
        &mut app,
        Method::POST,
        "/api/users",
        &access_token,
        r#"{"}"#,
        true,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    let error = helper::get_error(&body);
    assert_eq!("JSON syntax error".to_string(), error.error);
    assert!(error.description.is_some());

    // missing content type
    let (status_code, body) = helper::call_with_raw_body(
        &mut app,
        Method::POST,
        "/api/users",
        &access_token,
        r"{}",
        false,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(
        "Missing `application/json` content type".to_string(),
        helper::get_error_message(&body)
    );
}

#[tokio::test]
async fn test_invalid_json_for_meetings_is_generic() {
    let (mut app, _) = helper::setup_test_app().await;

    let access_token = helper::login(&mut app).await;

    let (status_code, body) = helper::call_with_raw_body(
        &mut app,
        Method::POST,
        "/api/meetings",
        &access_token,
        r#"{"agenda":}"#,
        true,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(
        helper::Error {
            error: "Failed to create meeting".to_string(),
            description: None,
        },
        helper::get_error(&body)
    );

    // references must be IDs
    let (status_code, body) = helper::call_with_raw_body(
        &mut app,
        Method::POST,
        "/api/meetings",
        &access_token,
        r#"{"attendes":["not-an-id"]}"#,
        true,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Failed to create meeting", helper::get_error_message(&body));

    let (status_code, body) = helper::call_with_raw_body(
        &mut app,
        Method::POST,
        "/api/meetings/delete-many",
        &access_token,
        r#"{"ids":[]}"#,
        true,
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Failed to delete meetings", helper::get_error_message(&body));
}
