mod common;

use axum::http::StatusCode;
use rstest::rstest;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use common::{StubUserDirectory, TestApp};

#[tokio::test]
async fn successful_order_decrements_stock() {
    let app = TestApp::new().await;
    let item = app.seed_item("Item A", 10, dec!(9.99)).await;

    let response = app
        .post_order(json!({ "user_id": 1, "items": [{ "item_id": item, "quantity": 2 }] }))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["success"], true);
    let data = &response.body["data"];
    assert!(data["id"].as_i64().unwrap() > 0);
    assert_eq!(data["user_id"], 1);
    assert_eq!(data["items"], json!([{ "item_id": item, "quantity": 2 }]));
    assert!(response.body["meta"]["request_id"].is_string());

    assert_eq!(app.item_quantity(item).await, 8);
    assert_eq!(app.count_rows("orders").await, 1);
    assert_eq!(app.count_rows("order_items").await, 1);
}

#[tokio::test]
async fn multi_line_order_keeps_request_order() {
    let app = TestApp::new().await;
    let first = app.seed_item("Item A", 5, dec!(1.00)).await;
    let second = app.seed_item("Item B", 5, dec!(2.00)).await;
    let third = app.seed_item("Item C", 5, dec!(3.00)).await;

    let response = app
        .post_order(json!({
            "user_id": 2,
            "items": [
                { "item_id": third, "quantity": 1 },
                { "item_id": first, "quantity": 2 },
                { "item_id": second, "quantity": 3 }
            ]
        }))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let ids: Vec<i64> = response.body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| line["item_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![third as i64, first as i64, second as i64]);

    assert_eq!(app.item_quantity(first).await, 3);
    assert_eq!(app.item_quantity(second).await, 2);
    assert_eq!(app.item_quantity(third).await, 4);
}

#[tokio::test]
async fn insufficient_stock_leaves_item_untouched() {
    let app = TestApp::new().await;
    let item = app.seed_item("Item A", 1, dec!(5.00)).await;

    let response = app
        .post_order(json!({ "user_id": 1, "items": [{ "item_id": item, "quantity": 2 }] }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "insufficient_stock");
    assert_eq!(response.body["item_id"], item);
    assert_eq!(app.item_quantity(item).await, 1);
    assert_eq!(app.count_rows("orders").await, 0);
}

#[tokio::test]
async fn unknown_user_touches_nothing() {
    let app = TestApp::new().await;
    let item = app.seed_item("Item A", 10, dec!(5.00)).await;

    let response = app
        .post_order(json!({ "user_id": 999, "items": [{ "item_id": item, "quantity": 1 }] }))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["code"], "user_not_found");
    assert_eq!(app.item_quantity(item).await, 10);
    assert_eq!(app.count_rows("orders").await, 0);
}

#[tokio::test]
async fn failing_second_line_rolls_back_first() {
    let app = TestApp::new().await;
    let plenty = app.seed_item("Item A", 10, dec!(5.00)).await;
    let scarce = app.seed_item("Item B", 0, dec!(7.00)).await;

    let response = app
        .post_order(json!({
            "user_id": 1,
            "items": [
                { "item_id": plenty, "quantity": 4 },
                { "item_id": scarce, "quantity": 1 }
            ]
        }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "insufficient_stock");
    assert_eq!(response.body["item_id"], scarce);
    assert!(response.body["message"]
        .as_str()
        .unwrap()
        .contains(&format!("item {}", scarce)));

    assert_eq!(app.item_quantity(plenty).await, 10);
    assert_eq!(app.item_quantity(scarce).await, 0);
    assert_eq!(app.count_rows("orders").await, 0);
    assert_eq!(app.count_rows("order_items").await, 0);
}

#[tokio::test]
async fn first_failing_line_decides_the_error() {
    let app = TestApp::new().await;
    let scarce = app.seed_item("Item A", 1, dec!(5.00)).await;

    let response = app
        .post_order(json!({
            "user_id": 1,
            "items": [
                { "item_id": 4242, "quantity": 1 },
                { "item_id": scarce, "quantity": 5 }
            ]
        }))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["code"], "item_not_found");
    assert_eq!(response.body["item_id"], 4242);
    assert_eq!(app.item_quantity(scarce).await, 1);
}

#[tokio::test]
async fn unknown_item_after_reservable_line_restores_stock() {
    let app = TestApp::new().await;
    let item = app.seed_item("Item A", 3, dec!(5.00)).await;

    let response = app
        .post_order(json!({
            "user_id": 1,
            "items": [
                { "item_id": item, "quantity": 3 },
                { "item_id": 777, "quantity": 1 }
            ]
        }))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["code"], "item_not_found");
    assert_eq!(app.item_quantity(item).await, 3);
}

#[rstest]
#[case::missing_user(json!({ "items": [{ "item_id": 1, "quantity": 1 }] }))]
#[case::null_user(json!({ "user_id": null, "items": [{ "item_id": 1, "quantity": 1 }] }))]
#[case::missing_items(json!({ "user_id": 1 }))]
#[case::empty_items(json!({ "user_id": 1, "items": [] }))]
#[case::zero_quantity(json!({ "user_id": 1, "items": [{ "item_id": 1, "quantity": 0 }] }))]
#[case::duplicate_lines(json!({
    "user_id": 1,
    "items": [{ "item_id": 1, "quantity": 1 }, { "item_id": 1, "quantity": 1 }]
}))]
#[case::wrong_type(json!({ "user_id": "one", "items": [{ "item_id": 1, "quantity": 1 }] }))]
#[case::line_missing_quantity(json!({ "user_id": 1, "items": [{ "item_id": 1 }] }))]
#[tokio::test]
async fn invalid_input_is_rejected_without_side_effects(#[case] body: Value) {
    let app = TestApp::new().await;
    let item = app.seed_item("Item A", 10, dec!(5.00)).await;
    assert_eq!(item, 1);

    let response = app.post_order(body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "invalid_input");
    assert_eq!(app.item_quantity(item).await, 10);
    assert_eq!(app.count_rows("orders").await, 0);
}

#[tokio::test]
async fn malformed_json_is_invalid_input() {
    let app = TestApp::new().await;

    let response = app
        .request_with_headers(
            axum::http::Method::POST,
            "/orders",
            Some(axum::body::Body::from("{ not json")),
            &[],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "invalid_input");
}

#[tokio::test]
async fn unavailable_directory_is_503_and_mutates_nothing() {
    let app = TestApp::with_directory(StubUserDirectory::unavailable()).await;
    let item = app.seed_item("Item A", 10, dec!(5.00)).await;

    let response = app
        .post_order(json!({ "user_id": 1, "items": [{ "item_id": item, "quantity": 1 }] }))
        .await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["code"], "upstream_unavailable");
    assert_eq!(app.item_quantity(item).await, 10);
}

#[tokio::test]
async fn persistence_failure_rolls_back_reservations() {
    let app = TestApp::new().await;
    let item = app.seed_item("Item A", 10, dec!(5.00)).await;
    app.execute_sql("DROP TABLE order_items").await;

    let response = app
        .post_order(json!({ "user_id": 1, "items": [{ "item_id": item, "quantity": 4 }] }))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["code"], "persistence_failure");
    let message = response.body["message"].as_str().unwrap();
    assert!(!message.contains("order_items"));
    assert!(!message.to_lowercase().contains("sqlite"));

    assert_eq!(app.item_quantity(item).await, 10);
    assert_eq!(app.count_rows("orders").await, 0);
}

#[tokio::test]
async fn responses_echo_request_id() {
    let app = TestApp::new().await;

    let response = app
        .request_with_headers(
            axum::http::Method::POST,
            "/orders",
            Some(axum::body::Body::from(r#"{"user_id": 1, "items": []}"#)),
            &[("x-request-id", "order-test-1".to_string())],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.headers["x-request-id"], "order-test-1");
    assert_eq!(response.body["request_id"], "order-test-1");
}
