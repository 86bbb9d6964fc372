//! REST endpoint tests using the Router::oneshot pattern.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tictactoe_engine::MoveEngine;
use tictactoe_server::{AppState, Exchange, Opponent, router};
use tower::ServiceExt;

fn test_router() -> Router {
    let exchange = Exchange::new(Opponent::new(MoveEngine::new()), 6);
    router(AppState::new(exchange))
}

async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_make_move_blocks() {
    let board = json!(["O", "O", null, null, "X", null, null, null, null]);
    let (status, body) = call(
        test_router(),
        "POST",
        "/make_move",
        Some(json!({ "board": board, "current_player": "X" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["position"], 2);
    assert_eq!(body["player"], "X");
    assert_eq!(body["board"][2], "X");
    assert_eq!(body["ai_used"], false);
}

#[tokio::test]
async fn test_make_move_on_finished_board_is_rejected() {
    let board = json!(["X", "X", "X", "O", "O", null, null, null, null]);
    let (status, body) = call(
        test_router(),
        "POST",
        "/make_move",
        Some(json!({ "board": board, "current_player": "O" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_make_move_rejects_mismatched_size() {
    let (status, body) = call(
        test_router(),
        "POST",
        "/make_move",
        Some(json!({ "board": [null, null, null, null], "current_player": "X", "size": 3 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains('9'));
}

#[tokio::test]
async fn test_make_move_infers_four_by_four() {
    let mut board = vec![Value::Null; 16];
    board[0] = json!("X");
    board[5] = json!("X");
    board[10] = json!("X");
    let (status, body) = call(
        test_router(),
        "POST",
        "/make_move",
        Some(json!({ "board": board, "current_player": "O" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["position"], 15);
    assert_eq!(body["board"].as_array().unwrap().len(), 16);
}

#[tokio::test]
async fn test_check_winner_results() {
    let cases = [
        (json!(["X", "X", "X", "O", "O", null, null, null, null]), json!("X")),
        (json!(["O", "X", null, "O", "X", null, "O", null, null]), json!("O")),
        (json!(["X", "O", "X", "X", "O", "O", "O", "X", "X"]), json!("Tie")),
        (json!([null, null, null, null, "X", null, null, null, null]), Value::Null),
    ];
    for (board, expected) in cases {
        let (status, body) = call(
            test_router(),
            "POST",
            "/check_winner",
            Some(json!({ "board": board })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, expected);
    }
}

#[tokio::test]
async fn test_start_game_sizes() {
    let (status, body) = call(test_router(), "POST", "/start_game", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["size"], 3);
    assert_eq!(body["current_player"], "X");
    assert_eq!(body["board"].as_array().unwrap().len(), 9);

    let (_, body) = call(test_router(), "POST", "/start_game?size=5", None).await;
    assert_eq!(body["board"].as_array().unwrap().len(), 25);

    let (status, _) = call(test_router(), "POST", "/start_game?size=2", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(test_router(), "POST", "/start_game?size=7", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_sessions() {
    let (status, body) = call(test_router(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["active_sessions"], 0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_oracle_status_without_oracle() {
    let (status, body) = call(test_router(), "GET", "/oracle-status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "available": false, "provider": null, "model": null }));
}

#[tokio::test]
async fn test_sessions_lists_open_games() {
    let exchange = Exchange::new(Opponent::new(MoveEngine::new()), 6);
    let state = AppState::new(exchange);
    let guard = state
        .registry()
        .open(state.exchange().new_session(4).unwrap());

    let (status, body) = call(router(state.clone()), "GET", "/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    let sessions = body.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], guard.id());
    assert_eq!(sessions[0]["size"], 4);

    drop(guard);
    let (_, body) = call(router(state), "GET", "/sessions", None).await;
    assert!(body.as_array().unwrap().is_empty());
}
