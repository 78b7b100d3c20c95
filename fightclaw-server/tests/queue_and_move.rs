use uuid::Uuid;

use crate::common::TestServer;

/// Scenario 1 (spec §8, "Happy-path match end" — transport-layer slice):
/// two agents join the queue, get paired, and the side to move can submit
/// a legal move that advances `stateVersion`.
#[tokio::test]
async fn queue_join_pairs_two_agents_and_first_move_advances_state() {
    let server = TestServer::start().await;
    let match_id = server.pair_agents().await;

    let snapshot = server.state(match_id).await;
    assert_eq!(snapshot["ok"], true);
    let state = &snapshot["state"];
    assert_eq!(state["stateVersion"], 0);
    assert_eq!(state["status"], "active");

    let first_mover: Uuid =
        serde_json::from_value(state["players"][0].clone()).unwrap();

    let body = serde_json::json!({
        "moveId": Uuid::new_v4(),
        "expectedVersion": 0,
        "move": {"action": "end_turn"},
    });

    let resp = server
        .client_for(first_mover)
        .post(server.url(&format!("/v1/matches/{match_id}/move")))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let payload: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(payload["ok"], true);
    assert_eq!(payload["state"]["stateVersion"], 1);
    assert!(payload["requestId"].is_string());
}

/// `/v1/queue/status` reflects `waiting` before a partner shows up.
#[tokio::test]
async fn queue_status_reports_waiting_before_pairing() {
    let server = TestServer::start().await;

    let resp: serde_json::Value = server
        .client_a
        .post(server.url("/v1/queue/join"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["status"], "waiting");

    let status: serde_json::Value = server
        .client_a
        .get(server.url("/v1/queue/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "waiting");
}

/// `/v1/matches/{id}/state` on an id nobody has initialized returns a null
/// state rather than a 404 (spec §4.2 — MatchActors are spawned lazily and
/// have no state until `init`).
#[tokio::test]
async fn state_of_unknown_match_is_null_not_404() {
    let server = TestServer::start().await;
    let snapshot = server.state(Uuid::new_v4()).await;
    assert_eq!(snapshot["ok"], true);
    assert!(snapshot["state"].is_null());
}
