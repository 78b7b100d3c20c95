use uuid::Uuid;

use crate::common::TestServer;

/// Scenario 5 (spec §8 "Version mismatch"): a move submitted against a
/// stale `expectedVersion` is rejected with 409 and the current version,
/// without mutating state.
#[tokio::test]
async fn stale_expected_version_returns_409_with_current_version() {
    let server = TestServer::start().await;
    let match_id = server.pair_agents().await;

    let state = server.state(match_id).await;
    let first_mover: Uuid =
        serde_json::from_value(state["state"]["players"][0].clone()).unwrap();

    let advance = serde_json::json!({
        "moveId": Uuid::new_v4(),
        "expectedVersion": 0,
        "move": {"action": "end_turn"},
    });
    let resp = server
        .client_for(first_mover)
        .post(server.url(&format!("/v1/matches/{match_id}/move")))
        .json(&advance)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    // Now resubmit against the stale version=0 with a fresh moveId.
    let stale = serde_json::json!({
        "moveId": Uuid::new_v4(),
        "expectedVersion": 0,
        "move": {"action": "end_turn"},
    });
    let resp = server
        .client_for(first_mover)
        .post(server.url(&format!("/v1/matches/{match_id}/move")))
        .json(&stale)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::CONFLICT);
    let payload: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(payload["ok"], false);
    assert_eq!(payload["code"], "version_mismatch");
    assert_eq!(payload["stateVersion"], 1);

    let after = server.state(match_id).await;
    assert_eq!(after["state"]["stateVersion"], 1, "a rejected stale move must not advance state further");
}

/// Only a participant of the match may submit moves for it.
#[tokio::test]
async fn non_participant_move_is_forbidden() {
    let server = TestServer::start().await;
    let match_id = server.pair_agents().await;

    // agent_a and agent_b are both paired into this match, so use a third,
    // unregistered bearer token to simulate a non-participant.
    let outsider = reqwest::Client::builder()
        .default_headers({
            let mut h = reqwest::header::HeaderMap::new();
            h.insert(
                reqwest::header::AUTHORIZATION,
                "Bearer not-a-real-key".parse().unwrap(),
            );
            h
        })
        .build()
        .unwrap();

    let resp = outsider
        .post(server.url(&format!("/v1/matches/{match_id}/move")))
        .json(&serde_json::json!({
            "moveId": Uuid::new_v4(),
            "expectedVersion": 0,
            "move": {"action": "end_turn"},
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
}
