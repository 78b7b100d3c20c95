use uuid::Uuid;

use crate::common::TestServer;

/// Scenario 3 (spec §8 "Illegal move forfeit"): an illegal move forfeits
/// the submitter and ends the match in the opponent's favor.
#[tokio::test]
async fn illegal_move_forfeits_the_submitter() {
    let server = TestServer::start().await;
    let match_id = server.pair_agents().await;

    let state = server.state(match_id).await;
    let first_mover: Uuid =
        serde_json::from_value(state["state"]["players"][0].clone()).unwrap();
    let opponent = server.opponent_of(first_mover);

    let body = serde_json::json!({
        "moveId": Uuid::new_v4(),
        "expectedVersion": 0,
        "move": {"action": "attack", "unitId": "nonexistent", "target": [7, 4]},
    });

    let resp = server
        .client_for(first_mover)
        .post(server.url(&format!("/v1/matches/{match_id}/move")))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let payload: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(payload["ok"], false);
    assert_eq!(payload["forfeited"], true);
    assert_eq!(payload["matchStatus"], "ended");
    assert_eq!(payload["reasonCode"], "invalid_move_schema");
    assert_eq!(
        payload["winnerAgentId"],
        serde_json::json!(opponent),
        "the non-offending agent must be recorded as the winner"
    );

    let after = server.state(match_id).await;
    assert_eq!(after["state"]["status"], "ended");
    assert_eq!(after["state"]["winnerAgentId"], serde_json::json!(opponent));
}

/// `/v1/matches/{id}/finish` requires the admin key.
#[tokio::test]
async fn finish_without_admin_key_is_rejected() {
    let server = TestServer::start().await;
    let match_id = server.pair_agents().await;

    let resp = server
        .client_a
        .post(server.url(&format!("/v1/matches/{match_id}/finish")))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
}
