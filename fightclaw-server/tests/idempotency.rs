use uuid::Uuid;

use crate::common::TestServer;

/// Scenario 2 (spec §8 "Move idempotency"): resubmitting the same `moveId`
/// returns the byte-identical cached response and never mutates state
/// twice.
#[tokio::test]
async fn duplicate_move_id_returns_cached_response() {
    let server = TestServer::start().await;
    let match_id = server.pair_agents().await;

    let state = server.state(match_id).await;
    let first_mover: Uuid =
        serde_json::from_value(state["state"]["players"][0].clone()).unwrap();

    let move_id = Uuid::new_v4();
    let body = serde_json::json!({
        "moveId": move_id,
        "expectedVersion": 0,
        "move": {"action": "end_turn"},
    });

    let first: serde_json::Value = server
        .client_for(first_mover)
        .post(server.url(&format!("/v1/matches/{match_id}/move")))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["state"]["stateVersion"], 1);

    let second: serde_json::Value = server
        .client_for(first_mover)
        .post(server.url(&format!("/v1/matches/{match_id}/move")))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // `requestId` is stamped fresh per HTTP call even for a cached response
    // (spec §6.1 "every response carries x-request-id"); idempotence
    // applies to everything else in the body.
    let strip_request_id = |mut v: serde_json::Value| {
        v.as_object_mut().unwrap().remove("requestId");
        v
    };
    assert_eq!(
        strip_request_id(first),
        strip_request_id(second),
        "resubmitting the same moveId must return the identical cached body"
    );

    let after = server.state(match_id).await;
    assert_eq!(after["state"]["stateVersion"], 1, "duplicate submission must not mutate state a second time");
}
