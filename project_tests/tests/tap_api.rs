//! Device-facing endpoints over real HTTP.

use project_tests::TestServer;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

async fn post(client: &Client, url: &str, body: Value) -> (StatusCode, Value) {
    let response = client.post(url).json(&body).send().await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_get_tap_returns_info() {
    let server = TestServer::start().await.unwrap();
    server.seed_tap("tap_1", 5000.0, 20.0).await.unwrap();

    let response = reqwest::get(server.url("/api/tap/tap_1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["tap_id"], "tap_1");
    assert_eq!(body["beer_name"], "Test Lager");
    assert_eq!(body["beer_abv"], 5.0);
    assert_eq!(body["volume"], 5000.0);
    assert_eq!(body["full_volume"], 5000.0);
    assert_eq!(body["flow_rate"], 20.0);
    assert!(body.get("image_path").is_some());
}

#[tokio::test]
async fn test_unknown_tap_is_404() {
    let server = TestServer::start().await.unwrap();

    let response = reqwest::get(server.url("/api/tap/unknown_id")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Tap not found" }));

    let client = Client::new();
    for (path, body) in [
        ("/api/tap/unknown_id/pour_event", json!({ "event_type": "start" })),
        ("/api/tap/unknown_id/pour_event", json!({ "event_type": "stop", "duration": 1 })),
        ("/api/tap/unknown_id/update_volume", json!({ "pour_time": 1 })),
        ("/api/tap/unknown_id/set_volume", json!({ "volume": 1 })),
    ] {
        let (status, body) = post(&client, &server.url(path), body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
        assert_eq!(body["error"], "Tap not found");
    }
}

#[tokio::test]
async fn test_start_event_changes_nothing() {
    let server = TestServer::start().await.unwrap();
    server.seed_tap("tap_1", 5000.0, 20.0).await.unwrap();

    let (status, body) = post(
        &Client::new(),
        &server.url("/api/tap/tap_1/pour_event"),
        json!({ "event_type": "start" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
    assert_eq!(server.volume("tap_1").await.unwrap(), 5000.0);
}

#[tokio::test]
async fn test_stop_event_decrements_volume() {
    let server = TestServer::start().await.unwrap();
    server.seed_tap("tap_1", 5000.0, 20.0).await.unwrap();

    let (status, body) = post(
        &Client::new(),
        &server.url("/api/tap/tap_1/pour_event"),
        json!({ "event_type": "stop", "duration": 10 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "volume_poured": 200.0, "new_volume": 4800.0 })
    );
    assert_eq!(server.volume("tap_1").await.unwrap(), 4800.0);
}

#[tokio::test]
async fn test_stop_event_clamps_at_zero() {
    let server = TestServer::start().await.unwrap();
    server.seed_tap("tap_1", 50.0, 20.0).await.unwrap();

    let (status, body) = post(
        &Client::new(),
        &server.url("/api/tap/tap_1/pour_event"),
        json!({ "event_type": "stop", "duration": "10" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["volume_poured"], 200.0);
    assert_eq!(body["new_volume"], 0.0);
}

#[tokio::test]
async fn test_bad_pour_events_are_400() {
    let server = TestServer::start().await.unwrap();
    server.seed_tap("tap_1", 5000.0, 20.0).await.unwrap();
    let client = Client::new();
    let url = server.url("/api/tap/tap_1/pour_event");

    for (body, message) in [
        (json!({}), "Missing event_type parameter"),
        (json!({ "event_type": "stop" }), "Missing duration parameter for stop event"),
        (json!({ "event_type": "pause" }), "Invalid event_type"),
        (json!({ "event_type": "stop", "duration": -1 }), "Invalid duration"),
        (json!({ "event_type": "stop", "duration": "soon" }), "Invalid duration"),
        (json!({ "event_type": "stop", "duration": 1e308 }), "Invalid duration"),
    ] {
        let (status, reply) = post(&client, &url, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(reply["error"], message, "{body}");
    }

    // A body that is not JSON at all reads as missing fields.
    let response = client
        .post(&url)
        .header("content-type", "text/plain")
        .body("event_type=start")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let reply: Value = response.json().await.unwrap();
    assert_eq!(reply["error"], "Missing event_type parameter");

    assert_eq!(server.volume("tap_1").await.unwrap(), 5000.0);
}

#[tokio::test]
async fn test_update_volume_by_pour_time() {
    let server = TestServer::start().await.unwrap();
    server.seed_tap("tap_1", 5000.0, 20.0).await.unwrap();
    let client = Client::new();
    let url = server.url("/api/tap/tap_1/update_volume");

    let (status, body) = post(&client, &url, json!({ "pour_time": 2.5 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "new_volume": 4950.0 }));

    let (status, body) = post(&client, &url, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing pour_time parameter");

    let (status, body) = post(&client, &url, json!({ "pour_time": -3 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid pour_time");
}

#[tokio::test]
async fn test_set_volume_overwrites() {
    let server = TestServer::start().await.unwrap();
    server.seed_tap("tap_1", 5000.0, 20.0).await.unwrap();
    let client = Client::new();
    let url = server.url("/api/tap/tap_1/set_volume");

    let (status, body) = post(&client, &url, json!({ "volume": 1234.5 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "new_volume": 1234.5 }));

    let (_, body) = post(&client, &url, json!({ "volume": -10 })).await;
    assert_eq!(body["new_volume"], 0.0);

    let (status, body) = post(&client, &url, json!({ "volume": "lots" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid volume");

    let (status, body) = post(&client, &url, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing volume parameter");
}

#[tokio::test]
async fn test_replayed_stop_is_applied_once() {
    let server = TestServer::start().await.unwrap();
    server.seed_tap("tap_1", 5000.0, 20.0).await.unwrap();
    server.seed_tap("tap_2", 5000.0, 20.0).await.unwrap();
    let client = Client::new();
    let report_id = uuid::Uuid::new_v4().to_string();
    let stop = json!({ "event_type": "stop", "duration": 10, "report_id": report_id });

    let (_, first) = post(&client, &server.url("/api/tap/tap_1/pour_event"), stop.clone()).await;
    assert_eq!(first["new_volume"], 4800.0);
    assert!(first.get("duplicate").is_none());

    let (status, replay) =
        post(&client, &server.url("/api/tap/tap_1/pour_event"), stop.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["new_volume"], 4800.0);
    assert_eq!(replay["volume_poured"], 200.0);
    assert_eq!(replay["duplicate"], true);
    assert_eq!(server.volume("tap_1").await.unwrap(), 4800.0);

    // The same id on another tap is refused and changes nothing there.
    let (status, body) = post(&client, &server.url("/api/tap/tap_2/pour_event"), stop).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "report_id already used for another tap");
    assert_eq!(server.volume("tap_2").await.unwrap(), 5000.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stops_lose_nothing() {
    let server = TestServer::start().await.unwrap();
    server.seed_tap("tap_1", 5000.0, 20.0).await.unwrap();
    let client = Client::new();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let client = client.clone();
        let url = server.url("/api/tap/tap_1/pour_event");
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .json(&json!({ "event_type": "stop", "duration": 1 }))
                .send()
                .await
                .unwrap()
                .status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    // 20 pours of 1s at 20 mL/s.
    assert_eq!(server.volume("tap_1").await.unwrap(), 4600.0);
}

#[tokio::test]
async fn test_tap_image_falls_back_to_default() {
    let server = TestServer::start().await.unwrap();
    server.seed_tap("tap_1", 5000.0, 20.0).await.unwrap();

    let missing = reqwest::get(server.url("/api/tap/tap_1/image")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["error"], "Image not found");

    std::fs::write(server.image_dir().join("default.jpg"), b"\xFF\xD8jpeg").unwrap();
    let response = reqwest::get(server.url("/api/tap/tap_1/image?width=120&height=120"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"\xFF\xD8jpeg");
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await.unwrap();
    let response = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
