//! The device runtime driving a live server: edges in, volume out.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use device::monitor_logic::display::{DisplaySink, shared};
use device::monitor_logic::poller::{PollerSettings, refresh_once};
use device::monitor_logic::sensor::EdgeHandler;
use device::monitor_logic::{flow_task, reporter};
use lib_kegtap::TapError;
use lib_kegtap::core::{FlowStateMachine, LedColor, PulseCounter, StatusColor};
use lib_kegtap::models::{BeerInput, NewTap, PourEvent, TapInfo};
use lib_kegtap::retrieve::{ClientOptions, TapApi};
use project_tests::TestServer;
use tokio::sync::{Notify, broadcast, mpsc};
use tokio::time::{sleep, timeout};

const WINDOW: Duration = Duration::from_millis(200);

#[derive(Clone, Default)]
struct Screen {
    frames: Arc<Mutex<Vec<(f64, u8)>>>,
    statuses: Arc<Mutex<Vec<StatusColor>>>,
    images: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl DisplaySink for Screen {
    fn init(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
    fn show_status(&mut self, status: StatusColor) {
        self.statuses.lock().unwrap().push(status);
    }
    fn show_message(&mut self, _message: &str) {}
    fn show_tap(&mut self, info: &TapInfo, percent: u8, _level: &[LedColor]) {
        self.frames.lock().unwrap().push((info.volume, percent));
    }
    fn show_image(&mut self, image: &[u8]) {
        self.images.lock().unwrap().push(image.to_vec());
    }
}

fn client(server: &TestServer) -> TapApi {
    let options = ClientOptions {
        timeout: Duration::from_secs(2),
        max_retries: 0,
    };
    TapApi::new(&server.base_url(), options).unwrap()
}

struct Device {
    edges: EdgeHandler,
    refresh: Arc<Notify>,
    shutdown: broadcast::Sender<()>,
    screen: Screen,
}

fn spawn_device(api: TapApi, tap_id: &str) -> Device {
    let counter = Arc::new(PulseCounter::default());
    let (threshold_tx, threshold_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel(32);
    let (shutdown, _) = broadcast::channel(1);
    let refresh = Arc::new(Notify::new());
    let screen = Screen::default();

    tokio::spawn(flow_task::run(
        FlowStateMachine::new(counter.clone(), WINDOW),
        threshold_rx,
        event_tx,
        shutdown.subscribe(),
    ));
    tokio::spawn(reporter::run(
        Arc::new(api),
        tap_id.to_string(),
        event_rx,
        shared(screen.clone()),
        refresh.clone(),
    ));

    Device {
        edges: EdgeHandler::new(counter, threshold_tx),
        refresh,
        shutdown,
        screen,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_detected_pour_reaches_the_ledger() {
    let server = TestServer::start().await.unwrap();
    server.seed_tap("tap_1", 5000.0, 20.0).await.unwrap();
    let device = spawn_device(client(&server), "tap_1");

    // One burst: the first window sees it, the second is empty and ends the pour.
    for _ in 0..10 {
        device.edges.on_edge();
    }
    timeout(Duration::from_secs(5), device.refresh.notified())
        .await
        .expect("stop was never reported");

    let volume = server.volume("tap_1").await.unwrap();
    // About two windows of flow at 20 mL/s.
    assert!(volume < 5000.0 && volume > 4980.0, "{volume}");

    let display = shared(device.screen.clone());
    let settings = PollerSettings {
        tap_id: "tap_1".into(),
        interval: Duration::from_secs(60),
        led_count: 8,
        image_size: None,
    };
    assert!(refresh_once(&client(&server), &settings, &display).await);
    let frames = device.screen.frames.lock().unwrap().clone();
    assert_eq!(frames, vec![(volume, 99)]);

    let _ = device.shutdown.send(());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sub_threshold_trickle_is_ignored() {
    let server = TestServer::start().await.unwrap();
    server.seed_tap("tap_1", 5000.0, 20.0).await.unwrap();
    let device = spawn_device(client(&server), "tap_1");

    for _ in 0..4 {
        device.edges.on_edge();
    }
    sleep(WINDOW * 4).await;

    assert!(
        timeout(WINDOW, device.refresh.notified()).await.is_err(),
        "a pour was reported"
    );
    assert_eq!(server.volume("tap_1").await.unwrap(), 5000.0);
    let _ = device.shutdown.send(());
}

#[tokio::test]
async fn test_client_maps_server_errors() {
    let server = TestServer::start().await.unwrap();
    server.seed_tap("tap_1", 5000.0, 20.0).await.unwrap();
    let api = client(&server);

    match api.fetch_tap_info("tap_404").await {
        Err(TapError::NotFound(message)) => assert_eq!(message, "Tap not found"),
        other => panic!("expected not found, got {other:?}"),
    }
    assert!(!api.report_pour_event("tap_404", &PourEvent::Start).await);
    assert!(api.report_pour_event("tap_1", &PourEvent::Start).await);

    let stop = PourEvent::Stop {
        duration_secs: 10.0,
        report_id: Some("pour-0001".into()),
    };
    let first = api.send_pour_event("tap_1", &stop).await.unwrap();
    let replay = api.send_pour_event("tap_1", &stop).await.unwrap();
    assert_eq!(first.new_volume, Some(4800.0));
    assert!(!first.duplicate);
    assert!(replay.duplicate);
    assert_eq!(server.volume("tap_1").await.unwrap(), 4800.0);
}

#[tokio::test]
async fn test_tap_id_with_space_round_trips() {
    let server = TestServer::start().await.unwrap();
    server.seed_tap("tap 1", 5000.0, 20.0).await.unwrap();
    let api = client(&server);

    let info = api.fetch_tap_info("tap 1").await.unwrap();
    assert_eq!(info.tap_id, "tap 1");

    let stop = PourEvent::Stop {
        duration_secs: 10.0,
        report_id: None,
    };
    assert!(api.report_pour_event("tap 1", &stop).await);
    assert_eq!(server.volume("tap 1").await.unwrap(), 4800.0);
}

#[tokio::test]
async fn test_poll_downloads_beer_image() {
    let server = TestServer::start().await.unwrap();
    let beer = server
        .db
        .add_beer(BeerInput {
            name: "Kolsch".into(),
            abv: 4.8,
            image_path: Some("kolsch.jpg".into()),
        })
        .await
        .unwrap();
    server
        .db
        .add_tap(NewTap {
            tap_id: "tap_1".into(),
            beer_id: Some(beer.id),
            volume: 5000.0,
            flow_rate: 20.0,
        })
        .await
        .unwrap();
    std::fs::write(server.image_dir().join("kolsch.jpg"), b"\xFF\xD8kolsch").unwrap();

    let screen = Screen::default();
    let settings = PollerSettings {
        tap_id: "tap_1".into(),
        interval: Duration::from_secs(60),
        led_count: 8,
        image_size: Some((240, 240)),
    };
    assert!(refresh_once(&client(&server), &settings, &shared(screen.clone())).await);

    assert_eq!(
        *screen.images.lock().unwrap(),
        vec![b"\xFF\xD8kolsch".to_vec()]
    );
    assert_eq!(*screen.frames.lock().unwrap(), vec![(5000.0, 100)]);
    assert_eq!(
        screen.statuses.lock().unwrap().last(),
        Some(&StatusColor::Ok)
    );
}
