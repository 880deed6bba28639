//! # Integration Test Harness
//!
//! Starts the tap server on an ephemeral port over a private in-memory ledger, so
//! the tests under `tests/` can talk to it over real HTTP.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Result;
use lib_kegtap::connections::Database;
use lib_kegtap::models::{BeerInput, NewTap};
use servers::taps_logic::{self, AppState};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A running server. Stops when dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    pub db: Database,
    images: TempDir,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let db = Database::in_memory().await?;
        let images = tempfile::tempdir()?;
        let state = AppState::new(db.clone(), images.path().to_path_buf());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = taps_logic::router(state);
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            db,
            images,
            task,
        })
    }

    /// Base URL with no trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Directory the server resolves image paths against.
    pub fn image_dir(&self) -> &Path {
        self.images.path()
    }

    /// Adds a beer and a tap pouring it.
    pub async fn seed_tap(&self, tap_id: &str, volume: f64, flow_rate: f64) -> Result<()> {
        let beer = self
            .db
            .add_beer(BeerInput {
                name: "Test Lager".into(),
                abv: 5.0,
                image_path: None,
            })
            .await?;
        self.db
            .add_tap(NewTap {
                tap_id: tap_id.to_string(),
                beer_id: Some(beer.id),
                volume,
                flow_rate,
            })
            .await?;
        Ok(())
    }

    /// Current volume straight from the store.
    pub async fn volume(&self, tap_id: &str) -> Result<f64> {
        Ok(self.db.get_tap(tap_id).await?.volume)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
