use std::path::PathBuf;
use std::sync::Arc;

use lib_kegtap::connections::Database;

/// Shared state handed to every handler.
#[derive(Debug)]
pub struct AppState {
    /// The ledger store.
    pub db: Database,
    /// Directory that beer image paths are resolved against.
    pub image_dir: PathBuf,
}

impl AppState {
    pub fn new(db: Database, image_dir: PathBuf) -> Arc<Self> {
        Arc::new(Self { db, image_dir })
    }
}
