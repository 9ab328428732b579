use std::sync::Arc;

use amana_db::Database;
use amana_objects::{ObjectStorage, UploadSigner};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: ObjectStorage,
    pub signer: UploadSigner,
}

/// Run a database call off the async runtime.
pub async fn db_call<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> amana_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || f(&state.db)).await?;
    Ok(result?)
}
