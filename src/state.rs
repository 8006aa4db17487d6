use crate::config::Config;
use crate::core::model::ChatModel;
use crate::models::subject::SubjectCatalog;
use axum::extract::FromRef;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    /// Subject reference data, loaded once at startup.
    pub catalog: Arc<SubjectCatalog>,
    /// Question-generation model. Absent when no API key is configured.
    pub model: Option<Arc<dyn ChatModel>>,
    /// Per-user serialization points for submissions. Concurrent submissions
    /// by the same user must not interleave their read-modify-write cycles.
    user_locks: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: Config,
        catalog: SubjectCatalog,
        model: Option<Arc<dyn ChatModel>>,
    ) -> Self {
        Self {
            pool,
            config,
            catalog: Arc::new(catalog),
            model,
            user_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the submission lock for a user, creating it on first use.
    /// The registry itself is only held long enough to clone the entry.
    pub async fn user_lock(&self, user_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
