use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::{config::Config, services::Generation};

/// Shared application state
///
/// Requests clone the current `Arc<Generation>` and read from it without
/// holding the lock; a reload replaces the pointer as a whole.
#[derive(Clone)]
pub struct AppState {
    generation: Arc<RwLock<Arc<Generation>>>,
    config: Arc<Config>,
    reload: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(generation: Generation, config: Config) -> Self {
        Self {
            generation: Arc::new(RwLock::new(Arc::new(generation))),
            config: Arc::new(config),
            reload: Arc::new(Mutex::new(())),
        }
    }

    /// The generation serving new requests
    pub async fn current(&self) -> Arc<Generation> {
        self.generation.read().await.clone()
    }

    /// Installs `next` and returns the generation it replaced.
    /// In-flight requests keep their own handle to the old one.
    pub async fn swap(&self, next: Generation) -> Arc<Generation> {
        let next = Arc::new(next);
        let mut guard = self.generation.write().await;
        std::mem::replace(&mut *guard, next)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Held for the duration of a reload so rebuilds never overlap
    pub(crate) async fn reload_guard(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.reload.lock().await
    }
}
