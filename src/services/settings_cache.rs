use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::warn;

use crate::db::settings_repository::SettingsRepository;
use crate::models::settings::{AppSettings, UpdateAppSettings};

/// Read-through cache over the settings row. Handlers receive it through
/// `AppState`; writes go through [`SettingsCache::update`] so the cached copy
/// is replaced immediately.
pub struct SettingsCache {
    repo: Arc<dyn SettingsRepository>,
    ttl: Duration,
    cached: RwLock<Cached>,
}

#[derive(Default)]
struct Cached {
    /// Bumped on every update; a read started under an older generation
    /// must not store its row.
    generation: u64,
    entry: Option<(Instant, AppSettings)>,
}

impl SettingsCache {
    pub fn new(repo: Arc<dyn SettingsRepository>, ttl: Duration) -> Self {
        Self {
            repo,
            ttl,
            cached: RwLock::new(Cached::default()),
        }
    }

    pub async fn get(&self) -> Result<AppSettings, sqlx::Error> {
        let generation = {
            let cached = self.cached.read().await;
            if let Some((expiry, settings)) = cached.entry.as_ref() {
                if *expiry > Instant::now() {
                    return Ok(settings.clone());
                }
            }
            cached.generation
        };

        match self.repo.get_settings().await {
            Ok(found) => {
                let settings = found.unwrap_or_default();
                let mut cached = self.cached.write().await;
                if cached.generation != generation {
                    if let Some((_, newer)) = cached.entry.as_ref() {
                        return Ok(newer.clone());
                    }
                }
                cached.entry = Some((Instant::now() + self.ttl, settings.clone()));
                Ok(settings)
            }
            Err(err) => {
                if let Some((_, stale)) = self.cached.read().await.entry.as_ref() {
                    warn!(?err, "serving stale settings after refresh failure");
                    return Ok(stale.clone());
                }
                Err(err)
            }
        }
    }

    pub async fn update(&self, update: &UpdateAppSettings) -> Result<AppSettings, sqlx::Error> {
        let saved = self.repo.update_settings(update).await?;
        let mut cached = self.cached.write().await;
        cached.generation += 1;
        let superseded = cached
            .entry
            .as_ref()
            .is_some_and(|(_, current)| current.updated_at > saved.updated_at);
        if !superseded {
            cached.entry = Some((Instant::now() + self.ttl, saved.clone()));
        }
        Ok(saved)
    }
}
