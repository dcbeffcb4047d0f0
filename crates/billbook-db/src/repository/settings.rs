//! # Settings Repository
//!
//! One JSON settings document per tenant (`user_settings.settings_data`).
//!
//! The document is stored whole; fields missing from an older document
//! take their defaults when read.

use billbook_core::{Clock, Settings, TenantId};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::DbResult;

/// Repository for the settings document, bound to one tenant.
#[derive(Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
    tenant: TenantId,
    clock: Arc<dyn Clock>,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool, tenant: TenantId, clock: Arc<dyn Clock>) -> Self {
        SettingsRepository { pool, tenant, clock }
    }

    async fn stored_document(&self) -> DbResult<Option<String>> {
        let doc = sqlx::query_scalar::<_, String>("SELECT settings_data FROM user_settings WHERE user_id = ?1")
            .bind(self.tenant.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    /// The tenant's settings. Defaults are stored on first access.
    pub async fn get(&self) -> DbResult<Settings> {
        if let Some(doc) = self.stored_document().await? {
            return Ok(serde_json::from_str(&doc)?);
        }

        let defaults = Settings::default();
        sqlx::query(
            "INSERT INTO user_settings (user_id, settings_data, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(self.tenant.as_str())
        .bind(serde_json::to_string(&defaults)?)
        .bind(self.clock.now())
        .execute(&self.pool)
        .await?;

        debug!(tenant = %self.tenant, "Stored default settings");
        Ok(defaults)
    }

    /// The settings as a JSON value, for the backup document.
    pub async fn get_value(&self) -> DbResult<serde_json::Value> {
        Ok(serde_json::to_value(self.get().await?)?)
    }

    /// Replaces the whole document and stamps `last_updated`.
    pub async fn save(&self, mut settings: Settings) -> DbResult<Settings> {
        settings.validate()?;

        let now = self.clock.now();
        settings.last_updated = Some(now);

        sqlx::query(
            "INSERT INTO user_settings (user_id, settings_data, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                settings_data = excluded.settings_data,
                updated_at = excluded.updated_at",
        )
        .bind(self.tenant.as_str())
        .bind(serde_json::to_string(&settings)?)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(tenant = %self.tenant, "Settings saved");
        Ok(settings)
    }
}
