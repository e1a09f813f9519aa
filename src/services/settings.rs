use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tracing::{info, instrument};

use crate::{
    entities::store_settings::{self, Entity as StoreSettings, Model as SettingsModel},
    errors::ServiceError,
};

const SETTINGS_ROW_ID: i32 = 1;

/// Versioned store configuration aggregate.
///
/// Admin-authored and low-frequency: a single row with an explicit
/// get/update contract. Updates bump `version` so stale admin screens can
/// detect they are overwriting newer data.
#[derive(Clone)]
pub struct StoreSettingsService {
    db: Arc<DatabaseConnection>,
}

impl StoreSettingsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Returns the current settings, creating an empty aggregate on first
    /// read.
    pub async fn get(&self) -> Result<SettingsModel, ServiceError> {
        if let Some(existing) = StoreSettings::find_by_id(SETTINGS_ROW_ID).one(&*self.db).await? {
            return Ok(existing);
        }

        let initial = store_settings::ActiveModel {
            id: Set(SETTINGS_ROW_ID),
            settings: Set(serde_json::json!({})),
            version: Set(1),
            updated_at: Set(Utc::now()),
        };
        Ok(initial.insert(&*self.db).await?)
    }

    /// Replaces the settings document and bumps the version.
    #[instrument(skip(self, settings))]
    pub async fn update(&self, settings: serde_json::Value) -> Result<SettingsModel, ServiceError> {
        let current = self.get().await?;
        let next_version = current.version + 1;

        let mut active: store_settings::ActiveModel = current.into();
        active.settings = Set(settings);
        active.version = Set(next_version);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        info!(version = updated.version, "Store settings updated");
        Ok(updated)
    }
}
