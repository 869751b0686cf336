//! Prepared datasets and their registration records.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review status of a dataset registration on the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Lifecycle state of a dataset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetState {
    #[default]
    Development,
    Operation,
}

/// Registration metadata written next to a prepared dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Registration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub split_seed: i64,
    pub data_preparation_mlcube: String,
    /// Folder hash of the prepared output; the local dataset uid.
    pub generated_uid: String,
    #[serde(default)]
    pub input_data_hash: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub status: RegistrationStatus,
    #[serde(default)]
    pub state: DatasetState,
    /// Server-side id. `None` until the registration is submitted.
    #[serde(default)]
    pub uid: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Registration {
    /// Registration that only lives on this machine.
    pub fn local(
        name: impl Into<String>,
        data_preparation_mlcube: impl Into<String>,
        generated_uid: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            location: String::new(),
            split_seed: 0,
            data_preparation_mlcube: data_preparation_mlcube.into(),
            generated_uid: generated_uid.into(),
            input_data_hash: String::new(),
            metadata: serde_json::Value::Null,
            status: RegistrationStatus::Pending,
            state: DatasetState::Development,
            uid: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.uid.is_some()
    }
}

/// A prepared dataset present in local storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub uid: String,
    pub preparation_cube_uid: String,
    pub data_path: PathBuf,
    pub labels_path: PathBuf,
    pub registration: Registration,
}

impl Dataset {
    /// Dataset rooted at `root`, using the conventional `data/` and `labels/`
    /// subdirectories.
    pub fn from_registration(root: PathBuf, registration: Registration) -> Self {
        Self {
            uid: registration.generated_uid.clone(),
            preparation_cube_uid: registration.data_preparation_mlcube.clone(),
            data_path: root.join("data"),
            labels_path: root.join("labels"),
            registration,
        }
    }
}
