//! Profile inputs that decide which steps a workflow contains.

use serde::{Deserialize, Serialize};

/// On-ledger format of a profile record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormat {
    /// Pre-topic format: follow lists are stored inline.
    Legacy,
    /// Current format.
    #[default]
    Current,
}

/// The profile record as it currently exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileRecord {
    /// Record format.
    pub format: RecordFormat,

    /// Display name.
    pub name: String,
}

impl ProfileRecord {
    /// Whether the record needs migrating before it can be edited.
    pub fn needs_migration(&self) -> bool {
        self.format == RecordFormat::Legacy
    }
}

/// A profile edit submitted by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileDraft {
    /// New display name.
    pub name: String,

    /// Picture file chosen for upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Banner file chosen for upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

impl ProfileDraft {
    /// A draft that only changes the name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the picture file.
    pub fn with_picture(mut self, file: impl Into<String>) -> Self {
        self.picture = Some(file.into());
        self
    }

    /// Set the banner file.
    pub fn with_banner(mut self, file: impl Into<String>) -> Self {
        self.banner = Some(file.into());
        self
    }
}

/// Inline lists carried by a legacy record, each moved to its own topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyLists {
    pub channels: Vec<String>,
    pub groups: Vec<String>,
    pub following_channels: Vec<String>,
    pub following_groups: Vec<String>,
}
