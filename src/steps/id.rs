//! Step identifiers and workflow kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of workflow a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Profile edit: optional media uploads, then the record update.
    Update,
    /// Legacy record migration: optional topic creation, then the record update.
    Migration,
}

impl WorkflowKind {
    /// Steps of this kind in their canonical order.
    pub fn catalogue(&self) -> &'static [StepId] {
        match self {
            WorkflowKind::Update => &[
                StepId::UploadPicture,
                StepId::UploadBanner,
                StepId::UpdateRecord,
            ],
            WorkflowKind::Migration => &[
                StepId::CreateChannelsTopic,
                StepId::CreateGroupsTopic,
                StepId::CreateFollowingChannelsTopic,
                StepId::CreateFollowingGroupsTopic,
                StepId::UpdateRecord,
            ],
        }
    }

    /// Message shown once every step of this kind has succeeded.
    pub fn completion_message(&self) -> &'static str {
        match self {
            WorkflowKind::Update => "Profile updated",
            WorkflowKind::Migration => "Profile migrated to the current format",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowKind::Update => write!(f, "update"),
            WorkflowKind::Migration => write!(f, "migration"),
        }
    }
}

/// Stable identifier of a step.
///
/// `UpdateRecord` is shared by both workflow kinds; every other step
/// belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    UploadPicture,
    UploadBanner,
    CreateChannelsTopic,
    CreateGroupsTopic,
    CreateFollowingChannelsTopic,
    CreateFollowingGroupsTopic,
    UpdateRecord,
}

impl StepId {
    /// All step identifiers.
    pub const ALL: [StepId; 7] = [
        StepId::UploadPicture,
        StepId::UploadBanner,
        StepId::CreateChannelsTopic,
        StepId::CreateGroupsTopic,
        StepId::CreateFollowingChannelsTopic,
        StepId::CreateFollowingGroupsTopic,
        StepId::UpdateRecord,
    ];

    /// Snake-case key used in configuration and scenario files.
    pub fn key(&self) -> &'static str {
        match self {
            StepId::UploadPicture => "upload_picture",
            StepId::UploadBanner => "upload_banner",
            StepId::CreateChannelsTopic => "create_channels_topic",
            StepId::CreateGroupsTopic => "create_groups_topic",
            StepId::CreateFollowingChannelsTopic => "create_following_channels_topic",
            StepId::CreateFollowingGroupsTopic => "create_following_groups_topic",
            StepId::UpdateRecord => "update_record",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            StepId::UploadPicture => "Upload profile picture",
            StepId::UploadBanner => "Upload banner",
            StepId::CreateChannelsTopic => "Create channels topic",
            StepId::CreateGroupsTopic => "Create groups topic",
            StepId::CreateFollowingChannelsTopic => "Create following-channels topic",
            StepId::CreateFollowingGroupsTopic => "Create following-groups topic",
            StepId::UpdateRecord => "Update profile record",
        }
    }

    /// Message shown when the step succeeds.
    pub fn success_message(&self) -> &'static str {
        match self {
            StepId::UploadPicture => "Profile picture uploaded",
            StepId::UploadBanner => "Banner uploaded",
            StepId::CreateChannelsTopic => "Channels topic created",
            StepId::CreateGroupsTopic => "Groups topic created",
            StepId::CreateFollowingChannelsTopic => "Following-channels topic created",
            StepId::CreateFollowingGroupsTopic => "Following-groups topic created",
            StepId::UpdateRecord => "Profile record updated",
        }
    }

    /// Whether the step writes to the ledger (as opposed to media storage).
    pub fn is_ledger_write(&self) -> bool {
        !matches!(self, StepId::UploadPicture | StepId::UploadBanner)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StepId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        StepId::ALL
            .iter()
            .copied()
            .find(|id| id.key() == s)
            .ok_or_else(|| format!("unknown step '{}'", s))
    }
}
