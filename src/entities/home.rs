//! Home entity - A children's home account that posts needs.
//!
//! `verification_status` is the admin-controlled workflow state. The legacy `verified`
//! flag is derived from it and must be written together with it on every update.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Admin verification workflow state
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Registration submitted, nobody looked at it yet
    #[sea_orm(string_value = "received")]
    Received,
    /// An admin is reviewing the documents
    #[sea_orm(string_value = "reviewing")]
    Reviewing,
    /// The home was asked for additional documents
    #[sea_orm(string_value = "needs_documents")]
    NeedsDocuments,
    /// Verified; the home may post needs
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Refused, with a reason
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl VerificationStatus {
    /// Value of the legacy `verified` column for this status.
    #[must_use]
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Approved and rejected accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Snake-case label, as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Reviewing => "reviewing",
            Self::NeedsDocuments => "needs_documents",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Human-readable label used in activity logs and the admin console.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Received => "Application received",
            Self::Reviewing => "Under review",
            Self::NeedsDocuments => "Documents requested",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

/// Account standing, independent of verification
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Normal operation
    #[sea_orm(string_value = "active")]
    Active,
    /// Temporarily blocked by an admin
    #[sea_orm(string_value = "suspended")]
    Suspended,
    /// Permanently blocked by an admin
    #[sea_orm(string_value = "banned")]
    Banned,
}

impl AccountStatus {
    /// Snake-case label, as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Banned => "banned",
        }
    }
}

/// Home database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "homes")]
pub struct Model {
    /// Unique identifier for the home
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Profile that registered and operates the home
    pub owner_id: String,
    /// Organization name
    pub name: String,
    /// Free-text description shown to donors
    pub description: String,
    /// Street address
    pub address: String,
    /// City, used for browsing
    pub city: String,
    /// Contact phone number
    pub contact_phone: String,
    /// Public logo URL, if one was uploaded
    pub logo_url: Option<String>,
    /// Public cover image URL, if one was uploaded
    pub cover_url: Option<String>,
    /// Private object paths of the registration documents (JSON array of strings)
    pub document_paths: Json,
    /// Verification workflow state
    pub verification_status: VerificationStatus,
    /// Legacy flag, true iff `verification_status` is approved
    pub verified: bool,
    /// Reason given when the home was rejected
    pub rejection_reason: Option<String>,
    /// Account standing
    pub account_status: AccountStatus,
    /// When the home registered
    pub created_at: DateTimeUtc,
    /// When the row was last modified
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Registration documents as plain paths.
    #[must_use]
    pub fn documents(&self) -> Vec<String> {
        self.document_paths
            .as_array()
            .map(|paths| {
                paths
                    .iter()
                    .filter_map(|p| p.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the home may currently post needs and receive pledges.
    #[must_use]
    pub fn can_operate(&self) -> bool {
        self.verification_status == VerificationStatus::Approved
            && self.account_status == AccountStatus::Active
    }
}

/// Defines relationships between Home and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each home belongs to its owner profile
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::OwnerId",
        to = "super::profile::Column::Id"
    )]
    Owner,
    /// One home has many needs
    #[sea_orm(has_many = "super::need::Entity")]
    Needs,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::need::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Needs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
