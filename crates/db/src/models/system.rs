//! Registered-system entity model.

use genpipe_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `systems` table.
///
/// Registrations are seeded out of band; at runtime this table is read-only
/// and used solely to authorize inbound submissions.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct System {
    pub slug: String,
    pub name: String,
    /// Inbound credential compared against the `X-API-Key` header.
    /// Never serialized into API responses.
    #[serde(skip_serializing)]
    pub api_key: String,
    pub created_at: Timestamp,
}
