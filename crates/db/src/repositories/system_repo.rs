//! Repository for the `systems` table (read-only at runtime).

use sqlx::PgPool;

use crate::models::system::System;

const COLUMNS: &str = "slug, name, api_key, created_at";

/// Lookup operations for registered systems.
pub struct SystemRepo;

impl SystemRepo {
    /// Find a system registration by slug.
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<System>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM systems WHERE slug = $1");
        sqlx::query_as::<_, System>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// List all registrations, ordered by slug.
    pub async fn list(pool: &PgPool) -> Result<Vec<System>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM systems ORDER BY slug");
        sqlx::query_as::<_, System>(&query).fetch_all(pool).await
    }
}
