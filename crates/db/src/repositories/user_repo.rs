//! Repository for the `users` display table.

use easyweb_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::UserSummary;

const COLUMNS: &str = "id, name, email, role";

pub struct UserRepo;

impl UserRepo {
    /// Load display data for every id that has a row; unknown ids are skipped.
    pub async fn find_many(pool: &PgPool, ids: &[DbId]) -> Result<Vec<UserSummary>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = ANY($1)");
        sqlx::query_as::<_, UserSummary>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Insert or refresh a user's display data.
    pub async fn upsert(pool: &PgPool, user: &UserSummary) -> Result<UserSummary, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (id, name, email, role) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET \
                name = EXCLUDED.name, email = EXCLUDED.email, role = EXCLUDED.role \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSummary>(&query)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.role)
            .fetch_one(pool)
            .await
    }
}
