//! Session repository for refresh-token management.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::entities::sessions;

/// Client details recorded with a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientInfo<'a> {
    /// `User-Agent` header.
    pub user_agent: Option<&'a str>,
    /// Remote address.
    pub ip_address: Option<&'a str>,
}

/// Session repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    db: DatabaseConnection,
}

impl SessionRepository {
    /// Creates a new session repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Hashes a refresh token for storage.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Creates a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
        client: ClientInfo<'_>,
    ) -> Result<sessions::Model, DbErr> {
        session_model(user_id, refresh_token, expires_at, client)
            .insert(&self.db)
            .await
    }

    /// Finds a live session by refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<sessions::Model>, DbErr> {
        sessions::Entity::find()
            .filter(sessions::Column::RefreshTokenHash.eq(Self::hash_token(refresh_token)))
            .filter(sessions::Column::RevokedAt.is_null())
            .filter(sessions::Column::ExpiresAt.gt(Utc::now()))
            .one(&self.db)
            .await
    }

    /// Revokes the session holding `refresh_token`. Returns false if none was live.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke_by_token(&self, refresh_token: &str) -> Result<bool, DbErr> {
        let now = Utc::now();
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::RevokedAt, Expr::value(now))
            .col_expr(sessions::Column::UpdatedAt, Expr::value(now))
            .filter(sessions::Column::RefreshTokenHash.eq(Self::hash_token(refresh_token)))
            .filter(sessions::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Revokes the presented session and stores its replacement atomically.
    ///
    /// Returns `None` when the presented token was already revoked, which
    /// makes a replayed refresh token useless.
    ///
    /// # Errors
    ///
    /// Returns an error if the database transaction fails.
    pub async fn rotate(
        &self,
        old_refresh_token: &str,
        user_id: Uuid,
        new_refresh_token: &str,
        expires_at: DateTime<Utc>,
        client: ClientInfo<'_>,
    ) -> Result<Option<sessions::Model>, DbErr> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let revoked = sessions::Entity::update_many()
            .col_expr(sessions::Column::RevokedAt, Expr::value(now))
            .col_expr(sessions::Column::UpdatedAt, Expr::value(now))
            .filter(sessions::Column::RefreshTokenHash.eq(Self::hash_token(old_refresh_token)))
            .filter(sessions::Column::UserId.eq(user_id))
            .filter(sessions::Column::RevokedAt.is_null())
            .exec(&txn)
            .await?;
        if revoked.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let session = session_model(user_id, new_refresh_token, expires_at, client)
            .insert(&txn)
            .await?;
        txn.commit().await?;
        Ok(Some(session))
    }

    /// Revokes all sessions for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke_all_user_sessions(&self, user_id: Uuid) -> Result<u64, DbErr> {
        let now = Utc::now();

        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::RevokedAt, Expr::value(now))
            .col_expr(sessions::Column::UpdatedAt, Expr::value(now))
            .filter(sessions::Column::UserId.eq(user_id))
            .filter(sessions::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}

fn session_model(
    user_id: Uuid,
    refresh_token: &str,
    expires_at: DateTime<Utc>,
    client: ClientInfo<'_>,
) -> sessions::ActiveModel {
    let now = Utc::now().into();
    sessions::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        refresh_token_hash: Set(SessionRepository::hash_token(refresh_token)),
        user_agent: Set(client.user_agent.map(String::from)),
        ip_address: Set(client.ip_address.map(String::from)),
        expires_at: Set(expires_at.into()),
        revoked_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let a = SessionRepository::hash_token("refresh-token");
        let b = SessionRepository::hash_token("refresh-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, SessionRepository::hash_token("other-token"));
    }
}
