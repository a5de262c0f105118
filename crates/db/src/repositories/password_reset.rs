//! Single-use password reset tokens.

use chrono::{Duration, Utc};
use grocer_core::auth::generate_reset_token;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use super::session::SessionRepository;
use crate::entities::password_resets;

/// How long a reset link stays valid.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Password reset repository.
#[derive(Debug, Clone)]
pub struct PasswordResetRepository {
    db: DatabaseConnection,
}

impl PasswordResetRepository {
    /// Creates a new password reset repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Issues a fresh token, invalidating older ones.
    /// Returns the raw token to be emailed; only its hash is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create_token(&self, user_id: Uuid) -> Result<String, DbErr> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        password_resets::Entity::update_many()
            .col_expr(password_resets::Column::UsedAt, Expr::value(now))
            .filter(password_resets::Column::UserId.eq(user_id))
            .filter(password_resets::Column::UsedAt.is_null())
            .exec(&txn)
            .await?;

        let raw_token = generate_reset_token();
        password_resets::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            token_hash: Set(SessionRepository::hash_token(&raw_token)),
            expires_at: Set((now + Duration::hours(RESET_TOKEN_TTL_HOURS)).into()),
            used_at: Set(None),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(raw_token)
    }

    /// Marks a live token used and returns its owner.
    ///
    /// Returns `None` for unknown, expired, or already-used tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn consume(&self, raw_token: &str) -> Result<Option<Uuid>, DbErr> {
        let now = Utc::now();
        let token_hash = SessionRepository::hash_token(raw_token);

        let Some(token) = password_resets::Entity::find()
            .filter(password_resets::Column::TokenHash.eq(&token_hash))
            .filter(password_resets::Column::UsedAt.is_null())
            .filter(password_resets::Column::ExpiresAt.gt(now))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        // Guarded on used_at so two concurrent resets cannot both win.
        let claimed = password_resets::Entity::update_many()
            .col_expr(password_resets::Column::UsedAt, Expr::value(now))
            .filter(password_resets::Column::Id.eq(token.id))
            .filter(password_resets::Column::UsedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok((claimed.rows_affected == 1).then_some(token.user_id))
    }
}
