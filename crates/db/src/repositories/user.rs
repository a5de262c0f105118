//! User repository for database operations.

use chrono::Utc;
use grocer_shared::Role;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use crate::entities::users;

/// User repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

/// Emails are compared case-insensitively.
fn email_matches(email: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col((users::Entity, users::Column::Email))))
        .eq(email.trim().to_lowercase())
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(email_matches(email))
            .one(&self.db)
            .await
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(id).one(&self.db).await
    }

    /// Creates a new user. The email is stored lowercased.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails, including a unique
    /// violation on the email.
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        role: Role,
    ) -> Result<users::Model, DbErr> {
        let now = Utc::now().into();
        let user = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.trim().to_lowercase()),
            password_hash: Set(password_hash.to_string()),
            name: Set(name.trim().to_string()),
            role: Set(role.as_str().to_string()),
            franchise_id: Set(None),
            loyalty_points: Set(0),
            is_blocked: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        user.insert(&self.db).await
    }

    /// Checks if an email is already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn email_exists(&self, email: &str) -> Result<bool, DbErr> {
        let count = users::Entity::find()
            .filter(email_matches(email))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }

    /// Replaces a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), DbErr> {
        let now = Utc::now();
        users::Entity::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
