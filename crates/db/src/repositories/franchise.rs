//! Franchise repository.

use grocer_core::order::{DeliveryPolicy, FranchiseLocation, GeoPoint};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::entities::franchises;

/// Reads franchises for checkout resolution.
#[derive(Debug, Clone)]
pub struct FranchiseRepository {
    db: DatabaseConnection,
}

impl FranchiseRepository {
    /// Creates a new franchise repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an active, non-deleted franchise.
    pub async fn find_active(&self, id: Uuid) -> Result<Option<franchises::Model>, DbErr> {
        franchises::Entity::find_by_id(id)
            .filter(franchises::Column::IsActive.eq(true))
            .filter(franchises::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
    }

    /// Loads every active franchise.
    pub async fn list_active(&self) -> Result<Vec<franchises::Model>, DbErr> {
        franchises::Entity::find()
            .filter(franchises::Column::IsActive.eq(true))
            .filter(franchises::Column::DeletedAt.is_null())
            .order_by_asc(franchises::Column::Id)
            .all(&self.db)
            .await
    }
}

/// Geo view of a franchise row.
#[must_use]
pub fn location(franchise: &franchises::Model) -> FranchiseLocation {
    FranchiseLocation {
        id: franchise.id,
        location: GeoPoint::new(franchise.latitude, franchise.longitude),
        delivery_radius_km: franchise.delivery_radius_km,
    }
}

/// The franchise's own delivery terms.
#[must_use]
pub const fn delivery_policy(franchise: &franchises::Model) -> DeliveryPolicy {
    DeliveryPolicy {
        fee: franchise.delivery_fee,
        free_threshold: franchise.free_delivery_min,
    }
}
