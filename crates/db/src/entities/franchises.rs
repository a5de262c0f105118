//! `SeaORM` Entity for franchises table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "franchises")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub owner_id: Option<Uuid>,
    pub address: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub latitude: f64,
    #[sea_orm(column_type = "Double")]
    pub longitude: f64,
    #[sea_orm(column_type = "Double")]
    pub delivery_radius_km: f64,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub delivery_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub free_delivery_min: Decimal,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::franchise_products::Entity")]
    FranchiseProducts,
}

impl Related<super::franchise_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FranchiseProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
