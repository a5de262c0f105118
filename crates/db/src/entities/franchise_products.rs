//! `SeaORM` Entity for franchise_products table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "franchise_products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub franchise_id: Uuid,
    pub product_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub retail_price_override: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub promotion_price_override: Option<Decimal>,
    pub stock_qty: i32,
    pub reorder_level: i32,
    pub shelf_location: Option<String>,
    pub is_available: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::franchises::Entity",
        from = "Column::FranchiseId",
        to = "super::franchises::Column::Id"
    )]
    Franchises,
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id"
    )]
    Products,
}

impl Related<super::franchises::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Franchises.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
