//! `SeaORM` Entity for products table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sku: String,
    pub item_name: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub cost_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub retail_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub promotion_price: Option<Decimal>,
    pub promotion_start: Option<Date>,
    pub promotion_end: Option<Date>,
    pub stock_qty: i32,
    pub reorder_level: i32,
    pub shelf_location: Option<String>,
    pub is_vegan: bool,
    pub is_vegetarian: bool,
    pub is_gluten_free: bool,
    pub is_organic: bool,
    pub status: String,
    pub online_visible: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id"
    )]
    Categories,
    #[sea_orm(has_many = "super::product_images::Entity")]
    ProductImages,
    #[sea_orm(has_many = "super::franchise_products::Entity")]
    FranchiseProducts,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::product_images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductImages.def()
    }
}

impl Related<super::franchise_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FranchiseProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
