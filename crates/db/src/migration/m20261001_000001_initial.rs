//! Initial database migration.
//!
//! Creates users, franchises, the master catalog with per-franchise
//! overrides, carts, and orders.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ACCOUNTS & FRANCHISES
        // ============================================================
        db.execute_unprepared(FRANCHISES_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;

        // ============================================================
        // PART 2: MASTER CATALOG
        // ============================================================
        db.execute_unprepared(CATEGORIES_SQL).await?;
        db.execute_unprepared(PRODUCTS_SQL).await?;
        db.execute_unprepared(PRODUCT_IMAGES_SQL).await?;

        // ============================================================
        // PART 3: FRANCHISE OVERRIDES & PROMOTIONS
        // ============================================================
        db.execute_unprepared(FRANCHISE_PRODUCTS_SQL).await?;
        db.execute_unprepared(PROMOTIONS_SQL).await?;

        // ============================================================
        // PART 4: CART & ORDERS
        // ============================================================
        db.execute_unprepared(CART_ITEMS_SQL).await?;
        db.execute_unprepared(ORDERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const FRANCHISES_SQL: &str = r"
CREATE TABLE franchises (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    slug VARCHAR(100) NOT NULL,
    owner_id UUID,
    address TEXT,
    latitude DOUBLE PRECISION NOT NULL,
    longitude DOUBLE PRECISION NOT NULL,
    delivery_radius_km DOUBLE PRECISION NOT NULL DEFAULT 5,
    delivery_fee NUMERIC(12, 2) NOT NULL DEFAULT 3.75,
    free_delivery_min NUMERIC(12, 2) NOT NULL DEFAULT 20,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ,
    CONSTRAINT chk_franchise_radius CHECK (delivery_radius_km >= 0),
    CONSTRAINT chk_franchise_fees CHECK (delivery_fee >= 0 AND free_delivery_min >= 0)
);

CREATE UNIQUE INDEX idx_franchises_slug ON franchises(slug);
CREATE INDEX idx_franchises_active ON franchises(id) WHERE is_active AND deleted_at IS NULL;
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL,
    password_hash VARCHAR(255) NOT NULL,
    name VARCHAR(255) NOT NULL,
    role VARCHAR(32) NOT NULL DEFAULT 'customer',
    franchise_id UUID REFERENCES franchises(id) ON DELETE SET NULL,
    loyalty_points INTEGER NOT NULL DEFAULT 0,
    is_blocked BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_user_role CHECK (role IN ('customer', 'franchise_staff', 'franchise_owner', 'admin')),
    CONSTRAINT chk_loyalty_points CHECK (loyalty_points >= 0)
);

CREATE UNIQUE INDEX idx_users_email ON users(lower(email));
CREATE INDEX idx_users_franchise ON users(franchise_id) WHERE franchise_id IS NOT NULL;

ALTER TABLE franchises
    ADD CONSTRAINT fk_franchises_owner FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE SET NULL;
";

const CATEGORIES_SQL: &str = r"
CREATE TABLE categories (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ
);

CREATE TABLE subcategories (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    category_id UUID NOT NULL REFERENCES categories(id) ON DELETE RESTRICT,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ
);

CREATE INDEX idx_subcategories_category ON subcategories(category_id) WHERE deleted_at IS NULL;
";

const PRODUCTS_SQL: &str = r"
-- Monotonic source for generated SKUs
CREATE SEQUENCE product_sku_seq START 1;

CREATE TABLE products (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    sku VARCHAR(64) NOT NULL,
    item_name VARCHAR(255) NOT NULL,
    description TEXT,
    category_id UUID NOT NULL REFERENCES categories(id) ON DELETE RESTRICT,
    subcategory_id UUID REFERENCES subcategories(id) ON DELETE SET NULL,
    cost_price NUMERIC(12, 2) NOT NULL DEFAULT 0,
    retail_price NUMERIC(12, 2) NOT NULL,
    promotion_price NUMERIC(12, 2),
    promotion_start DATE,
    promotion_end DATE,
    stock_qty INTEGER NOT NULL DEFAULT 0,
    reorder_level INTEGER NOT NULL DEFAULT 0,
    shelf_location VARCHAR(64),
    is_vegan BOOLEAN NOT NULL DEFAULT false,
    is_vegetarian BOOLEAN NOT NULL DEFAULT false,
    is_gluten_free BOOLEAN NOT NULL DEFAULT false,
    is_organic BOOLEAN NOT NULL DEFAULT false,
    status VARCHAR(16) NOT NULL DEFAULT 'active',
    online_visible BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ,
    CONSTRAINT chk_product_status CHECK (status IN ('active', 'inactive')),
    CONSTRAINT chk_product_stock CHECK (stock_qty >= 0),
    CONSTRAINT chk_product_prices CHECK (
        cost_price >= 0 AND retail_price >= 0 AND (promotion_price IS NULL OR promotion_price >= 0)
    )
);

CREATE UNIQUE INDEX idx_products_sku ON products(sku) WHERE deleted_at IS NULL;
CREATE INDEX idx_products_category ON products(category_id) WHERE deleted_at IS NULL;
CREATE INDEX idx_products_storefront ON products(status, online_visible) WHERE deleted_at IS NULL;
";

const PRODUCT_IMAGES_SQL: &str = r"
CREATE TABLE product_images (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    product_id UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    image_url TEXT NOT NULL,
    is_primary BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ
);

CREATE INDEX idx_product_images_product ON product_images(product_id) WHERE deleted_at IS NULL;

-- At most one primary image per product
CREATE UNIQUE INDEX idx_product_images_primary ON product_images(product_id)
    WHERE is_primary AND deleted_at IS NULL;
";

const FRANCHISE_PRODUCTS_SQL: &str = r"
CREATE TABLE franchise_products (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    franchise_id UUID NOT NULL REFERENCES franchises(id) ON DELETE CASCADE,
    product_id UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    retail_price_override NUMERIC(12, 2),
    promotion_price_override NUMERIC(12, 2),
    stock_qty INTEGER NOT NULL DEFAULT 0,
    reorder_level INTEGER NOT NULL DEFAULT 0,
    shelf_location VARCHAR(64),
    is_available BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_franchise_product UNIQUE (franchise_id, product_id),
    CONSTRAINT chk_franchise_stock CHECK (stock_qty >= 0)
);

CREATE INDEX idx_franchise_products_product ON franchise_products(product_id);
";

const PROMOTIONS_SQL: &str = r"
CREATE TABLE promotions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    description TEXT,
    discount_percent NUMERIC(5, 2),
    starts_on DATE,
    ends_on DATE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ
);

CREATE TABLE franchise_promotions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    franchise_id UUID NOT NULL REFERENCES franchises(id) ON DELETE CASCADE,
    promotion_id UUID NOT NULL REFERENCES promotions(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ
);
";

const CART_ITEMS_SQL: &str = r"
CREATE TABLE cart_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    product_id UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    franchise_id UUID REFERENCES franchises(id) ON DELETE SET NULL,
    quantity INTEGER NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ,
    CONSTRAINT chk_cart_quantity CHECK (quantity >= 1)
);

CREATE UNIQUE INDEX idx_cart_items_user_product ON cart_items(user_id, product_id)
    WHERE deleted_at IS NULL;
";

const ORDERS_SQL: &str = r"
CREATE TABLE orders (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    franchise_id UUID REFERENCES franchises(id) ON DELETE RESTRICT,
    order_number VARCHAR(32) NOT NULL,
    status VARCHAR(32) NOT NULL DEFAULT 'pending',
    subtotal NUMERIC(12, 2) NOT NULL,
    delivery_fee NUMERIC(12, 2) NOT NULL,
    total NUMERIC(12, 2) NOT NULL,
    delivery_address TEXT NOT NULL,
    payment_method VARCHAR(64) NOT NULL DEFAULT 'cash_on_delivery',
    points_earned INTEGER NOT NULL DEFAULT 0,
    customer_lat DOUBLE PRECISION,
    customer_lng DOUBLE PRECISION,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ,
    CONSTRAINT uq_orders_number UNIQUE (order_number),
    CONSTRAINT chk_order_status CHECK (
        status IN ('pending', 'confirmed', 'preparing', 'out_for_delivery', 'delivered', 'cancelled')
    ),
    CONSTRAINT chk_order_total CHECK (total = subtotal + delivery_fee)
);

CREATE INDEX idx_orders_user ON orders(user_id, created_at DESC) WHERE deleted_at IS NULL;
CREATE INDEX idx_orders_franchise ON orders(franchise_id, created_at DESC) WHERE deleted_at IS NULL;

CREATE TABLE order_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
    product_id UUID NOT NULL REFERENCES products(id) ON DELETE RESTRICT,
    item_name VARCHAR(255) NOT NULL,
    image_url TEXT,
    quantity INTEGER NOT NULL,
    price NUMERIC(12, 2) NOT NULL,
    stock_source VARCHAR(16),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_order_item_quantity CHECK (quantity >= 1),
    CONSTRAINT chk_order_item_source CHECK (stock_source IS NULL OR stock_source IN ('franchise', 'master'))
);

CREATE INDEX idx_order_items_order ON order_items(order_id);
CREATE INDEX idx_order_items_product ON order_items(product_id);
CREATE INDEX idx_order_items_image ON order_items(image_url) WHERE image_url IS NOT NULL;
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS order_items CASCADE;
DROP TABLE IF EXISTS orders CASCADE;
DROP TABLE IF EXISTS cart_items CASCADE;
DROP TABLE IF EXISTS franchise_promotions CASCADE;
DROP TABLE IF EXISTS promotions CASCADE;
DROP TABLE IF EXISTS franchise_products CASCADE;
DROP TABLE IF EXISTS product_images CASCADE;
DROP TABLE IF EXISTS products CASCADE;
DROP SEQUENCE IF EXISTS product_sku_seq;
DROP TABLE IF EXISTS subcategories CASCADE;
DROP TABLE IF EXISTS categories CASCADE;
ALTER TABLE IF EXISTS franchises DROP CONSTRAINT IF EXISTS fk_franchises_owner;
DROP TABLE IF EXISTS users CASCADE;
DROP TABLE IF EXISTS franchises CASCADE;
";
