use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemId, OrderId, UserId};
use domain::{
    Cart, CartLine, CatalogItem, Money, Order, OrderLine, OrderNumber, OrderParts, OrderStatus,
    PaymentMethod, ShippingAddress,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{OrderQuery, Result, ShopStore, StoreError};

const ORDER_COLUMNS: &str = "id, order_number, user_id, total_bill_cents, street, city, state, \
     zip_code, country, payment_method, status, is_deleted, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, item_no, name, description, quantity, unit_price_cents, \
     category, reorder_level, created_at, updated_at";

/// PostgreSQL-backed store implementation.
///
/// Atomic units run inside one transaction. Stock is taken with
/// `UPDATE … WHERE quantity >= $n`, so two concurrent placements cannot
/// both take the last units.
#[derive(Clone)]
pub struct PostgresShopStore {
    pool: PgPool,
}

impl PostgresShopStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` with a pool of at most `max_connections`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_item(row: &PgRow) -> Result<CatalogItem> {
        Ok(CatalogItem {
            id: ItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            item_no: row.try_get("item_no")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            quantity: to_u32(row.try_get("quantity")?, "items.quantity")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            category: row.try_get("category")?,
            reorder_level: to_u32(row.try_get("reorder_level")?, "items.reorder_level")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order_line(row: &PgRow) -> Result<(Uuid, OrderLine)> {
        let order_id: Uuid = row.try_get("order_id")?;
        let line = OrderLine {
            item_id: ItemId::from_uuid(row.try_get::<Uuid, _>("item_id")?),
            name: row.try_get("name")?,
            quantity: to_u32(row.try_get("quantity")?, "order_lines.quantity")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        };
        Ok((order_id, line))
    }

    fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let payment_method: String = row.try_get("payment_method")?;
        let payment_method =
            PaymentMethod::new(payment_method).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        Ok(Order::from_parts(OrderParts {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_number: OrderNumber::from_stored(row.try_get::<String, _>("order_number")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            lines,
            total_bill: Money::from_cents(row.try_get("total_bill_cents")?),
            address: ShippingAddress {
                street: row.try_get("street")?,
                city: row.try_get("city")?,
                state: row.try_get("state")?,
                zip_code: row.try_get("zip_code")?,
                country: row.try_get("country")?,
            },
            payment_method,
            status,
            is_deleted: row.try_get("is_deleted")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }

    /// Loads the lines of several orders, keyed by order id, in line order.
    async fn fetch_order_lines(&self, order_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<OrderLine>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, item_id, name, quantity, unit_price_cents, subtotal_cents
            FROM order_lines
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for row in &rows {
            let (order_id, line) = Self::row_to_order_line(row)?;
            lines.entry(order_id).or_default().push(line);
        }
        Ok(lines)
    }

    /// Takes stock for one line, or explains why it could not.
    async fn reserve_line(
        tx: &mut Transaction<'_, Postgres>,
        line: &OrderLine,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE items
            SET quantity = quantity - $2, updated_at = $3
            WHERE id = $1 AND quantity >= $2
            RETURNING quantity
            "#,
        )
        .bind(line.item_id.as_uuid())
        .bind(i64::from(line.quantity))
        .bind(at)
        .fetch_optional(&mut **tx)
        .await?;

        if remaining.is_some() {
            return Ok(());
        }

        let available: Option<i64> = sqlx::query_scalar("SELECT quantity FROM items WHERE id = $1")
            .bind(line.item_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        match available {
            None => Err(StoreError::ItemNotFound(line.item_id)),
            Some(available) => Err(StoreError::InsufficientStock {
                item_id: line.item_id,
                available: to_u32(available, "items.quantity")?,
                requested: line.quantity,
            }),
        }
    }

    /// Writes `order`'s status only if the stored status is still `expected`.
    async fn swap_status(
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2",
        )
        .bind(order.id().as_uuid())
        .bind(expected.as_str())
        .bind(order.status().as_str())
        .bind(order.updated_at())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let actual: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(order.id().as_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        Err(match actual {
            None => StoreError::OrderNotFound(order.id()),
            Some(actual) => StoreError::StatusConflict {
                order_id: order.id(),
                expected,
                actual: actual
                    .parse()
                    .map_err(|e: domain::DomainError| StoreError::Corrupt(e.to_string()))?,
            },
        })
    }
}

/// An order's lines sorted by item id. Item rows are always locked in this
/// order.
fn lines_by_item(order: &Order) -> Vec<&OrderLine> {
    let mut lines: Vec<&OrderLine> = order.lines().iter().collect();
    lines.sort_by_key(|line| line.item_id);
    lines
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.constraint() == Some(constraint);
    }
    false
}

#[async_trait]
impl ShopStore for PostgresShopStore {
    async fn insert_item(&self, item: &CatalogItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (id, item_no, name, description, quantity, unit_price_cents,
                               category, reorder_level, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.item_no)
        .bind(&item.name)
        .bind(&item.description)
        .bind(i64::from(item.quantity))
        .bind(item.unit_price.cents())
        .bind(&item.category)
        .bind(i64::from(item.reorder_level))
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "items_item_no_key") {
                return StoreError::DuplicateItemNo(item.item_no.clone());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn update_item(&self, item: &CatalogItem) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET item_no = $2, name = $3, description = $4, quantity = $5,
                unit_price_cents = $6, category = $7, reorder_level = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.item_no)
        .bind(&item.name)
        .bind(&item.description)
        .bind(i64::from(item.quantity))
        .bind(item.unit_price.cents())
        .bind(&item.category)
        .bind(i64::from(item.reorder_level))
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "items_item_no_key") {
                return StoreError::DuplicateItemNo(item.item_no.clone());
            }
            StoreError::Database(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ItemNotFound(item.id));
        }
        Ok(())
    }

    async fn delete_item(&self, item_id: ItemId) -> Result<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(item_id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ItemNotFound(item_id));
        }
        Ok(())
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Option<CatalogItem>> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
            .bind(item_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn list_items(&self) -> Result<Vec<CatalogItem>> {
        let rows = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY item_no ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_item).collect()
    }

    async fn decrement_quantity(&self, item_id: ItemId, quantity: u32) -> Result<u32> {
        let mut tx = self.pool.begin().await?;
        let line = OrderLine {
            item_id,
            name: String::new(),
            quantity,
            unit_price: Money::zero(),
            subtotal: Money::zero(),
        };
        Self::reserve_line(&mut tx, &line, Utc::now()).await?;

        let remaining: i64 = sqlx::query_scalar("SELECT quantity FROM items WHERE id = $1")
            .bind(item_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        to_u32(remaining, "items.quantity")
    }

    async fn increment_quantity(&self, item_id: ItemId, quantity: u32) -> Result<u32> {
        let quantity: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE items
            SET quantity = quantity + $2, updated_at = $3
            WHERE id = $1
            RETURNING quantity
            "#,
        )
        .bind(item_id.as_uuid())
        .bind(i64::from(quantity))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        let quantity = quantity.ok_or(StoreError::ItemNotFound(item_id))?;
        to_u32(quantity, "items.quantity")
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let updated_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT updated_at FROM carts WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        let Some(updated_at) = updated_at else {
            return Ok(None);
        };

        let rows = sqlx::query(
            r#"
            SELECT item_id, quantity, price_cents
            FROM cart_lines
            WHERE user_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let lines = rows
            .iter()
            .map(|row| {
                Ok(CartLine {
                    item_id: ItemId::from_uuid(row.try_get::<Uuid, _>("item_id")?),
                    quantity: to_u32(row.try_get("quantity")?, "cart_lines.quantity")?,
                    price: Money::from_cents(row.try_get("price_cents")?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Cart::restore(user_id, lines, updated_at)))
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let user_id = cart.user_id().as_uuid();

        sqlx::query(
            r#"
            INSERT INTO carts (user_id, total_cents, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET total_cents = EXCLUDED.total_cents, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id)
        .bind(cart.total().cents())
        .bind(cart.updated_at())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for (position, line) in cart.lines().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_lines (user_id, item_id, position, quantity, price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(user_id)
            .bind(line.item_id.as_uuid())
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .bind(i64::from(line.quantity))
            .bind(line.price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut lines = self.fetch_order_lines(&[order_id.as_uuid()]).await?;
        let lines = lines.remove(&order_id.as_uuid()).unwrap_or_default();
        Self::row_to_order(&row, lines).map(Some)
    }

    async fn query_orders(&self, query: &OrderQuery) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3 OR NOT is_deleted)
            ORDER BY created_at DESC
            "#
        ))
        .bind(query.user_id.map(|id| id.as_uuid()))
        .bind(query.status.map(|status| status.as_str()))
        .bind(query.include_deleted)
        .fetch_all(&self.pool)
        .await?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut lines = self.fetch_order_lines(&ids).await?;

        rows.iter()
            .zip(ids)
            .map(|(row, id)| Self::row_to_order(row, lines.remove(&id).unwrap_or_default()))
            .collect()
    }

    async fn mark_order_deleted(&self, order_id: OrderId, at: DateTime<Utc>) -> Result<()> {
        let result =
            sqlx::query("UPDATE orders SET is_deleted = TRUE, updated_at = $2 WHERE id = $1")
                .bind(order_id.as_uuid())
                .bind(at)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(order_id));
        }
        Ok(())
    }

    async fn force_order_status(&self, order: &Order, expected: OrderStatus) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::swap_status(&mut tx, order, expected).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn place_order(&self, order: &Order, clear_cart_of: Option<UserId>) -> Result<()> {
        // Dropping `tx` on any early return rolls the whole unit back.
        let mut tx = self.pool.begin().await?;

        for line in lines_by_item(order) {
            Self::reserve_line(&mut tx, line, order.created_at()).await?;
        }

        let address = order.address();
        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, user_id, total_bill_cents, street, city, state,
                                zip_code, country, payment_method, status, is_deleted,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.order_number().as_str())
        .bind(order.user_id().as_uuid())
        .bind(order.total_bill().cents())
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.zip_code)
        .bind(&address.country)
        .bind(order.payment_method().as_str())
        .bind(order.status().as_str())
        .bind(order.is_deleted())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "orders_order_number_key") {
                return StoreError::DuplicateOrderNumber(order.order_number().to_string());
            }
            StoreError::Database(e)
        })?;

        for (line_no, line) in order.lines().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, line_no, item_id, name, quantity,
                                         unit_price_cents, subtotal_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(i32::try_from(line_no).unwrap_or(i32::MAX))
            .bind(line.item_id.as_uuid())
            .bind(&line.name)
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.cents())
            .bind(line.subtotal.cents())
            .execute(&mut *tx)
            .await?;
        }

        if let Some(user_id) = clear_cart_of {
            sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE carts SET total_cents = 0, updated_at = $2 WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .bind(order.created_at())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn cancel_order(&self, order: &Order, expected: OrderStatus) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        Self::swap_status(&mut tx, order, expected).await?;

        for line in lines_by_item(order) {
            let restocked = sqlx::query(
                "UPDATE items SET quantity = quantity + $2, updated_at = $3 WHERE id = $1",
            )
            .bind(line.item_id.as_uuid())
            .bind(i64::from(line.quantity))
            .bind(order.updated_at())
            .execute(&mut *tx)
            .await?;

            if restocked.rows_affected() == 0 {
                tracing::warn!(
                    order_id = %order.id(),
                    item_id = %line.item_id,
                    "restock skipped: item no longer in catalog"
                );
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
