//! Product catalogue service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{CreateProductInput, Product, ProductCategory, Unit};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Product service for managing the establishment's catalogue
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Row for product queries
#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    id: Uuid,
    name: String,
    category: String,
    unit: String,
    min_stock_threshold: Decimal,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = AppError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let unit = Unit::from_code(&row.unit)
            .ok_or_else(|| AppError::Internal(format!("Unknown unit '{}' on product {}", row.unit, row.id)))?;

        Ok(Product {
            id: row.id,
            name: row.name,
            category: ProductCategory::from_code(&row.category),
            unit,
            min_stock_threshold: row.min_stock_threshold,
            created_at: row.created_at,
        })
    }
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List products of an establishment
    pub async fn list_products(&self, establishment_id: Uuid) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, category, unit, min_stock_threshold, created_at
            FROM products
            WHERE establishment_id = $1
            ORDER BY name
            "#,
        )
        .bind(establishment_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Create a product
    pub async fn create_product(
        &self,
        establishment_id: Uuid,
        input: CreateProductInput,
    ) -> AppResult<Product> {
        input.validate()?;

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (establishment_id, name, category, unit, min_stock_threshold)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, category, unit, min_stock_threshold, created_at
            "#,
        )
        .bind(establishment_id)
        .bind(input.name.trim())
        .bind(input.category.as_str())
        .bind(input.unit.code())
        .bind(input.min_stock_threshold)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(product_id = %row.id, "Product created");

        Product::try_from(row)
    }

    /// Check that a product belongs to the establishment
    pub async fn ensure_owned(&self, establishment_id: Uuid, product_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND establishment_id = $2)",
        )
        .bind(product_id)
        .bind(establishment_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        Ok(())
    }
}
