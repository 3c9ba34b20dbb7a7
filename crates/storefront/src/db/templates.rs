//! Template and template category repository.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use signcraft_core::api::{CategoryView, TemplateInput, TemplateView};
use signcraft_core::{TemplateCategoryId, TemplateId};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct TemplateRow {
    id: TemplateId,
    name: String,
    category_id: Option<TemplateCategoryId>,
    canvas: JsonValue,
    preview_svg: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TemplateRow> for TemplateView {
    fn from(r: TemplateRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            category_id: r.category_id,
            canvas: r.canvas,
            preview_svg: r.preview_svg,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: TemplateCategoryId,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for CategoryView {
    fn from(r: CategoryRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            created_at: r.created_at,
        }
    }
}

const TEMPLATE_COLUMNS: &str =
    "id, name, category_id, canvas, preview_svg, created_at, updated_at";

/// Repository for templates and their categories.
pub struct TemplateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TemplateRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Templates
    // =========================================================================

    /// List templates by name, optionally within one category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        category: Option<TemplateCategoryId>,
    ) -> Result<Vec<TemplateView>, RepositoryError> {
        let rows = sqlx::query_as::<_, TemplateRow>(&format!(
            r"
            SELECT {TEMPLATE_COLUMNS} FROM templates
            WHERE $1::uuid IS NULL OR category_id = $1
            ORDER BY name, created_at
            "
        ))
        .bind(category)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(TemplateView::from).collect())
    }

    /// Get a template by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: TemplateId) -> Result<Option<TemplateView>, RepositoryError> {
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(TemplateView::from))
    }

    /// Insert a template. The canvas must already be sanitized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    pub async fn create(&self, input: &TemplateInput) -> Result<TemplateView, RepositoryError> {
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            r"
            INSERT INTO templates (id, name, category_id, canvas, preview_svg)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TEMPLATE_COLUMNS}
            "
        ))
        .bind(TemplateId::generate())
        .bind(&input.name)
        .bind(input.category_id)
        .bind(&input.canvas)
        .bind(&input.preview_svg)
        .fetch_one(self.pool)
        .await
        .map_err(map_category_fk)?;

        Ok(row.into())
    }

    /// Replace a template's content.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the template or category
    /// doesn't exist.
    pub async fn update(
        &self,
        id: TemplateId,
        input: &TemplateInput,
    ) -> Result<TemplateView, RepositoryError> {
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            r"
            UPDATE templates
            SET name = $2, category_id = $3, canvas = $4, preview_svg = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {TEMPLATE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.name)
        .bind(input.category_id)
        .bind(&input.canvas)
        .bind(&input.preview_svg)
        .fetch_optional(self.pool)
        .await
        .map_err(map_category_fk)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a template.
    ///
    /// # Returns
    ///
    /// Returns `true` if the template was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: TemplateId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// List categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<CategoryView>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, created_at FROM template_categories ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CategoryView::from).collect())
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create_category(&self, name: &str) -> Result<CategoryView, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO template_categories (id, name)
            VALUES ($1, $2)
            RETURNING id, name, created_at
            ",
        )
        .bind(TemplateCategoryId::generate())
        .bind(name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "category"))?;

        Ok(row.into())
    }

    /// Delete a category. Its templates become uncategorised.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_category(&self, id: TemplateCategoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM template_categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// A foreign key failure on insert/update means the category is unknown.
fn map_category_fk(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::NotFound;
    }
    RepositoryError::Database(e)
}
