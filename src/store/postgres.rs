//! PostgreSQL store backed by sqlx.
//!
//! Role and category columns are plain TEXT constrained by CHECK clauses;
//! rows are mapped by hand so an out-of-range value surfaces as a storage
//! error instead of a panic. Assignment writes take a row lock on the user
//! so concurrent mutations of one account's set serialize at the database
//! as well.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{AppError, ErrorCode, Result};
use crate::rbac::Role;
use crate::services::{NewService, Service, ServiceCategory, ServiceChanges};
use crate::users::{NewUser, User, UserChanges};

use super::{ServiceStore, UserStore};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to the database and run pending migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await.map_err(|err| {
            AppError::with_internal(
                ErrorCode::DatabaseError,
                "A storage error occurred",
                format!("migration failed: {err}"),
            )
        })?;

        info!("database connected and migrated");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load the non-deleted services assigned to each of the given users,
    /// keyed by user id.
    async fn load_assignments(&self, user_ids: &[i64]) -> Result<HashMap<i64, Vec<Service>>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT us.user_id,
                   s.id, s.name, s.description, s.cost, s.category,
                   s.created_at, s.updated_at, s.deleted_at
            FROM users_services us
            JOIN services s ON s.id = us.service_id
            WHERE us.user_id = ANY($1) AND s.deleted_at IS NULL
            ORDER BY s.id
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_user: HashMap<i64, Vec<Service>> = HashMap::new();
        for row in rows {
            let user_id: i64 = row.try_get("user_id")?;
            by_user.entry(user_id).or_default().push(map_service(&row)?);
        }
        Ok(by_user)
    }
}

fn map_user(row: &PgRow) -> Result<User> {
    let role_text: String = row.try_get("role")?;
    let role: Role = role_text.parse().map_err(|err| {
        AppError::with_internal(
            ErrorCode::DatabaseError,
            "A storage error occurred",
            format!("corrupt role column: {err}"),
        )
    })?;

    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password: row.try_get("password")?,
        role,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
        services: Vec::new(),
    })
}

fn map_service(row: &PgRow) -> Result<Service> {
    let category_text: String = row.try_get("category")?;
    let category: ServiceCategory = category_text.parse().map_err(|err| {
        AppError::with_internal(
            ErrorCode::DatabaseError,
            "A storage error occurred",
            format!("corrupt category column: {err}"),
        )
    })?;

    Ok(Service {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        cost: row.try_get("cost")?,
        category,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn insert(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (name, email, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password, role,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await?;

        map_user(&row)
    }

    async fn find_all(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, password, role,
                   created_at, updated_at, deleted_at
            FROM users
            WHERE deleted_at IS NULL
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut users = rows
            .iter()
            .map(map_user)
            .collect::<Result<Vec<User>>>()?;

        let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
        let mut assignments = self.load_assignments(&ids).await?;
        for user in &mut users {
            if let Some(services) = assignments.remove(&user.id) {
                user.services = services;
            }
        }
        Ok(users)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password, role,
                   created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut user = map_user(&row)?;
                let mut assignments = self.load_assignments(&[user.id]).await?;
                user.services = assignments.remove(&user.id).unwrap_or_default();
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password, role,
                   created_at, updated_at, deleted_at
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.role.map(|r| r.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn soft_delete(&self, id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn restore(&self, id: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = NULL, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NOT NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn add_assignment(&self, user_id: i64, service_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent mutations of this user's set.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO users_services (user_id, service_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(service_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_assignment(&self, user_id: i64, service_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM users_services WHERE user_id = $1 AND service_id = $2")
            .bind(user_id)
            .bind(service_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ServiceStore for PostgresStore {
    async fn insert(&self, service: NewService) -> Result<Service> {
        let row = sqlx::query(
            r#"
            INSERT INTO services (name, description, cost, category)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, cost, category,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(&service.name)
        .bind(&service.description)
        .bind(service.cost)
        .bind(service.category.as_str())
        .fetch_one(&self.pool)
        .await?;

        map_service(&row)
    }

    async fn find_all(&self) -> Result<Vec<Service>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, cost, category,
                   created_at, updated_at, deleted_at
            FROM services
            WHERE deleted_at IS NULL
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_service).collect()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Service>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, cost, category,
                   created_at, updated_at, deleted_at
            FROM services
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_service).transpose()
    }

    async fn update(&self, id: i64, changes: ServiceChanges) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE services
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                cost = COALESCE($4, cost),
                category = COALESCE($5, category),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.cost)
        .bind(changes.category.map(|c| c.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn soft_delete(&self, id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE services SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn restore(&self, id: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE services
            SET deleted_at = NULL, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NOT NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
