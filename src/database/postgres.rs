use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

use crate::auth::ResetCredential;
use crate::database::models::{
    new_object_id, NewPlan, NewUser, PasswordReset, Plan, PlanChanges, User, UserChanges,
};
use crate::database::query::{ListOptions, SortField};
use crate::database::query::{PlanSortField, UserSortField};
use crate::database::store::{PlanStore, StoreResult, UserStore};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id                  CHAR(24)     PRIMARY KEY,
        name                TEXT         NOT NULL,
        email               TEXT         NOT NULL,
        password_hash       TEXT         NOT NULL,
        active              BOOLEAN      NOT NULL DEFAULT TRUE,
        password_changed_at TIMESTAMPTZ,
        reset_token_hash    TEXT,
        reset_expires_at    TIMESTAMPTZ,
        created_at          TIMESTAMPTZ  NOT NULL DEFAULT now(),
        updated_at          TIMESTAMPTZ  NOT NULL DEFAULT now(),
        CONSTRAINT users_email_key UNIQUE (email),
        CONSTRAINT users_name_length CHECK (char_length(name) BETWEEN 2 AND 50)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS users_reset_token_hash_idx
        ON users (reset_token_hash)
        WHERE reset_token_hash IS NOT NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS plans (
        id          CHAR(24)     PRIMARY KEY,
        name        TEXT         NOT NULL,
        start_date  TIMESTAMPTZ  NOT NULL,
        end_date    TIMESTAMPTZ  NOT NULL,
        active      BOOLEAN      NOT NULL DEFAULT TRUE,
        user_id     CHAR(24)     NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        created_at  TIMESTAMPTZ  NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ  NOT NULL DEFAULT now(),
        CONSTRAINT plans_name_length CHECK (char_length(name) BETWEEN 2 AND 50)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS plans_user_id_idx ON plans (user_id)
    "#,
];

/// Postgres-backed store for users and plans.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates tables and indexes that do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema ready");
        Ok(())
    }
}

fn order_clause<F: SortField>(options: &ListOptions<F>) -> String {
    // Ties broken by id so pages never overlap.
    let dir = options.direction.as_sql();
    format!("ORDER BY {} {}, id {}", options.sort.column(), dir, dir)
}

fn limit_offset<F: SortField>(options: &ListOptions<F>) -> (Option<i64>, i64) {
    match options.page {
        Some(page) => (Some(page.size), page.offset()),
        None => (None, 0),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(new_object_id())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_reset_token_hash(&self, token_hash: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE reset_token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_profile(&self, id: &str, changes: UserChanges) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = $2,
                email = $3,
                password_hash = COALESCE($4, password_hash),
                password_changed_at = COALESCE($5, password_changed_at),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.password_hash)
        .bind(changes.password_changed_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_reset_credential(&self, id: &str, credential: ResetCredential) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET reset_token_hash = $2, reset_expires_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(&credential.token_hash)
        .bind(credential.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn consume_reset_token(&self, reset: PasswordReset, now: DateTime<Utc>) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                password_hash = $2,
                password_changed_at = $3,
                reset_token_hash = NULL,
                reset_expires_at = NULL,
                updated_at = now()
            WHERE reset_token_hash = $1 AND reset_expires_at > $4
            RETURNING *
            "#,
        )
        .bind(&reset.token_hash)
        .bind(&reset.password_hash)
        .bind(reset.password_changed_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, User>("DELETE FROM users WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list(&self, options: ListOptions<UserSortField>) -> StoreResult<Vec<User>> {
        let (limit, offset) = limit_offset(&options);
        let query = format!("SELECT * FROM users {} LIMIT $1 OFFSET $2", order_clause(&options));
        let rows = sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl PlanStore for PgStore {
    async fn insert(&self, plan: NewPlan) -> StoreResult<Plan> {
        let row = sqlx::query_as::<_, Plan>(
            r#"
            INSERT INTO plans (id, name, start_date, end_date, active, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new_object_id())
        .bind(&plan.name)
        .bind(plan.start_date)
        .bind(plan.end_date)
        .bind(plan.active)
        .bind(&plan.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_owned(&self, id: &str, owner: &str) -> StoreResult<Option<Plan>> {
        let row = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_owned(&self, id: &str, owner: &str, changes: PlanChanges) -> StoreResult<Option<Plan>> {
        let row = sqlx::query_as::<_, Plan>(
            r#"
            UPDATE plans SET
                name = $3,
                start_date = $4,
                end_date = $5,
                active = COALESCE($6, active),
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(&changes.name)
        .bind(changes.start_date)
        .bind(changes.end_date)
        .bind(changes.active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_owned(&self, id: &str, owner: &str) -> StoreResult<Option<Plan>> {
        let row = sqlx::query_as::<_, Plan>("DELETE FROM plans WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_owned(&self, owner: &str, options: ListOptions<PlanSortField>) -> StoreResult<Vec<Plan>> {
        let (limit, offset) = limit_offset(&options);
        let query = format!(
            "SELECT * FROM plans WHERE user_id = $1 {} LIMIT $2 OFFSET $3",
            order_clause(&options)
        );
        let rows = sqlx::query_as::<_, Plan>(&query)
            .bind(owner)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
