use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::pagination::{order_by_clause, PageRequest, SortField};
use super::repo::{RepoError, RepoResult, UserRepository};
use super::repo_types::{User, UserChanges, SORTABLE_COLUMNS};

const USER_COLUMNS: &str =
    "id, email, password_hash, firstname, lastname, created_at, updated_at, deleted_at";

// Shared by `list` and `count_active` so both see the same rows.
const ACTIVE: &str = "deleted_at IS NULL";

const SNAPSHOT: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn list_query(page: &PageRequest) -> QueryBuilder<'static, Postgres> {
    let sorts: Vec<SortField> = page
        .sorts
        .iter()
        .filter(|s| SORTABLE_COLUMNS.contains(&s.column.as_str()))
        .cloned()
        .collect();

    let mut qb = QueryBuilder::new(format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {ACTIVE}"
    ));
    let order = order_by_clause(&sorts, "");
    if !order.is_empty() {
        qb.push(" ORDER BY ").push(order);
    }
    qb.push(" LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
    qb
}

fn count_sql() -> String {
    format!("SELECT COUNT(*) FROM users WHERE {ACTIVE}")
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, firstname, lastname, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND {ACTIVE}"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND {ACTIVE} LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn list(&self, page: &PageRequest) -> RepoResult<Vec<User>> {
        let mut qb = list_query(page);
        let rows = qb
            .build_query_as::<User>()
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn count_active(&self) -> RepoResult<i64> {
        let total: i64 = sqlx::query_scalar(&count_sql())
            .fetch_one(&self.db)
            .await?;
        Ok(total)
    }

    async fn list_with_total(&self, page: &PageRequest) -> RepoResult<(Vec<User>, i64)> {
        let mut tx = self.db.begin().await?;
        sqlx::query(SNAPSHOT).execute(&mut *tx).await?;
        let users = list_query(page)
            .build_query_as::<User>()
            .fetch_all(&mut *tx)
            .await?;
        let total: i64 = sqlx::query_scalar(&count_sql())
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok((users, total))
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> RepoResult<()> {
        let done = sqlx::query(&format!(
            r#"
            UPDATE users
            SET email = $1, password_hash = $2, firstname = $3, lastname = $4, updated_at = $5
            WHERE id = $6 AND {ACTIVE}
            "#
        ))
        .bind(&changes.email)
        .bind(&changes.password_hash)
        .bind(&changes.firstname)
        .bind(&changes.lastname)
        .bind(changes.updated_at)
        .bind(id)
        .execute(&self.db)
        .await?;
        if done.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid, at: OffsetDateTime) -> RepoResult<()> {
        let done = sqlx::query(&format!(
            "UPDATE users SET deleted_at = $1 WHERE id = $2 AND {ACTIVE}"
        ))
        .bind(at)
        .bind(id)
        .execute(&self.db)
        .await?;
        if done.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
