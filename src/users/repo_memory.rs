use std::cmp::Ordering;

use anyhow::anyhow;
use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::pagination::{PageRequest, SortDirection, SortField};
use super::repo::{RepoError, RepoResult, UserRepository};
use super::repo_types::{User, UserChanges};

/// Process-local repository with the same contract as the Postgres one.
/// Rows are kept in insertion order, which is also the unsorted list order.
#[derive(Default)]
pub struct InMemoryUserRepository {
    rows: RwLock<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(rows: &[User], email: &str, except: Option<Uuid>) -> bool {
    rows.iter()
        .any(|u| u.is_active() && u.email == email && Some(u.id) != except)
}

fn page_of(rows: &[User], page: &PageRequest) -> Vec<User> {
    let mut active: Vec<User> = rows.iter().filter(|u| u.is_active()).cloned().collect();
    if !page.sorts.is_empty() {
        // stable, so ties keep insertion order
        active.sort_by(|a, b| {
            page.sorts
                .iter()
                .map(|s| compare(a, b, s))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }
    let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit).unwrap_or(0);
    active.into_iter().skip(offset).take(limit).collect()
}

fn active_count(rows: &[User]) -> i64 {
    rows.iter().filter(|u| u.is_active()).count() as i64
}

fn compare(a: &User, b: &User, sort: &SortField) -> Ordering {
    let ord = match sort.column.as_str() {
        "id" => a.id.cmp(&b.id),
        "email" => a.email.cmp(&b.email),
        "firstname" => a.firstname.cmp(&b.firstname),
        "lastname" => a.lastname.cmp(&b.lastname),
        "created_at" => a.created_at.cmp(&b.created_at),
        "updated_at" => a.updated_at.cmp(&b.updated_at),
        _ => Ordering::Equal,
    };
    match sort.direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: &User) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        if email_taken(&rows, &user.email, None) {
            return Err(RepoError::Other(anyhow!(
                "duplicate key value violates unique constraint \"users_email_key\""
            )));
        }
        rows.push(user.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> RepoResult<User> {
        let rows = self.rows.read().await;
        rows.iter()
            .find(|u| u.id == id && u.is_active())
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> RepoResult<User> {
        let rows = self.rows.read().await;
        rows.iter()
            .find(|u| u.email == email && u.is_active())
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn list(&self, page: &PageRequest) -> RepoResult<Vec<User>> {
        let rows = self.rows.read().await;
        Ok(page_of(&rows, page))
    }

    async fn count_active(&self) -> RepoResult<i64> {
        let rows = self.rows.read().await;
        Ok(active_count(&rows))
    }

    async fn list_with_total(&self, page: &PageRequest) -> RepoResult<(Vec<User>, i64)> {
        let rows = self.rows.read().await;
        Ok((page_of(&rows, page), active_count(&rows)))
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        if email_taken(&rows, &changes.email, Some(id)) {
            return Err(RepoError::Other(anyhow!(
                "duplicate key value violates unique constraint \"users_email_key\""
            )));
        }
        let user = rows
            .iter_mut()
            .find(|u| u.id == id && u.is_active())
            .ok_or(RepoError::NotFound)?;
        user.email = changes.email.clone();
        user.password_hash = changes.password_hash.clone();
        user.firstname = changes.firstname.clone();
        user.lastname = changes.lastname.clone();
        user.updated_at = changes.updated_at;
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid, at: OffsetDateTime) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        let user = rows
            .iter_mut()
            .find(|u| u.id == id && u.is_active())
            .ok_or(RepoError::NotFound)?;
        user.deleted_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn user(email: &str, lastname: &str, offset_secs: i64) -> User {
        let at = OffsetDateTime::UNIX_EPOCH + Duration::seconds(1_700_000_000 + offset_secs);
        User {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: "x".into(),
            firstname: "Ann".into(),
            lastname: lastname.into(),
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_storage_error() {
        let repo = InMemoryUserRepository::new();
        repo.create(&user("a@example.com", "A", 0)).await.unwrap();
        let err = repo.create(&user("a@example.com", "B", 1)).await.unwrap_err();
        assert!(matches!(err, RepoError::Other(_)));
    }

    #[tokio::test]
    async fn soft_deleted_users_are_invisible() {
        let repo = InMemoryUserRepository::new();
        let gone = user("gone@example.com", "G", 0);
        repo.create(&gone).await.unwrap();
        repo.create(&user("kept@example.com", "K", 1)).await.unwrap();

        repo.soft_delete(gone.id, OffsetDateTime::now_utc()).await.unwrap();

        assert!(matches!(repo.get_by_id(gone.id).await, Err(RepoError::NotFound)));
        assert!(matches!(
            repo.get_by_email("gone@example.com").await,
            Err(RepoError::NotFound)
        ));
        assert!(matches!(
            repo.soft_delete(gone.id, OffsetDateTime::now_utc()).await,
            Err(RepoError::NotFound)
        ));
        let page = PageRequest::from_query("1", "10", "", 100);
        let listed = repo.list(&page).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(repo.count_active().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_sorts_and_pages() {
        let repo = InMemoryUserRepository::new();
        for (i, name) in ["Carter", "Abbott", "Baker"].iter().enumerate() {
            let email = format!("{}@example.com", name.to_lowercase());
            repo.create(&user(&email, name, i as i64)).await.unwrap();
        }

        let page = PageRequest::from_query("1", "2", "+lastname", 100);
        let names: Vec<_> = repo
            .list(&page)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.lastname)
            .collect();
        assert_eq!(names, ["Abbott", "Baker"]);

        let page = PageRequest::from_query("2", "2", "-created_at", 100);
        let names: Vec<_> = repo
            .list(&page)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.lastname)
            .collect();
        assert_eq!(names, ["Carter"]);
    }

    #[tokio::test]
    async fn update_of_missing_user_is_not_found() {
        let repo = InMemoryUserRepository::new();
        let changes = UserChanges {
            email: "x@example.com".into(),
            password_hash: "h".into(),
            firstname: "X".into(),
            lastname: "Y".into(),
            updated_at: OffsetDateTime::now_utc(),
        };
        assert!(matches!(
            repo.update(Uuid::new_v4(), &changes).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn page_and_total_agree_while_rows_are_deleted() {
        let repo = std::sync::Arc::new(InMemoryUserRepository::new());
        let mut ids = Vec::new();
        for i in 0..20 {
            let u = user(&format!("u{i}@example.com"), "Doe", i);
            ids.push(u.id);
            repo.create(&u).await.unwrap();
        }

        let deleter = {
            let repo = repo.clone();
            tokio::spawn(async move {
                for id in ids {
                    repo.soft_delete(id, OffsetDateTime::now_utc()).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let page = PageRequest::from_query("1", "100", "", 100);
        loop {
            let (users, total) = repo.list_with_total(&page).await.unwrap();
            assert_eq!(users.len() as i64, total);
            if total == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        deleter.await.unwrap();
    }
}
