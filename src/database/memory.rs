use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::auth::ResetCredential;
use crate::database::error::StoreError;
use crate::database::models::{
    new_object_id, NewPlan, NewUser, PasswordReset, Plan, PlanChanges, User, UserChanges,
};
use crate::database::query::{ListOptions, PlanSortField, SortDirection, SortField, UserSortField};
use crate::database::store::{PlanStore, StoreResult, UserStore};
use crate::validation::{NAME_MAX_LENGTH, NAME_MIN_LENGTH};

/// In-process store with the same constraints as the Postgres schema.
///
/// Users and plans sit behind one lock so deleting a user and cascading to
/// their plans is a single write.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    plans: HashMap<String, Plan>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_name(name: &str) -> StoreResult<()> {
    let len = name.chars().count();
    if (NAME_MIN_LENGTH..=NAME_MAX_LENGTH).contains(&len) {
        return Ok(());
    }
    Err(StoreError::Validation {
        field: "name".to_string(),
        value: Value::String(name.to_string()),
        message: format!(
            "name must be between {} and {} characters",
            NAME_MIN_LENGTH, NAME_MAX_LENGTH
        ),
    })
}

impl Tables {
    fn check_email_free(&self, email: &str, except: Option<&str>) -> StoreResult<()> {
        let taken = self
            .users
            .values()
            .any(|u| u.email == email && Some(u.id.as_str()) != except);
        if taken {
            return Err(StoreError::Duplicate(format!("Key (email)=({}) already exists.", email)));
        }
        Ok(())
    }
}

fn sorted<T, F: SortField>(
    mut rows: Vec<T>,
    options: &ListOptions<F>,
    compare: impl Fn(&T, &T, F) -> Ordering,
    id: impl Fn(&T) -> &str,
) -> Vec<T> {
    rows.sort_by(|a, b| {
        let ord = compare(a, b, options.sort).then_with(|| id(a).cmp(id(b)));
        match options.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    match options.page {
        Some(page) => rows
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.size).unwrap_or(0))
            .collect(),
        None => rows,
    }
}

fn compare_users(a: &User, b: &User, field: UserSortField) -> Ordering {
    match field {
        UserSortField::Name => a.name.cmp(&b.name),
        UserSortField::Email => a.email.cmp(&b.email),
        UserSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        UserSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

fn compare_plans(a: &Plan, b: &Plan, field: PlanSortField) -> Ordering {
    match field {
        PlanSortField::Name => a.name.cmp(&b.name),
        PlanSortField::StartDate => a.start_date.cmp(&b.start_date),
        PlanSortField::EndDate => a.end_date.cmp(&b.end_date),
        PlanSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        PlanSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        check_name(&user.name)?;
        let mut tables = self.inner.write().await;
        tables.check_email_free(&user.email, None)?;

        let now = Utc::now();
        let record = User {
            id: new_object_id(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            active: true,
            password_changed_at: None,
            reset_token_hash: None,
            reset_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_reset_token_hash(&self, token_hash: &str) -> StoreResult<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.reset_token_hash.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn update_profile(&self, id: &str, changes: UserChanges) -> StoreResult<Option<User>> {
        check_name(&changes.name)?;
        let mut tables = self.inner.write().await;
        if !tables.users.contains_key(id) {
            return Ok(None);
        }
        tables.check_email_free(&changes.email, Some(id))?;

        let Some(user) = tables.users.get_mut(id) else {
            return Ok(None);
        };
        user.name = changes.name;
        user.email = changes.email;
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(changed_at) = changes.password_changed_at {
            user.password_changed_at = Some(changed_at);
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn set_reset_credential(&self, id: &str, credential: ResetCredential) -> StoreResult<bool> {
        let mut tables = self.inner.write().await;
        match tables.users.get_mut(id) {
            Some(user) => {
                user.reset_token_hash = credential.token_hash;
                user.reset_expires_at = credential.expires_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn consume_reset_token(&self, reset: PasswordReset, now: DateTime<Utc>) -> StoreResult<Option<User>> {
        let mut tables = self.inner.write().await;
        let user = tables.users.values_mut().find(|u| {
            u.reset_token_hash.as_deref() == Some(reset.token_hash.as_str())
                && u.reset_credential().is_valid(now)
        });

        let Some(user) = user else {
            return Ok(None);
        };
        user.password_hash = reset.password_hash;
        user.password_changed_at = Some(reset.password_changed_at);
        user.reset_token_hash = None;
        user.reset_expires_at = None;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: &str) -> StoreResult<Option<User>> {
        let mut tables = self.inner.write().await;
        let removed = tables.users.remove(id);
        if removed.is_some() {
            tables.plans.retain(|_, plan| plan.user_id != id);
        }
        Ok(removed)
    }

    async fn list(&self, options: ListOptions<UserSortField>) -> StoreResult<Vec<User>> {
        let rows: Vec<User> = self.inner.read().await.users.values().cloned().collect();
        Ok(sorted(rows, &options, compare_users, |u| u.id.as_str()))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn insert(&self, plan: NewPlan) -> StoreResult<Plan> {
        check_name(&plan.name)?;
        let mut tables = self.inner.write().await;
        if !tables.users.contains_key(&plan.user_id) {
            return Err(StoreError::Validation {
                field: "userId".to_string(),
                value: Value::String(plan.user_id),
                message: "Plan owner does not exist".to_string(),
            });
        }

        let now = Utc::now();
        let record = Plan {
            id: new_object_id(),
            name: plan.name,
            start_date: plan.start_date,
            end_date: plan.end_date,
            active: plan.active,
            user_id: plan.user_id,
            created_at: now,
            updated_at: now,
        };
        tables.plans.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn find_owned(&self, id: &str, owner: &str) -> StoreResult<Option<Plan>> {
        let tables = self.inner.read().await;
        Ok(tables.plans.get(id).filter(|p| p.user_id == owner).cloned())
    }

    async fn update_owned(&self, id: &str, owner: &str, changes: PlanChanges) -> StoreResult<Option<Plan>> {
        check_name(&changes.name)?;
        let mut tables = self.inner.write().await;
        let Some(plan) = tables.plans.get_mut(id).filter(|p| p.user_id == owner) else {
            return Ok(None);
        };
        plan.name = changes.name;
        plan.start_date = changes.start_date;
        plan.end_date = changes.end_date;
        if let Some(active) = changes.active {
            plan.active = active;
        }
        plan.updated_at = Utc::now();
        Ok(Some(plan.clone()))
    }

    async fn delete_owned(&self, id: &str, owner: &str) -> StoreResult<Option<Plan>> {
        let mut tables = self.inner.write().await;
        if !tables.plans.get(id).is_some_and(|p| p.user_id == owner) {
            return Ok(None);
        }
        Ok(tables.plans.remove(id))
    }

    async fn list_owned(&self, owner: &str, options: ListOptions<PlanSortField>) -> StoreResult<Vec<Plan>> {
        let rows: Vec<Plan> = self
            .inner
            .read()
            .await
            .plans
            .values()
            .filter(|p| p.user_id == owner)
            .cloned()
            .collect();
        Ok(sorted(rows, &options, compare_plans, |p| p.id.as_str()))
    }
}
