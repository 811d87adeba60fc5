use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::ResetCredential;
use crate::database::error::StoreError;
use crate::database::models::{NewPlan, NewUser, PasswordReset, Plan, PlanChanges, User, UserChanges};
use crate::database::query::{ListOptions, PlanSortField, UserSortField};

pub type StoreResult<T> = Result<T, StoreError>;

/// User persistence. Every mutation is a single atomic find-and-modify.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_by_reset_token_hash(&self, token_hash: &str) -> StoreResult<Option<User>>;

    async fn update_profile(&self, id: &str, changes: UserChanges) -> StoreResult<Option<User>>;

    /// Replaces any outstanding reset credential. Returns false when the user is gone.
    async fn set_reset_credential(&self, id: &str, credential: ResetCredential) -> StoreResult<bool>;

    /// Applies a reset only if the token hash is still stored and unexpired at `now`,
    /// clearing hash and expiry in the same write.
    async fn consume_reset_token(&self, reset: PasswordReset, now: DateTime<Utc>) -> StoreResult<Option<User>>;

    async fn delete(&self, id: &str) -> StoreResult<Option<User>>;

    async fn list(&self, options: ListOptions<UserSortField>) -> StoreResult<Vec<User>>;

    async fn health_check(&self) -> StoreResult<()>;
}

/// Plan persistence. Plans are only ever addressed together with their owner's id.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn insert(&self, plan: NewPlan) -> StoreResult<Plan>;

    async fn find_owned(&self, id: &str, owner: &str) -> StoreResult<Option<Plan>>;

    async fn update_owned(&self, id: &str, owner: &str, changes: PlanChanges) -> StoreResult<Option<Plan>>;

    async fn delete_owned(&self, id: &str, owner: &str) -> StoreResult<Option<Plan>>;

    async fn list_owned(&self, owner: &str, options: ListOptions<PlanSortField>) -> StoreResult<Vec<Plan>>;
}
