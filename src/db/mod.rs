//! External store: the `posts`/`profiles` query surface and its SQLite backing.
//!
//! - `model`: write models accepted by the repository.
//! - `repo`: SQL-only functions that map rows into domain types.
//!
//! Workflows depend on the [`PostStore`] trait; [`SqliteStore`] is the
//! production implementation over a sqlx pool.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Post, PostListing, Profile, Role};

pub mod model;
pub mod repo;

pub use model::{NewPost, NewProfile, PostChanges};
pub use repo::{init_pool, run_migrations, Pool};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a post with slug \"{0}\" already exists")]
    SlugTaken(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: &str) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Every post, newest first, joined with the author's display profile.
    async fn list_posts(&self) -> Result<Vec<PostListing>, StoreError>;
    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError>;
    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError>;
    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError>;
    async fn update_post(&self, id: &str, changes: PostChanges) -> Result<Post, StoreError>;
    async fn delete_post(&self, id: &str) -> Result<(), StoreError>;
    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, StoreError>;
    async fn upsert_profile(&self, profile: NewProfile) -> Result<Profile, StoreError>;
    async fn update_profile_role(&self, id: &str, role: Role) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool,
}

impl SqliteStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Open the pool and bring the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = init_pool(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn list_posts(&self) -> Result<Vec<PostListing>, StoreError> {
        repo::list_posts(&self.pool).await
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        repo::find_post_by_slug(&self.pool, slug).await
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        repo::get_post(&self.pool, id).await
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError> {
        repo::insert_post(&self.pool, post).await
    }

    async fn update_post(&self, id: &str, changes: PostChanges) -> Result<Post, StoreError> {
        repo::update_post(&self.pool, id, changes).await
    }

    async fn delete_post(&self, id: &str) -> Result<(), StoreError> {
        repo::delete_post(&self.pool, id).await
    }

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        repo::get_profile(&self.pool, id).await
    }

    async fn upsert_profile(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        repo::upsert_profile(&self.pool, profile).await
    }

    async fn update_profile_role(&self, id: &str, role: Role) -> Result<(), StoreError> {
        repo::update_profile_role(&self.pool, id, role).await
    }
}
