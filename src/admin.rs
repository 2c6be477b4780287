//! Admin area workflow: list, save with a duplicate-slug guard, two-step
//! delete and role changes against a [`PostStore`].
//!
//! Store failures are caught here and turned into notices; `save_post` also
//! returns the error so an open editor can keep its draft and show it.
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::db::{NewPost, PostChanges, PostStore, StoreError};
use crate::editor::{PostEditor, SavePost, SubmitError};
use crate::model::{Post, PostListing, PostPayload, Role};
use crate::notice::Notifier;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("a post with slug \"{0}\" already exists")]
    SlugTaken(String),
    #[error("failed to serialize content: {0}")]
    Content(#[from] serde_json::Error),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AdminError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SlugTaken(slug) => AdminError::SlugTaken(slug),
            other => AdminError::Store(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// First click: the row now waits for confirmation.
    Armed,
    Deleted,
    Failed,
}

pub struct AdminWorkflow<S> {
    store: S,
    author_id: Option<String>,
    posts: Vec<PostListing>,
    armed_delete: Option<String>,
    notices: Notifier,
}

impl<S: PostStore> AdminWorkflow<S> {
    pub fn new(store: S, author_id: Option<String>, notice_ttl: Duration) -> Self {
        Self {
            store,
            author_id,
            posts: Vec::new(),
            armed_delete: None,
            notices: Notifier::new(notice_ttl),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn posts(&self) -> &[PostListing] {
        &self.posts
    }

    pub fn notices(&mut self) -> &mut Notifier {
        &mut self.notices
    }

    pub fn armed_delete(&self) -> Option<&str> {
        self.armed_delete.as_deref()
    }

    /// Re-read the whole list. On failure the previous list stays in place.
    #[instrument(skip_all)]
    pub async fn refresh(&mut self) -> bool {
        match self.store.list_posts().await {
            Ok(posts) => {
                debug!(count = posts.len(), "post list refreshed");
                self.posts = posts;
                true
            }
            Err(err) => {
                self.notices.error(format!("Failed to load posts: {}", err));
                false
            }
        }
    }

    /// Open an editor for a new post (`None`) or an existing one.
    pub fn open_editor(&self, post: Option<Post>) -> PostEditor {
        match &post {
            Some(p) => PostEditor::edit(p),
            None => PostEditor::new(),
        }
    }

    /// Submit `editor` into the store. The target is the post the editor was
    /// opened on, so several open editors never redirect each other's saves.
    pub async fn submit(&mut self, editor: &mut PostEditor) -> Result<(), SubmitError> {
        let mut target = EditorTarget {
            workflow: self,
            post: editor.original().cloned(),
        };
        editor.submit(&mut target).await
    }

    /// Insert (`existing` is `None`) or update a post.
    ///
    /// The slug pre-check only runs on insert or when the slug changed; it is
    /// not atomic, so a UNIQUE violation from the store is reported the same way.
    #[instrument(skip_all, fields(slug = %payload.slug))]
    pub async fn save_post(
        &mut self,
        existing: Option<&Post>,
        payload: PostPayload,
    ) -> Result<Post, AdminError> {
        match self.persist(existing, payload).await {
            Ok(post) => {
                let verb = if existing.is_some() { "updated" } else { "created" };
                info!(id = %post.id, "post {}", verb);
                self.notices.success(format!("Post {}", verb));
                self.refresh().await;
                Ok(post)
            }
            Err(err) => {
                self.notices.error(err.to_string());
                Err(err)
            }
        }
    }

    async fn persist(&self, existing: Option<&Post>, payload: PostPayload) -> Result<Post, AdminError> {
        let slug_changed = existing.map_or(true, |p| p.slug != payload.slug);
        if slug_changed {
            if let Some(other) = self.store.find_post_by_slug(&payload.slug).await? {
                if existing.map_or(true, |p| p.id != other.id) {
                    return Err(AdminError::SlugTaken(payload.slug));
                }
            }
        }

        let content = payload.content.to_raw()?;
        let post = match existing {
            None => {
                self.store
                    .insert_post(NewPost {
                        title: payload.title,
                        slug: payload.slug,
                        content,
                        media_url: payload.media_url,
                        post_type: payload.post_type,
                        author_id: self.author_id.clone(),
                    })
                    .await?
            }
            Some(current) => {
                self.store
                    .update_post(
                        &current.id,
                        PostChanges {
                            title: payload.title,
                            slug: payload.slug,
                            content,
                            media_url: payload.media_url,
                            post_type: payload.post_type,
                        },
                    )
                    .await?
            }
        };
        Ok(post)
    }

    /// Two-step delete. The first request for a row arms it; a second request
    /// for the armed row deletes. A request for another row moves the arming.
    #[instrument(skip(self))]
    pub async fn request_delete(&mut self, id: &str) -> DeleteOutcome {
        if self.armed_delete.as_deref() != Some(id) {
            self.armed_delete = Some(id.to_string());
            debug!("delete armed");
            return DeleteOutcome::Armed;
        }

        match self.store.delete_post(id).await {
            Ok(()) => {
                self.armed_delete = None;
                self.notices.success("Post deleted");
                self.refresh().await;
                DeleteOutcome::Deleted
            }
            Err(err) => {
                self.notices.error(format!("Failed to delete post: {}", err));
                DeleteOutcome::Failed
            }
        }
    }

    pub fn cancel_delete(&mut self) {
        self.armed_delete = None;
    }

    #[instrument(skip(self))]
    pub async fn change_role(&mut self, profile_id: &str, role: Role) -> bool {
        match self.store.update_profile_role(profile_id, role).await {
            Ok(()) => {
                self.notices
                    .success(format!("Role updated to {}", role.as_str()));
                true
            }
            Err(err) => {
                self.notices.error(format!("Failed to update role: {}", err));
                false
            }
        }
    }
}

/// Save callback bound to one editor's target post.
struct EditorTarget<'a, S> {
    workflow: &'a mut AdminWorkflow<S>,
    post: Option<Post>,
}

#[async_trait]
impl<'a, S: PostStore> SavePost for EditorTarget<'a, S> {
    async fn save(&mut self, payload: PostPayload) -> anyhow::Result<()> {
        self.workflow.save_post(self.post.as_ref(), payload).await?;
        Ok(())
    }
}
