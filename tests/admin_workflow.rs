use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use folio::admin::{AdminError, AdminWorkflow, DeleteOutcome};
use folio::content::RichDocument;
use folio::db::{NewPost, NewProfile, PostChanges, PostStore, SqliteStore, StoreError};
use folio::editor::{EditorState, SubmitError};
use folio::model::{Post, PostListing, PostPayload, PostType, Profile, Role};
use folio::notice::NoticeKind;

const TTL: Duration = Duration::from_secs(60);

/// In-memory store that records every call made against it.
#[derive(Clone, Default)]
struct RecordingStore {
    posts: Arc<Mutex<Vec<Post>>>,
    calls: Arc<Mutex<Vec<String>>>,
    fail_list: Arc<AtomicBool>,
    fail_delete: Arc<AtomicBool>,
}

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

fn stored(id: &str, slug: &str, age_minutes: i64) -> Post {
    let at = Utc::now() - ChronoDuration::minutes(age_minutes);
    Post {
        id: id.into(),
        title: format!("Title {slug}"),
        slug: slug.into(),
        content: RichDocument::from_plain_text("body").to_raw().unwrap(),
        media_url: None,
        post_type: PostType::Blog,
        author_id: Some("admin-1".into()),
        created_at: at,
        updated_at: at,
    }
}

fn payload(title: &str, slug: &str) -> PostPayload {
    PostPayload {
        title: title.into(),
        slug: slug.into(),
        content: RichDocument::from_plain_text("body"),
        media_url: None,
        post_type: PostType::Blog,
    }
}

impl RecordingStore {
    fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts: Arc::new(Mutex::new(posts)),
            ..Default::default()
        }
    }

    async fn record(&self, call: String) {
        self.calls.lock().await.push(call);
    }

    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn writes(&self) -> Vec<String> {
        self.calls()
            .await
            .into_iter()
            .filter(|c| c.starts_with("insert:") || c.starts_with("update:"))
            .collect()
    }
}

#[async_trait]
impl PostStore for RecordingStore {
    async fn list_posts(&self) -> Result<Vec<PostListing>, StoreError> {
        self.record("list".into()).await;
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut posts = self.posts.lock().await.clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts
            .into_iter()
            .map(|post| PostListing { post, author: None })
            .collect())
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        self.record(format!("find:{slug}")).await;
        Ok(self.posts.lock().await.iter().find(|p| p.slug == slug).cloned())
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        Ok(self.posts.lock().await.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError> {
        self.record(format!("insert:{}", post.slug)).await;
        let mut posts = self.posts.lock().await;
        let created = Post {
            id: format!("post-{}", posts.len() + 1),
            title: post.title,
            slug: post.slug,
            content: post.content,
            media_url: post.media_url,
            post_type: post.post_type,
            author_id: post.author_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        posts.push(created.clone());
        Ok(created)
    }

    async fn update_post(&self, id: &str, changes: PostChanges) -> Result<Post, StoreError> {
        self.record(format!("update:{id}")).await;
        let mut posts = self.posts.lock().await;
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("post", id))?;
        post.title = changes.title;
        post.slug = changes.slug;
        post.content = changes.content;
        post.media_url = changes.media_url;
        post.post_type = changes.post_type;
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: &str) -> Result<(), StoreError> {
        self.record(format!("delete:{id}")).await;
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.posts.lock().await.retain(|p| p.id != id);
        Ok(())
    }

    async fn get_profile(&self, _id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(None)
    }

    async fn upsert_profile(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        Ok(Profile {
            id: profile.id,
            name: profile.name,
            avatar_url: profile.avatar_url,
            role: profile.role,
            email: profile.email,
        })
    }

    async fn update_profile_role(&self, id: &str, role: Role) -> Result<(), StoreError> {
        self.record(format!("role:{id}:{}", role.as_str())).await;
        if id == "ghost" {
            return Err(StoreError::not_found("profile", id));
        }
        Ok(())
    }
}

fn workflow(store: &RecordingStore) -> AdminWorkflow<RecordingStore> {
    AdminWorkflow::new(store.clone(), Some("admin-1".into()), TTL)
}

fn latest_notice(admin: &mut AdminWorkflow<RecordingStore>) -> (NoticeKind, String) {
    let notice = admin.notices().active().last().cloned().expect("a notice");
    (notice.kind, notice.message)
}

#[tokio::test]
async fn refresh_orders_newest_first() {
    let store = RecordingStore::with_posts(vec![stored("old", "old", 30), stored("new", "new", 1)]);
    let mut admin = workflow(&store);
    assert!(admin.refresh().await);
    let ids: Vec<_> = admin.posts().iter().map(|l| l.post.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old"]);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_list() {
    let store = RecordingStore::with_posts(vec![stored("a", "a", 2), stored("b", "b", 1)]);
    let mut admin = workflow(&store);
    assert!(admin.refresh().await);

    store.fail_list.store(true, Ordering::SeqCst);
    assert!(!admin.refresh().await);
    assert_eq!(admin.posts().len(), 2);
    let (kind, message) = latest_notice(&mut admin);
    assert_eq!(kind, NoticeKind::Error);
    assert!(message.starts_with("Failed to load posts"));
}

#[tokio::test]
async fn insert_with_taken_slug_is_rejected_without_writes() {
    let store = RecordingStore::with_posts(vec![stored("p1", "taken", 5)]);
    let mut admin = workflow(&store);

    let err = admin
        .save_post(None, payload("Another", "taken"))
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::SlugTaken(ref s) if s == "taken"));
    assert!(store.writes().await.is_empty());

    let (kind, message) = latest_notice(&mut admin);
    assert_eq!(kind, NoticeKind::Error);
    assert!(message.contains("already exists"));
}

#[tokio::test]
async fn insert_creates_post_and_refreshes() {
    let store = RecordingStore::default();
    let mut admin = workflow(&store);

    let post = admin.save_post(None, payload("Fresh", "fresh")).await.unwrap();
    assert_eq!(post.author_id.as_deref(), Some("admin-1"));
    assert_eq!(
        RichDocument::from_raw(&post.content).unwrap().plain_text(),
        "body"
    );
    assert_eq!(
        store.calls().await,
        vec!["find:fresh".to_string(), "insert:fresh".into(), "list".into()]
    );
    assert_eq!(admin.posts().len(), 1);
    assert_eq!(latest_notice(&mut admin), (NoticeKind::Success, "Post created".into()));
}

#[tokio::test]
async fn update_with_unchanged_slug_skips_precheck() {
    let existing = stored("p1", "same", 5);
    let store = RecordingStore::with_posts(vec![existing.clone()]);
    let mut admin = workflow(&store);

    let post = admin
        .save_post(Some(&existing), payload("Retitled", "same"))
        .await
        .unwrap();
    assert_eq!(post.title, "Retitled");
    let calls = store.calls().await;
    assert!(!calls.iter().any(|c| c.starts_with("find:")));
    assert_eq!(calls[0], "update:p1");
}

#[tokio::test]
async fn update_onto_another_posts_slug_is_rejected() {
    let mine = stored("p1", "mine", 5);
    let store = RecordingStore::with_posts(vec![mine.clone(), stored("p2", "theirs", 4)]);
    let mut admin = workflow(&store);

    let err = admin
        .save_post(Some(&mine), payload("Mine", "theirs"))
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::SlugTaken(_)));
    assert!(store.writes().await.is_empty());
}

#[tokio::test]
async fn delete_needs_two_clicks_on_the_same_row() {
    let store = RecordingStore::with_posts(vec![stored("a", "a", 2), stored("b", "b", 1)]);
    let mut admin = workflow(&store);
    admin.refresh().await;

    assert_eq!(admin.request_delete("a").await, DeleteOutcome::Armed);
    assert_eq!(admin.armed_delete(), Some("a"));

    // Clicking a different row moves the confirmation; nothing is deleted.
    assert_eq!(admin.request_delete("b").await, DeleteOutcome::Armed);
    assert_eq!(admin.armed_delete(), Some("b"));
    assert!(!store.calls().await.iter().any(|c| c.starts_with("delete:")));

    assert_eq!(admin.request_delete("b").await, DeleteOutcome::Deleted);
    assert_eq!(admin.armed_delete(), None);
    let remaining: Vec<_> = admin.posts().iter().map(|l| l.post.id.as_str()).collect();
    assert_eq!(remaining, vec!["a"]);
    assert_eq!(latest_notice(&mut admin), (NoticeKind::Success, "Post deleted".into()));
}

#[tokio::test]
async fn cancel_disarms_delete() {
    let store = RecordingStore::with_posts(vec![stored("a", "a", 1)]);
    let mut admin = workflow(&store);

    admin.request_delete("a").await;
    admin.cancel_delete();
    assert_eq!(admin.armed_delete(), None);
    assert_eq!(admin.request_delete("a").await, DeleteOutcome::Armed);
    assert!(store.posts.lock().await.iter().any(|p| p.id == "a"));
}

#[tokio::test]
async fn failed_delete_stays_armed() {
    let store = RecordingStore::with_posts(vec![stored("a", "a", 1)]);
    store.fail_delete.store(true, Ordering::SeqCst);
    let mut admin = workflow(&store);

    admin.request_delete("a").await;
    assert_eq!(admin.request_delete("a").await, DeleteOutcome::Failed);
    assert_eq!(admin.armed_delete(), Some("a"));
    let (kind, message) = latest_notice(&mut admin);
    assert_eq!(kind, NoticeKind::Error);
    assert!(message.starts_with("Failed to delete post"));
}

#[tokio::test]
async fn role_change_reports_outcome() {
    let store = RecordingStore::default();
    let mut admin = workflow(&store);

    assert!(admin.change_role("u2", Role::Admin).await);
    assert_eq!(
        latest_notice(&mut admin),
        (NoticeKind::Success, "Role updated to admin".into())
    );
    assert!(!admin.change_role("ghost", Role::User).await);
    assert_eq!(latest_notice(&mut admin).0, NoticeKind::Error);
}

#[tokio::test]
async fn editor_saves_through_workflow() {
    let store = RecordingStore::default();
    let mut admin = workflow(&store);

    let mut editor = admin.open_editor(None);
    editor.set_title("My First Vlog!");
    editor.set_post_type(PostType::Vlog);
    editor.set_media_url("https://cdn.example.dev/v.mp4");
    editor.set_content(RichDocument::from_plain_text("watch this"));

    admin.submit(&mut editor).await.unwrap();
    assert_eq!(editor.state(), &EditorState::Saved);

    let posts = store.posts.lock().await.clone();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].slug, "my-first-vlog");
    assert_eq!(posts[0].post_type, PostType::Vlog);
    assert_eq!(posts[0].media_url.as_deref(), Some("https://cdn.example.dev/v.mp4"));
    assert_eq!(admin.posts().len(), 1);
}

#[tokio::test]
async fn editor_edit_updates_target_post() {
    let existing = stored("p1", "hello", 3);
    let store = RecordingStore::with_posts(vec![existing.clone()]);
    let mut admin = workflow(&store);

    let mut editor = admin.open_editor(Some(existing));
    editor.set_slug("hello-again");
    admin.submit(&mut editor).await.unwrap();

    assert_eq!(
        store.calls().await[..2],
        ["find:hello-again".to_string(), "update:p1".to_string()]
    );
}

#[tokio::test]
async fn open_editors_keep_their_own_targets() {
    let existing = stored("p1", "one", 3);
    let store = RecordingStore::with_posts(vec![existing.clone()]);
    let mut admin = workflow(&store);

    let mut editing = admin.open_editor(Some(existing));
    let mut drafting = admin.open_editor(None);

    editing.set_slug("one-renamed");
    admin.submit(&mut editing).await.unwrap();
    assert_eq!(store.writes().await, vec!["update:p1".to_string()]);
    let posts = store.posts.lock().await.clone();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, "p1");
    assert_eq!(posts[0].slug, "one-renamed");

    drafting.set_title("Two");
    drafting.set_content(RichDocument::from_plain_text("second"));
    admin.submit(&mut drafting).await.unwrap();
    assert_eq!(
        store.writes().await,
        vec!["update:p1".to_string(), "insert:two".to_string()]
    );
    assert_eq!(store.posts.lock().await.len(), 2);
}

#[tokio::test]
async fn editor_keeps_draft_when_save_conflicts() {
    let store = RecordingStore::with_posts(vec![stored("p1", "taken", 5)]);
    let mut admin = workflow(&store);

    let mut editor = admin.open_editor(None);
    editor.set_title("Taken");
    editor.set_content(RichDocument::from_plain_text("text"));

    let err = admin.submit(&mut editor).await.unwrap_err();
    assert!(matches!(err, SubmitError::Rejected(ref m) if m.contains("already exists")));
    assert!(matches!(editor.state(), EditorState::SaveFailed { .. }));
    assert!(editor.is_open());
    assert_eq!(editor.draft().title, "Taken");
    assert_eq!(editor.draft().content.plain_text(), "text");
    assert!(store.writes().await.is_empty());

    // Fixing the slug and resubmitting succeeds.
    editor.set_slug("taken-2");
    admin.submit(&mut editor).await.unwrap();
    assert_eq!(store.writes().await, vec!["insert:taken-2".to_string()]);
}

/// Wraps the SQLite store but never reports an existing slug, as if another
/// admin inserted it between the pre-check and the write.
struct RacingStore(SqliteStore);

#[async_trait]
impl PostStore for RacingStore {
    async fn list_posts(&self) -> Result<Vec<PostListing>, StoreError> {
        self.0.list_posts().await
    }
    async fn find_post_by_slug(&self, _slug: &str) -> Result<Option<Post>, StoreError> {
        Ok(None)
    }
    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        self.0.get_post(id).await
    }
    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError> {
        self.0.insert_post(post).await
    }
    async fn update_post(&self, id: &str, changes: PostChanges) -> Result<Post, StoreError> {
        self.0.update_post(id, changes).await
    }
    async fn delete_post(&self, id: &str) -> Result<(), StoreError> {
        self.0.delete_post(id).await
    }
    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        self.0.get_profile(id).await
    }
    async fn upsert_profile(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        self.0.upsert_profile(profile).await
    }
    async fn update_profile_role(&self, id: &str, role: Role) -> Result<(), StoreError> {
        self.0.update_profile_role(id, role).await
    }
}

async fn sqlite_store() -> SqliteStore {
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    store
        .upsert_profile(NewProfile {
            id: "admin-1".into(),
            name: Some("Ada".into()),
            avatar_url: Some("https://cdn.example.dev/ada.png".into()),
            role: Role::Admin,
            email: Some("ada@example.dev".into()),
        })
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn sqlite_round_trip_with_author_join() {
    let store = sqlite_store().await;
    let mut admin = AdminWorkflow::new(store.clone(), Some("admin-1".into()), TTL);

    admin.save_post(None, payload("One", "one")).await.unwrap();
    admin.save_post(None, payload("Two", "two")).await.unwrap();

    let slugs: Vec<_> = admin.posts().iter().map(|l| l.post.slug.as_str()).collect();
    assert_eq!(slugs, vec!["two", "one"]);
    let author = admin.posts()[0].author.clone().unwrap();
    assert_eq!(author.name.as_deref(), Some("Ada"));

    let id = admin.posts()[1].post.id.clone();
    admin.request_delete(&id).await;
    assert_eq!(admin.request_delete(&id).await, DeleteOutcome::Deleted);
    assert_eq!(admin.posts().len(), 1);
    assert!(store.get_post(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn unique_constraint_backs_up_the_precheck() {
    let store = sqlite_store().await;
    store
        .insert_post(NewPost {
            title: "First".into(),
            slug: "dup".into(),
            content: "{}".into(),
            media_url: None,
            post_type: PostType::Blog,
            author_id: None,
        })
        .await
        .unwrap();

    let mut admin = AdminWorkflow::new(RacingStore(store), None, TTL);
    let err = admin.save_post(None, payload("Second", "dup")).await.unwrap_err();
    assert!(matches!(err, AdminError::SlugTaken(ref s) if s == "dup"));
    let notice = admin.notices().active().last().cloned().unwrap();
    assert!(notice.message.contains("already exists"));
}
