use super::model::{NewPost, NewProfile, PostChanges};
use super::StoreError;
use crate::model::{AuthorSummary, Post, PostListing, PostType, Profile, Role};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::instrument;
use uuid::Uuid;

pub type Pool = SqlitePool;

const POST_COLUMNS: &str =
    "p.id, p.title, p.slug, p.content, p.media_url, p.type, p.author_id, p.created_at, p.updated_at";

pub async fn init_pool(database_url: &str) -> Result<Pool, StoreError> {
    let normalized = prepare_sqlite_url(database_url);
    let in_memory = normalized.contains(":memory:");
    let options = SqliteConnectOptions::from_str(&normalized)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full);
    // Every in-memory connection is its own database; keep exactly one.
    let max = if in_memory { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = format!("sqlite://{}", expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn post_from_row(row: &SqliteRow) -> Result<Post, StoreError> {
    let id: String = row.try_get("id")?;
    let type_str: String = row.try_get("type")?;
    let post_type = PostType::parse(&type_str)
        .ok_or_else(|| StoreError::Corrupt(format!("post {} has unknown type {}", id, type_str)))?;
    Ok(Post {
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        content: row.try_get("content")?,
        media_url: row.try_get("media_url")?,
        post_type,
        author_id: row.try_get("author_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        id,
    })
}

fn profile_from_row(row: &SqliteRow) -> Result<Profile, StoreError> {
    let id: String = row.try_get("id")?;
    let role_str: String = row.try_get("role")?;
    let role = Role::parse(&role_str)
        .ok_or_else(|| StoreError::Corrupt(format!("profile {} has unknown role {}", id, role_str)))?;
    Ok(Profile {
        name: row.try_get("name")?,
        avatar_url: row.try_get("avatar_url")?,
        role,
        email: row.try_get("email")?,
        id,
    })
}

/// The slug column is UNIQUE; a violation is the authoritative conflict signal.
fn map_write_error(err: sqlx::Error, slug: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::SlugTaken(slug.to_string());
        }
    }
    StoreError::Database(err)
}

/// All posts, newest first, each joined with its author's display profile.
#[instrument(skip_all)]
pub async fn list_posts(pool: &Pool) -> Result<Vec<PostListing>, StoreError> {
    let sql = format!(
        "SELECT {POST_COLUMNS}, a.id AS author_profile_id, a.name AS author_name, a.avatar_url AS author_avatar_url \
         FROM posts p \
         LEFT JOIN profiles a ON a.id = p.author_id \
         ORDER BY p.created_at DESC, p.rowid DESC"
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter()
        .map(|row| -> Result<PostListing, StoreError> {
            let post = post_from_row(row)?;
            let author = row
                .try_get::<Option<String>, _>("author_profile_id")?
                .map(|_| -> Result<AuthorSummary, StoreError> {
                    Ok(AuthorSummary {
                        name: row.try_get("author_name")?,
                        avatar_url: row.try_get("author_avatar_url")?,
                    })
                })
                .transpose()?;
            Ok(PostListing { post, author })
        })
        .collect()
}

#[instrument(skip_all)]
pub async fn find_post_by_slug(pool: &Pool, slug: &str) -> Result<Option<Post>, StoreError> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.slug = ?");
    let row = sqlx::query(&sql).bind(slug).fetch_optional(pool).await?;
    row.as_ref().map(post_from_row).transpose()
}

#[instrument(skip_all)]
pub async fn get_post(pool: &Pool, id: &str) -> Result<Option<Post>, StoreError> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?");
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(post_from_row).transpose()
}

#[instrument(skip_all)]
pub async fn insert_post(pool: &Pool, post: NewPost) -> Result<Post, StoreError> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO posts (id, title, slug, content, media_url, type, author_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.content)
    .bind(&post.media_url)
    .bind(post.post_type.as_str())
    .bind(&post.author_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|err| map_write_error(err, &post.slug))?;

    Ok(Post {
        id,
        title: post.title,
        slug: post.slug,
        content: post.content,
        media_url: post.media_url,
        post_type: post.post_type,
        author_id: post.author_id,
        created_at: now,
        updated_at: now,
    })
}

#[instrument(skip_all)]
pub async fn update_post(pool: &Pool, id: &str, changes: PostChanges) -> Result<Post, StoreError> {
    let result = sqlx::query(
        "UPDATE posts SET title = ?, slug = ?, content = ?, media_url = ?, type = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&changes.title)
    .bind(&changes.slug)
    .bind(&changes.content)
    .bind(&changes.media_url)
    .bind(changes.post_type.as_str())
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|err| map_write_error(err, &changes.slug))?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("post", id));
    }
    get_post(pool, id)
        .await?
        .ok_or_else(|| StoreError::not_found("post", id))
}

#[instrument(skip_all)]
pub async fn delete_post(pool: &Pool, id: &str) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("post", id));
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn get_profile(pool: &Pool, id: &str) -> Result<Option<Profile>, StoreError> {
    let row = sqlx::query("SELECT id, name, avatar_url, role, email FROM profiles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(profile_from_row).transpose()
}

#[instrument(skip_all)]
pub async fn upsert_profile(pool: &Pool, profile: NewProfile) -> Result<Profile, StoreError> {
    sqlx::query(
        "INSERT INTO profiles (id, name, avatar_url, role, email) VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, avatar_url = excluded.avatar_url, \
         role = excluded.role, email = excluded.email",
    )
    .bind(&profile.id)
    .bind(&profile.name)
    .bind(&profile.avatar_url)
    .bind(profile.role.as_str())
    .bind(&profile.email)
    .execute(pool)
    .await?;
    Ok(Profile {
        id: profile.id,
        name: profile.name,
        avatar_url: profile.avatar_url,
        role: profile.role,
        email: profile.email,
    })
}

#[instrument(skip_all)]
pub async fn update_profile_role(pool: &Pool, id: &str, role: Role) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE profiles SET role = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("profile", id));
    }
    Ok(())
}
