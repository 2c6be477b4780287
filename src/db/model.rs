//! Write models accepted by the repositories.
//!
//! Rows read back are mapped into the domain types in `crate::model`.

use crate::model::{PostType, Role};

/// Fields for a post being inserted. Id and timestamps are assigned by the repository.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub media_url: Option<String>,
    pub post_type: PostType,
    pub author_id: Option<String>,
}

/// Full replacement of a post's editable fields.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub media_url: Option<String>,
    pub post_type: PostType,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub email: Option<String>,
}
