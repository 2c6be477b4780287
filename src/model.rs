use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::RichDocument;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Blog,
    Vlog,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Blog => "blog",
            PostType::Vlog => "vlog",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blog" => Some(PostType::Blog),
            "vlog" => Some(PostType::Vlog),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    /// Raw rich-text document as stored (see [`RichDocument::to_raw`]).
    pub content: String,
    pub media_url: Option<String>,
    pub post_type: PostType,
    pub author_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display slice of a profile joined onto listed posts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorSummary {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostListing {
    pub post: Post,
    pub author: Option<AuthorSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub email: Option<String>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Normalized fields handed from the editor to the save callback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostPayload {
    pub title: String,
    pub slug: String,
    pub content: RichDocument,
    pub media_url: Option<String>,
    #[serde(rename = "type")]
    pub post_type: PostType,
}
