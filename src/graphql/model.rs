use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicationPost {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub brief: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read_time_in_minutes: Option<u32>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub cover_image: Option<CoverImage>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub content: Option<PostContent>,
}

impl PublicationPost {
    pub fn cover_image_url(&self) -> Option<&str> {
        self.cover_image.as_ref().map(|c| c.url.as_str())
    }

    pub fn markdown(&self) -> Option<&str> {
        self.content.as_ref().map(|c| c.markdown.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoverImage {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostContent {
    pub markdown: String,
}

// Response envelopes for the two catalog queries.

#[derive(Deserialize, Debug)]
pub(crate) struct ListPostsData {
    pub publication: Option<ListPublication>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ListPublication {
    pub posts: PostConnection,
}

#[derive(Deserialize, Debug)]
pub(crate) struct PostConnection {
    #[serde(default)]
    pub edges: Vec<PostEdge>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct PostEdge {
    pub node: PublicationPost,
}

#[derive(Deserialize, Debug)]
pub(crate) struct PostBySlugData {
    pub publication: Option<SinglePublication>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct SinglePublication {
    pub post: Option<PublicationPost>,
}
