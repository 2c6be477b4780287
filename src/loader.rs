//! Page-level loaders for the public blog pages.
//!
//! Fetch failures never reach the page: the index degrades to an empty list
//! and a post page degrades to "Post Not Found".
use std::fmt;
use tracing::{instrument, warn};

use crate::graphql::model::PublicationPost;
use crate::graphql::ContentSource;

#[derive(Debug, Clone, PartialEq)]
pub enum PostPage {
    Found(PublicationPost),
    NotFound,
}

impl PostPage {
    pub fn post(&self) -> Option<&PublicationPost> {
        match self {
            PostPage::Found(post) => Some(post),
            PostPage::NotFound => None,
        }
    }
}

impl fmt::Display for PostPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostPage::Found(post) => {
                writeln!(f, "# {}", post.title)?;
                if let Some(subtitle) = post.subtitle.as_deref().filter(|s| !s.is_empty()) {
                    writeln!(f, "_{}_", subtitle)?;
                }
                if let Some(author) = &post.author {
                    writeln!(f, "by {}", author.name)?;
                }
                if let Some(minutes) = post.read_time_in_minutes {
                    writeln!(f, "{} min read", minutes)?;
                }
                writeln!(f)?;
                write!(f, "{}", post.markdown().unwrap_or_default())
            }
            PostPage::NotFound => write!(f, "Post Not Found"),
        }
    }
}

#[instrument(skip_all)]
pub async fn load_index(source: &dyn ContentSource) -> Vec<PublicationPost> {
    match source.list_posts().await {
        Ok(posts) => posts,
        Err(err) => {
            warn!(error = %err, "failed to load post index; showing empty list");
            Vec::new()
        }
    }
}

#[instrument(skip(source))]
pub async fn load_post_page(source: &dyn ContentSource, slug: &str) -> PostPage {
    match source.post_by_slug(slug).await {
        Ok(Some(post)) => PostPage::Found(post),
        Ok(None) => PostPage::NotFound,
        Err(err) => {
            warn!(error = %err, "failed to load post; rendering not found");
            PostPage::NotFound
        }
    }
}
