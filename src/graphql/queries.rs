//! Query documents for the publication API.
//!
//! The host is spliced into the document text rather than passed as a
//! variable, so callers must hand in a host that already passed config
//! validation.

pub const LIST_PAGE_SIZE: u32 = 20;

const POST_FIELDS: &str = "id
        title
        brief
        slug
        url
        publishedAt
        updatedAt
        readTimeInMinutes
        views
        coverImage {
          url
        }
        author {
          name
        }
        subtitle";

/// First page of posts for a publication.
pub fn list_posts(host: &str) -> String {
    format!(
        r#"query ListPosts {{
  publication(host: "{host}") {{
    posts(first: {LIST_PAGE_SIZE}) {{
      edges {{
        node {{
        {POST_FIELDS}
        }}
      }}
    }}
  }}
}}"#
    )
}

/// A single post with its markdown body, selected by the `$slug` variable.
pub fn post_by_slug(host: &str) -> String {
    format!(
        r#"query PostBySlug($slug: String!) {{
  publication(host: "{host}") {{
    post(slug: $slug) {{
        {POST_FIELDS}
        content {{
          markdown
        }}
    }}
  }}
}}"#
    )
}
