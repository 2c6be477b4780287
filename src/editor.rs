//! Post editor: draft state, slug derivation, validation and the submit cycle.
//!
//! ```text
//! Empty -> Editing -> Validating -> Invalid -> Editing ...
//!                                -> Submitting -> Saved
//!                                              -> SaveFailed -> Editing ...
//! ```
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::content::RichDocument;
use crate::model::{Post, PostPayload, PostType};
use crate::slug::{derive_slug, slug_has_space};

/// Persistence callback invoked once per accepted submit.
#[async_trait]
pub trait SavePost: Send {
    async fn save(&mut self, payload: PostPayload) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Title,
    Slug,
    Content,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Slug => "slug",
            Field::Content => "content",
        }
    }
}

/// Field-keyed validation messages; every failing rule is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<Field, &'static str>);

impl ValidationErrors {
    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &'static str)> + '_ {
        self.0.iter().map(|(f, m)| (*f, *m))
    }

    fn insert(&mut self, field: Field, message: &'static str) {
        self.0.insert(field, message);
    }

    fn remove(&mut self, field: Field) {
        self.0.remove(&field);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(field, msg)| format!("{}: {}", field.as_str(), msg))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorState {
    Empty,
    Editing,
    Validating,
    Invalid,
    Submitting,
    Saved,
    SaveFailed { message: String },
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("a save is already in progress")]
    InFlight,
    #[error("editor is closed")]
    Closed,
    #[error("invalid draft: {0}")]
    Invalid(ValidationErrors),
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub title: String,
    pub slug: String,
    pub media_url: String,
    pub post_type: PostType,
    pub content: RichDocument,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            title: String::new(),
            slug: String::new(),
            media_url: String::new(),
            post_type: PostType::Blog,
            content: RichDocument::empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostEditor {
    original: Option<Post>,
    draft: Draft,
    slug_touched: bool,
    state: EditorState,
    errors: ValidationErrors,
}

impl Default for PostEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl PostEditor {
    /// Editor for a brand-new post.
    pub fn new() -> Self {
        Self {
            original: None,
            draft: Draft::default(),
            slug_touched: false,
            state: EditorState::Empty,
            errors: ValidationErrors::default(),
        }
    }

    /// Editor pre-filled from a stored post. Content that is not a raw
    /// document is loaded as plain text.
    pub fn edit(post: &Post) -> Self {
        let content = RichDocument::from_raw(&post.content).unwrap_or_else(|err| {
            debug!(id = %post.id, ?err, "stored content is not a raw document");
            RichDocument::from_plain_text(&post.content)
        });
        Self {
            original: Some(post.clone()),
            draft: Draft {
                title: post.title.clone(),
                slug: post.slug.clone(),
                media_url: post.media_url.clone().unwrap_or_default(),
                post_type: post.post_type,
                content,
            },
            slug_touched: false,
            state: EditorState::Editing,
            errors: ValidationErrors::default(),
        }
    }

    pub fn original(&self) -> Option<&Post> {
        self.original.as_ref()
    }

    pub fn is_new(&self) -> bool {
        self.original.is_none()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn slug_touched(&self) -> bool {
        self.slug_touched
    }

    pub fn is_open(&self) -> bool {
        self.state != EditorState::Saved
    }

    /// Mirrors the submit control's enabled state.
    pub fn can_submit(&self) -> bool {
        !matches!(self.state, EditorState::Submitting | EditorState::Saved)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        if !self.is_open() {
            return;
        }
        self.draft.title = title.into();
        if self.is_new() && !self.slug_touched {
            self.draft.slug = derive_slug(&self.draft.title);
            self.errors.remove(Field::Slug);
        }
        self.touched(Some(Field::Title));
    }

    /// A direct slug edit permanently stops derivation from the title.
    pub fn set_slug(&mut self, slug: impl Into<String>) {
        if !self.is_open() {
            return;
        }
        self.draft.slug = slug.into();
        self.slug_touched = true;
        self.touched(Some(Field::Slug));
    }

    pub fn set_media_url(&mut self, media_url: impl Into<String>) {
        if !self.is_open() {
            return;
        }
        self.draft.media_url = media_url.into();
        self.touched(None);
    }

    pub fn set_post_type(&mut self, post_type: PostType) {
        if !self.is_open() {
            return;
        }
        self.draft.post_type = post_type;
        self.touched(None);
    }

    pub fn set_content(&mut self, content: RichDocument) {
        if !self.is_open() {
            return;
        }
        self.draft.content = content;
        self.touched(Some(Field::Content));
    }

    fn touched(&mut self, field: Option<Field>) {
        if let Some(field) = field {
            self.errors.remove(field);
        }
        if self.state != EditorState::Submitting {
            self.state = EditorState::Editing;
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.draft.title.trim().is_empty() {
            errors.insert(Field::Title, "Title is required");
        }
        let slug = self.draft.slug.trim();
        if slug.is_empty() {
            errors.insert(Field::Slug, "Slug is required");
        } else if slug_has_space(slug) {
            errors.insert(Field::Slug, "Slug cannot contain spaces");
        }
        if !self.draft.content.has_text() {
            errors.insert(Field::Content, "Content is required");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn payload(&self) -> PostPayload {
        let media_url = self.draft.media_url.trim();
        PostPayload {
            title: self.draft.title.trim().to_string(),
            slug: self.draft.slug.trim().to_string(),
            content: self.draft.content.clone(),
            media_url: (!media_url.is_empty()).then(|| media_url.to_string()),
            post_type: self.draft.post_type,
        }
    }

    /// Validate and enter `Submitting`, handing back the payload to save.
    pub fn begin_submit(&mut self) -> Result<PostPayload, SubmitError> {
        match self.state {
            EditorState::Submitting => return Err(SubmitError::InFlight),
            EditorState::Saved => return Err(SubmitError::Closed),
            _ => {}
        }
        self.state = EditorState::Validating;
        match self.validate() {
            Err(errors) => {
                debug!(%errors, "draft rejected by validation");
                self.errors = errors.clone();
                self.state = EditorState::Invalid;
                Err(SubmitError::Invalid(errors))
            }
            Ok(()) => {
                self.errors = ValidationErrors::default();
                self.state = EditorState::Submitting;
                Ok(self.payload())
            }
        }
    }

    /// Record the save callback's outcome. On failure the draft is kept as-is.
    pub fn finish_submit<E: fmt::Display>(&mut self, result: Result<(), E>) -> Result<(), SubmitError> {
        match result {
            Ok(()) => {
                info!(slug = %self.draft.slug, "post saved; closing editor");
                self.state = EditorState::Saved;
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                warn!(%message, "save failed; editor stays open");
                self.state = EditorState::SaveFailed {
                    message: message.clone(),
                };
                Err(SubmitError::Rejected(message))
            }
        }
    }

    pub async fn submit<S: SavePost + ?Sized>(&mut self, saver: &mut S) -> Result<(), SubmitError> {
        let payload = self.begin_submit()?;
        let result = saver.save(payload).await;
        self.finish_submit(result)
    }

    /// Discard the draft without saving.
    pub fn cancel(self) {
        debug!(new = self.is_new(), "editor cancelled");
    }
}
