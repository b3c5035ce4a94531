//! Snippet entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::{Validate, ValidationError};
use weave_core::types::{DbId, Timestamp};

/// Canvas coordinates of a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Dimensions of an attached image reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct ImageMetadata {
    #[validate(range(min = 1, message = "must be positive"))]
    pub width: i64,
    #[validate(range(min = 1, message = "must be positive"))]
    pub height: i64,
    pub aspect_ratio: f64,
}

impl ImageMetadata {
    /// Metadata with the aspect ratio derived from the dimensions.
    pub fn from_dimensions(width: i64, height: i64) -> Self {
        Self {
            width,
            height,
            aspect_ratio: width as f64 / height as f64,
        }
    }
}

/// A snippet row from the `snippets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Snippet {
    pub id: DbId,
    pub project_id: DbId,
    pub text_primary: String,
    pub text_secondary: Option<String>,
    pub pos_x: f64,
    pub pos_y: f64,
    pub tags: Json<Vec<String>>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub image_width: Option<i64>,
    pub image_height: Option<i64>,
    pub image_aspect_ratio: Option<f64>,
    /// Always references a row in this snippet's version ledger.
    pub current_version_id: DbId,
    /// Optimistic-concurrency token; bumped by every committed write.
    pub revision: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new snippet.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSnippet {
    #[validate(length(min = 1, max = 20000, message = "must be 1-20000 characters"))]
    pub text_primary: String,
    #[validate(length(max = 20000, message = "must be at most 20000 characters"))]
    pub text_secondary: Option<String>,
    #[validate(custom(function = validate_position))]
    pub position: Position,
    #[serde(default)]
    #[validate(custom(function = validate_tags))]
    pub tags: Vec<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub category: Option<String>,
    #[validate(length(max = 2048, message = "must be at most 2048 characters"))]
    pub image_url: Option<String>,
    #[validate(nested)]
    pub image_metadata: Option<ImageMetadata>,
}

/// DTO for updating an existing snippet. `None` leaves a field
/// unchanged; content changes (text or image) append a version,
/// position/tags/category changes do not.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateSnippet {
    #[validate(length(min = 1, max = 20000, message = "must be 1-20000 characters"))]
    pub text_primary: Option<String>,
    #[validate(length(max = 20000, message = "must be at most 20000 characters"))]
    pub text_secondary: Option<String>,
    #[validate(custom(function = validate_position))]
    pub position: Option<Position>,
    #[validate(custom(function = validate_tags))]
    pub tags: Option<Vec<String>>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub category: Option<String>,
    #[validate(length(max = 2048, message = "must be at most 2048 characters"))]
    pub image_url: Option<String>,
    #[validate(nested)]
    pub image_metadata: Option<ImageMetadata>,
    /// Base revision the caller read.
    pub revision: i64,
}

/// Maximum number of tags on one snippet.
const MAX_TAGS: usize = 32;

/// Maximum length of a single tag.
const MAX_TAG_LEN: usize = 50;

fn validate_tags(tags: &Vec<String>) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(ValidationError::new("tags")
            .with_message(format!("at most {MAX_TAGS} tags allowed").into()));
    }
    for tag in tags {
        if tag.is_empty() || tag.chars().count() > MAX_TAG_LEN {
            return Err(ValidationError::new("tags")
                .with_message(format!("each tag must be 1-{MAX_TAG_LEN} characters").into()));
        }
    }
    Ok(())
}

fn validate_position(position: &Position) -> Result<(), ValidationError> {
    if !position.x.is_finite() || !position.y.is_finite() {
        return Err(
            ValidationError::new("position").with_message("coordinates must be finite".into())
        );
    }
    Ok(())
}
