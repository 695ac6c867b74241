use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    BlogPost,
    Article,
    MarketingCopy,
    SocialMedia,
    CreativeStory,
    Email,
}

impl ContentType {
    pub const ALL: [ContentType; 6] = [
        ContentType::BlogPost,
        ContentType::Article,
        ContentType::MarketingCopy,
        ContentType::SocialMedia,
        ContentType::CreativeStory,
        ContentType::Email,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::BlogPost => "blog_post",
            ContentType::Article => "article",
            ContentType::MarketingCopy => "marketing_copy",
            ContentType::SocialMedia => "social_media",
            ContentType::CreativeStory => "creative_story",
            ContentType::Email => "email",
        }
    }

    /// Human wording used inside prompts ("blog post", "marketing copy").
    pub fn label(self) -> &'static str {
        match self {
            ContentType::BlogPost => "blog post",
            ContentType::Article => "article",
            ContentType::MarketingCopy => "marketing copy",
            ContentType::SocialMedia => "social media post",
            ContentType::CreativeStory => "creative story",
            ContentType::Email => "email",
        }
    }
}

impl FromStr for ContentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
        ContentType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| anyhow::anyhow!("unknown content type {s:?}"))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored status of a record. Generation only ever writes the terminal
/// `completed` and `failed`; `pending` stays readable for rows that other
/// writers left mid-flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Pending,
    Completed,
    Failed,
}

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::Pending => "pending",
            ContentStatus::Completed => "completed",
            ContentStatus::Failed => "failed",
        }
    }
}

impl FromStr for ContentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ContentStatus::Pending),
            "completed" => Ok(ContentStatus::Completed),
            "failed" => Ok(ContentStatus::Failed),
            other => anyhow::bail!("unknown content status {other:?}"),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ContentRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content_type: String,
    pub body: String,
    pub status: String,
    pub word_count: i32,
    pub metadata: serde_json::Value,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A stored unit of generated text.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content_type: ContentType,
    pub body: String,
    pub status: ContentStatus,
    pub word_count: i32,
    pub metadata: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<ContentRow> for Content {
    type Error = anyhow::Error;

    fn try_from(r: ContentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            owner_id: r.owner_id,
            title: r.title,
            content_type: r.content_type.parse()?,
            body: r.body,
            status: r.status.parse()?,
            word_count: r.word_count,
            metadata: r.metadata,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// A generation outcome, written once the provider call has returned.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub owner_id: Uuid,
    pub title: String,
    pub content_type: ContentType,
    pub status: ContentStatus,
    pub body: String,
    pub word_count: i32,
    pub metadata: serde_json::Value,
}

/// Owner edits. `None` leaves the stored value untouched; `metadata` replaces
/// the stored object (callers merge beforehand).
#[derive(Debug, Clone, Default)]
pub struct ContentPatch {
    pub title: Option<String>,
    pub content_type: Option<ContentType>,
    pub body: Option<String>,
    pub word_count: Option<i32>,
    pub metadata: Option<serde_json::Value>,
}

/// Whitespace-separated word count of a body.
pub fn count_words(body: &str) -> i32 {
    body.split_whitespace().count().min(i32::MAX as usize) as i32
}

pub fn reading_time_minutes(word_count: i32) -> i32 {
    (word_count / 200).max(1)
}
