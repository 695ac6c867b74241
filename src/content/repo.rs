use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{
    Content, ContentPatch, ContentRow, ContentType, NewContent,
};

const CONTENT_COLUMNS: &str = "id, owner_id, title, content_type, body, status, word_count, \
                               metadata, created_at, updated_at";

/// Content store. Owner checks live in the services; the store is plain CRUD
/// by id plus the owner-scoped listing.
#[async_trait]
pub trait ContentRepo: Send + Sync {
    async fn insert(&self, new: NewContent) -> anyhow::Result<Content>;
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        content_type: Option<ContentType>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Content>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Content>>;
    async fn update(&self, id: Uuid, patch: ContentPatch) -> anyhow::Result<Option<Content>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgContentRepo {
    db: PgPool,
}

impl PgContentRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContentRepo for PgContentRepo {
    async fn insert(&self, new: NewContent) -> anyhow::Result<Content> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            r#"
            INSERT INTO contents (owner_id, title, content_type, status, body, word_count, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CONTENT_COLUMNS}
            "#
        ))
        .bind(new.owner_id)
        .bind(&new.title)
        .bind(new.content_type.as_str())
        .bind(new.status.as_str())
        .bind(&new.body)
        .bind(new.word_count)
        .bind(&new.metadata)
        .fetch_one(&self.db)
        .await?;
        row.try_into()
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        content_type: Option<ContentType>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Content>> {
        let rows = sqlx::query_as::<_, ContentRow>(&format!(
            r#"
            SELECT {CONTENT_COLUMNS}
              FROM contents
             WHERE owner_id = $1
               AND ($2::text IS NULL OR content_type = $2)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4
            "#
        ))
        .bind(owner_id)
        .bind(content_type.map(ContentType::as_str))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(Content::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Content>> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM contents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(Content::try_from).transpose()
    }

    async fn update(&self, id: Uuid, patch: ContentPatch) -> anyhow::Result<Option<Content>> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            r#"
            UPDATE contents
               SET title = COALESCE($2, title),
                   content_type = COALESCE($3, content_type),
                   body = COALESCE($4, body),
                   word_count = COALESCE($5, word_count),
                   metadata = COALESCE($6, metadata),
                   updated_at = now()
             WHERE id = $1
            RETURNING {CONTENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.title)
        .bind(patch.content_type.map(ContentType::as_str))
        .bind(&patch.body)
        .bind(patch.word_count)
        .bind(&patch.metadata)
        .fetch_optional(&self.db)
        .await?;
        row.map(Content::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM contents WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
