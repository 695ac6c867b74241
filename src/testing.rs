//! In-memory stores for unit and router tests.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{DuplicateUser, NewUser, ProfilePatch, User},
    },
    content::{
        repo::ContentRepo,
        repo_types::{Content, ContentPatch, ContentType, NewContent},
    },
};

#[derive(Default)]
pub struct MemoryUserRepo {
    users: Mutex<Vec<User>>,
}

impl MemoryUserRepo {
    pub fn deactivate(&self, id: Uuid) {
        let mut users = self.users.lock().unwrap();
        if let Some(u) = users.iter_mut().find(|u| u.id == id) {
            u.is_active = false;
        }
    }
}

fn taken(
    users: &[User],
    except: Option<Uuid>,
    email: Option<&str>,
    username: Option<&str>,
) -> Option<DuplicateUser> {
    let others = || users.iter().filter(move |u| Some(u.id) != except);
    if let Some(email) = email {
        if others().any(|u| u.email == email) {
            return Some(DuplicateUser { field: "email" });
        }
    }
    if let Some(username) = username {
        if others().any(|u| u.username == username) {
            return Some(DuplicateUser { field: "username" });
        }
    }
    None
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let mut users = self.users.lock().unwrap();
        if let Some(dup) = taken(&users, None, Some(&new.email), Some(&new.username)) {
            return Err(dup.into());
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            username: new.username,
            password_hash: new.password_hash,
            full_name: new.full_name,
            is_active: true,
            is_verified: false,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        let dup = taken(&users, Some(id), patch.email.as_deref(), patch.username.as_deref());
        if let Some(dup) = dup {
            return Err(dup.into());
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(full_name) = patch.full_name {
            user.full_name = Some(full_name);
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }
}

#[derive(Default)]
pub struct MemoryContentRepo {
    rows: Mutex<Vec<Content>>,
}

#[async_trait]
impl ContentRepo for MemoryContentRepo {
    async fn insert(&self, new: NewContent) -> anyhow::Result<Content> {
        let now = OffsetDateTime::now_utc();
        let content = Content {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            title: new.title,
            content_type: new.content_type,
            body: new.body,
            status: new.status,
            word_count: new.word_count,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(content.clone());
        Ok(content)
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        content_type: Option<ContentType>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Content>> {
        let rows = self.rows.lock().unwrap();
        // Newest first; later inserts win ties on equal timestamps.
        let mut owned: Vec<Content> = rows
            .iter()
            .rev()
            .filter(|c| c.owner_id == owner_id)
            .filter(|c| content_type.map_or(true, |t| c.content_type == t))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Content>> {
        Ok(self.rows.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn update(&self, id: Uuid, patch: ContentPatch) -> anyhow::Result<Option<Content>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(c) = rows.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            c.title = title;
        }
        if let Some(t) = patch.content_type {
            c.content_type = t;
        }
        if let Some(body) = patch.body {
            c.body = body;
        }
        if let Some(wc) = patch.word_count {
            c.word_count = wc;
        }
        if let Some(metadata) = patch.metadata {
            c.metadata = metadata;
        }
        c.updated_at = OffsetDateTime::now_utc();
        Ok(Some(c.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| c.id != id);
        Ok(rows.len() != before)
    }
}
