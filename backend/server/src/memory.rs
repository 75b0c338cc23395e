//! In-process store used for tests and single-node development (`STORE=memory`).
//!
//! One write guard covers every check-then-write, which gives the same
//! atomicity as the Lua scripts in [`crate::database`].
use std::collections::HashMap;

use async_trait::async_trait;
use payloads::Status;
use tokio::sync::RwLock;

use crate::{
    database::{Store, StoreError},
    models::{CloseOutcome, InsertOutcome, Petition, SignOutcome, User},
};

#[derive(Default)]
struct Documents {
    users: HashMap<String, User>,
    emails: HashMap<String, String>,
    bio_ids: HashMap<String, String>,
    petitions: HashMap<String, Petition>,
    order: Vec<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<Documents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<InsertOutcome, StoreError> {
        let mut documents = self.documents.write().await;

        if documents.emails.contains_key(&user.email) || documents.bio_ids.contains_key(&user.bio_id)
        {
            return Ok(InsertOutcome::Duplicate);
        }

        documents
            .emails
            .insert(user.email.clone(), user.id.clone());
        documents
            .bio_ids
            .insert(user.bio_id.clone(), user.id.clone());
        documents.users.insert(user.id.clone(), user.clone());

        Ok(InsertOutcome::Inserted)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let documents = self.documents.read().await;

        Ok(documents
            .emails
            .get(email)
            .and_then(|id| documents.users.get(id))
            .cloned())
    }

    async fn find_users(&self, ids: &[String]) -> Result<Vec<User>, StoreError> {
        let documents = self.documents.read().await;

        Ok(ids
            .iter()
            .filter_map(|id| documents.users.get(id))
            .cloned()
            .collect())
    }

    async fn insert_petition(&self, petition: &Petition) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;

        if documents
            .petitions
            .insert(petition.id.clone(), petition.clone())
            .is_none()
        {
            documents.order.push(petition.id.clone());
        }

        Ok(())
    }

    async fn find_petition(&self, id: &str) -> Result<Option<Petition>, StoreError> {
        Ok(self.documents.read().await.petitions.get(id).cloned())
    }

    async fn list_petitions(&self, status: Option<Status>) -> Result<Vec<Petition>, StoreError> {
        let documents = self.documents.read().await;

        Ok(documents
            .order
            .iter()
            .filter_map(|id| documents.petitions.get(id))
            .filter(|petition| status.is_none_or(|status| status == petition.status))
            .cloned()
            .collect())
    }

    async fn sign_petition(&self, id: &str, user_id: &str) -> Result<SignOutcome, StoreError> {
        let mut documents = self.documents.write().await;

        let Some(petition) = documents.petitions.get_mut(id) else {
            return Ok(SignOutcome::NotFound);
        };

        if petition.status == Status::Closed {
            return Ok(SignOutcome::Closed);
        }

        if petition.signatures.iter().any(|signer| signer == user_id) {
            return Ok(SignOutcome::AlreadySigned);
        }

        petition.signatures.push(user_id.to_string());
        Ok(SignOutcome::Signed)
    }

    async fn close_petition(&self, id: &str, response: &str) -> Result<CloseOutcome, StoreError> {
        let mut documents = self.documents.write().await;

        let Some(petition) = documents.petitions.get_mut(id) else {
            return Ok(CloseOutcome::NotFound);
        };

        if petition.status == Status::Closed {
            return Ok(CloseOutcome::AlreadyClosed);
        }

        petition.status = Status::Closed;
        petition.response = Some(response.to_string());
        Ok(CloseOutcome::Closed)
    }
}
