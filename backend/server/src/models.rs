use chrono::NaiveDate;
use payloads::{PetitionView, PetitionerView, Role, Status};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored user record. Never serialized into a response; use
/// [`User::as_petitioner`] for the public projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub dob: NaiveDate,
    pub password_hash: String,
    pub bio_id: String,
    pub role: Role,
}

impl User {
    pub fn new(
        email: String,
        full_name: String,
        dob: NaiveDate,
        password_hash: String,
        bio_id: String,
        role: Role,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            full_name,
            dob,
            password_hash,
            bio_id,
            role,
        }
    }

    pub fn as_petitioner(&self) -> PetitionerView {
        PetitionerView {
            id: self.id.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Petition {
    pub id: String,
    pub title: String,
    pub text: String,
    pub status: Status,
    pub petitioner: String,
    pub signatures: Vec<String>,
    pub response: Option<String>,
}

impl Petition {
    pub fn new(title: String, text: String, petitioner: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            text,
            status: Status::Open,
            petitioner,
            signatures: Vec::new(),
            response: None,
        }
    }

    pub fn into_view(self, petitioner: Option<PetitionerView>) -> PetitionView {
        PetitionView {
            id: self.id,
            title: self.title,
            text: self.text,
            status: self.status,
            petitioner,
            signatures: self.signatures,
            response: self.response,
        }
    }
}

/// Result of inserting a user while reserving its unique keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutcome {
    Signed,
    AlreadySigned,
    Closed,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    AlreadyClosed,
    NotFound,
}
