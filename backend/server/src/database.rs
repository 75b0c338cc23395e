//! # Redis
//!
//! Document store for users and petitions.
//!
//! ## Requirements
//!
//! - O(1) lookup of a user by email at login
//! - Unique email and BioID across all users
//! - A user id appears at most once in a petition's signatures, even under concurrent requests
//! - Closing a petition happens exactly once
//!
//! ## Implementation
//!
//! - `user:{id}`: JSON document of the user record
//! - `users:email`, `users:bio`: hashes from email/BioID to user id, doubling as uniqueness indexes
//! - `petition:{id}`: hash with title, text, status, petitioner and, once closed, response
//! - `petition:{id}:signers`: set of signer ids, the uniqueness check
//! - `petition:{id}:signatures`: list of signer ids in signing order
//! - `petitions`: list of petition ids in creation order
//!
//! Every check-then-write runs as a Lua script so Redis executes it atomically.
//! Nothing else in the process holds state, so any number of server replicas
//! can share one Redis.
use std::{collections::HashMap, sync::LazyLock, time::Duration};

use async_trait::async_trait;
use payloads::Status;
use redis::{
    AsyncCommands, Client, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use thiserror::Error;

use crate::models::{CloseOutcome, InsertOutcome, Petition, SignOutcome, User};

const USER_EMAILS: &str = "users:email";
const USER_BIO_IDS: &str = "users:bio";
const PETITIONS: &str = "petitions";

// KEYS: users:email, users:bio, user:{id}
// ARGV: email, bio_id, id, document
const REGISTER_LUA: &str = r#"
if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 1 then return 0 end
if redis.call('HEXISTS', KEYS[2], ARGV[2]) == 1 then return 0 end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[3])
redis.call('HSET', KEYS[2], ARGV[2], ARGV[3])
redis.call('SET', KEYS[3], ARGV[4])
return 1
"#;

// KEYS: petition:{id}, petition:{id}:signers, petition:{id}:signatures
// ARGV: user_id
const SIGN_LUA: &str = r#"
local status = redis.call('HGET', KEYS[1], 'status')
if not status then return -1 end
if status == 'closed' then return -2 end
if redis.call('SADD', KEYS[2], ARGV[1]) == 0 then return 0 end
redis.call('RPUSH', KEYS[3], ARGV[1])
return 1
"#;

// KEYS: petition:{id}
// ARGV: response
const CLOSE_LUA: &str = r#"
local status = redis.call('HGET', KEYS[1], 'status')
if not status then return -1 end
if status == 'closed' then return 0 end
redis.call('HSET', KEYS[1], 'status', 'closed', 'response', ARGV[1])
return 1
"#;

static REGISTER_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(REGISTER_LUA));
static SIGN_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(SIGN_LUA));
static CLOSE_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(CLOSE_LUA));

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Malformed document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("Corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Storage seam shared by the Redis and in-memory backends.
///
/// Mutations that check before writing report the outcome instead of failing,
/// and must be atomic with respect to other calls on the same store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts the user unless its email or BioID is already taken.
    async fn insert_user(&self, user: &User) -> Result<InsertOutcome, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Unknown ids are skipped.
    async fn find_users(&self, ids: &[String]) -> Result<Vec<User>, StoreError>;

    async fn insert_petition(&self, petition: &Petition) -> Result<(), StoreError>;

    async fn find_petition(&self, id: &str) -> Result<Option<Petition>, StoreError>;

    /// Creation order, optionally restricted to one status.
    async fn list_petitions(&self, status: Option<Status>) -> Result<Vec<Petition>, StoreError>;

    async fn sign_petition(&self, id: &str, user_id: &str) -> Result<SignOutcome, StoreError>;

    /// Sets the response and closes the petition if it is still open.
    async fn close_petition(&self, id: &str, response: &str) -> Result<CloseOutcome, StoreError>;
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

pub async fn init_redis(redis_url: &str) -> Result<RedisStore, StoreError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_secs(1));

    let client = Client::open(redis_url)?;
    let connection = client.get_connection_manager_with_config(config).await?;

    Ok(RedisStore { connection })
}

fn user_key(id: &str) -> String {
    format!("user:{id}")
}

fn petition_key(id: &str) -> String {
    format!("petition:{id}")
}

fn signers_key(id: &str) -> String {
    format!("petition:{id}:signers")
}

fn signatures_key(id: &str) -> String {
    format!("petition:{id}:signatures")
}

fn take_field(
    fields: &mut HashMap<String, String>,
    key: &str,
    name: &str,
) -> Result<String, StoreError> {
    fields.remove(name).ok_or_else(|| StoreError::Corrupt {
        key: key.to_string(),
        reason: format!("missing field {name}"),
    })
}

fn parse_petition(
    id: &str,
    mut fields: HashMap<String, String>,
    signatures: Vec<String>,
) -> Result<Petition, StoreError> {
    let key = petition_key(id);

    let title = take_field(&mut fields, &key, "title")?;
    let text = take_field(&mut fields, &key, "text")?;
    let petitioner = take_field(&mut fields, &key, "petitioner")?;
    let status = take_field(&mut fields, &key, "status")?
        .parse::<Status>()
        .map_err(|e| StoreError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;

    Ok(Petition {
        id: id.to_string(),
        title,
        text,
        status,
        petitioner,
        signatures,
        response: fields.remove("response"),
    })
}

#[async_trait]
impl Store for RedisStore {
    async fn insert_user(&self, user: &User) -> Result<InsertOutcome, StoreError> {
        let mut con = self.connection.clone();
        let document = serde_json::to_string(user)?;

        let mut invocation = REGISTER_SCRIPT.prepare_invoke();
        invocation
            .key(USER_EMAILS)
            .key(USER_BIO_IDS)
            .key(user_key(&user.id))
            .arg(&user.email)
            .arg(&user.bio_id)
            .arg(&user.id)
            .arg(document);

        let inserted: i64 = invocation.invoke_async(&mut con).await?;

        Ok(if inserted == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Duplicate
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let mut con = self.connection.clone();

        let id: Option<String> = con.hget(USER_EMAILS, email).await?;
        let Some(id) = id else {
            return Ok(None);
        };

        let document: Option<String> = con.get(user_key(&id)).await?;

        Ok(document
            .map(|document| serde_json::from_str(&document))
            .transpose()?)
    }

    async fn find_users(&self, ids: &[String]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut con = self.connection.clone();
        let keys: Vec<String> = ids.iter().map(|id| user_key(id)).collect();

        // Explicit MGET, the typed helper sends GET for a single key
        let documents: Vec<Option<String>> =
            redis::cmd("MGET").arg(&keys).query_async(&mut con).await?;

        documents
            .into_iter()
            .flatten()
            .map(|document| serde_json::from_str(&document).map_err(StoreError::from))
            .collect()
    }

    async fn insert_petition(&self, petition: &Petition) -> Result<(), StoreError> {
        let mut con = self.connection.clone();
        let key = petition_key(&petition.id);

        let mut fields = vec![
            ("title", petition.title.as_str()),
            ("text", petition.text.as_str()),
            ("status", petition.status.as_str()),
            ("petitioner", petition.petitioner.as_str()),
        ];
        if let Some(response) = &petition.response {
            fields.push(("response", response.as_str()));
        }

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset_multiple(&key, fields.as_slice())
            .ignore()
            .rpush(PETITIONS, &petition.id)
            .ignore();

        for signer in &petition.signatures {
            pipe.sadd(signers_key(&petition.id), signer)
                .ignore()
                .rpush(signatures_key(&petition.id), signer)
                .ignore();
        }

        let _: () = pipe.query_async(&mut con).await?;

        Ok(())
    }

    async fn find_petition(&self, id: &str) -> Result<Option<Petition>, StoreError> {
        let mut con = self.connection.clone();

        let fields: HashMap<String, String> = con.hgetall(petition_key(id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }

        let signatures: Vec<String> = con.lrange(signatures_key(id), 0, -1).await?;

        parse_petition(id, fields, signatures).map(Some)
    }

    async fn list_petitions(&self, status: Option<Status>) -> Result<Vec<Petition>, StoreError> {
        let mut con = self.connection.clone();

        let ids: Vec<String> = con.lrange(PETITIONS, 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut records_pipe = redis::pipe();
        let mut signatures_pipe = redis::pipe();
        for id in &ids {
            records_pipe.hgetall(petition_key(id));
            signatures_pipe.lrange(signatures_key(id), 0, -1);
        }

        let records: Vec<HashMap<String, String>> = records_pipe.query_async(&mut con).await?;
        let signatures: Vec<Vec<String>> = signatures_pipe.query_async(&mut con).await?;

        let mut petitions = Vec::with_capacity(ids.len());
        for ((id, fields), signatures) in ids.iter().zip(records).zip(signatures) {
            if fields.is_empty() {
                continue;
            }

            let petition = parse_petition(id, fields, signatures)?;
            if status.is_none_or(|status| status == petition.status) {
                petitions.push(petition);
            }
        }

        Ok(petitions)
    }

    async fn sign_petition(&self, id: &str, user_id: &str) -> Result<SignOutcome, StoreError> {
        let mut con = self.connection.clone();

        let mut invocation = SIGN_SCRIPT.prepare_invoke();
        invocation
            .key(petition_key(id))
            .key(signers_key(id))
            .key(signatures_key(id))
            .arg(user_id);

        let outcome: i64 = invocation.invoke_async(&mut con).await?;

        Ok(match outcome {
            1 => SignOutcome::Signed,
            0 => SignOutcome::AlreadySigned,
            -2 => SignOutcome::Closed,
            _ => SignOutcome::NotFound,
        })
    }

    async fn close_petition(&self, id: &str, response: &str) -> Result<CloseOutcome, StoreError> {
        let mut con = self.connection.clone();

        let mut invocation = CLOSE_SCRIPT.prepare_invoke();
        invocation.key(petition_key(id)).arg(response);

        let outcome: i64 = invocation.invoke_async(&mut con).await?;

        Ok(match outcome {
            1 => CloseOutcome::Closed,
            0 => CloseOutcome::AlreadyClosed,
            _ => CloseOutcome::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use payloads::Role;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_parse_petition() {
        let fields = HashMap::from([
            ("title".to_string(), "Parks".to_string()),
            ("text".to_string(), "More parks".to_string()),
            ("status".to_string(), "closed".to_string()),
            ("petitioner".to_string(), "u1".to_string()),
            ("response".to_string(), "Done".to_string()),
        ]);

        let petition = parse_petition("p1", fields, vec!["u2".to_string()]).unwrap();
        assert_eq!(petition.status, Status::Closed);
        assert_eq!(petition.response.as_deref(), Some("Done"));
        assert_eq!(petition.signatures, vec!["u2".to_string()]);
    }

    #[test]
    fn test_parse_petition_missing_field() {
        let fields = HashMap::from([("title".to_string(), "Parks".to_string())]);

        let error = parse_petition("p1", fields, Vec::new()).unwrap_err();
        assert!(matches!(error, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_parse_petition_bad_status() {
        let fields = HashMap::from([
            ("title".to_string(), "Parks".to_string()),
            ("text".to_string(), "More parks".to_string()),
            ("status".to_string(), "pending".to_string()),
            ("petitioner".to_string(), "u1".to_string()),
        ]);

        assert!(parse_petition("p1", fields, Vec::new()).is_err());
    }

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
    }

    fn unique_user(role: Role) -> User {
        let tag = Uuid::new_v4().simple().to_string();

        User::new(
            format!("{tag}@example.com"),
            "Redis Tester".to_string(),
            NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            "hash".to_string(),
            format!("BIO-{tag}"),
            role,
        )
    }

    #[tokio::test]
    #[ignore = "requires a running redis at REDIS_URL"]
    async fn test_redis_user_uniqueness() {
        let store = init_redis(&redis_url()).await.unwrap();
        let user = unique_user(Role::Petitioner);

        assert_eq!(store.insert_user(&user).await.unwrap(), InsertOutcome::Inserted);

        let mut same_email = unique_user(Role::Petitioner);
        same_email.email = user.email.clone();
        assert_eq!(
            store.insert_user(&same_email).await.unwrap(),
            InsertOutcome::Duplicate
        );

        let found = store.find_user_by_email(&user.email).await.unwrap();
        assert_eq!(found, Some(user));
    }

    #[tokio::test]
    #[ignore = "requires a running redis at REDIS_URL"]
    async fn test_redis_sign_and_close() {
        let store = init_redis(&redis_url()).await.unwrap();
        let owner = unique_user(Role::Petitioner);
        store.insert_user(&owner).await.unwrap();

        let petition = Petition::new("Parks".into(), "More parks".into(), owner.id.clone());
        store.insert_petition(&petition).await.unwrap();

        assert_eq!(
            store.sign_petition(&petition.id, &owner.id).await.unwrap(),
            SignOutcome::Signed
        );
        assert_eq!(
            store.sign_petition(&petition.id, &owner.id).await.unwrap(),
            SignOutcome::AlreadySigned
        );
        assert_eq!(
            store.close_petition(&petition.id, "Acknowledged").await.unwrap(),
            CloseOutcome::Closed
        );
        assert_eq!(
            store.close_petition(&petition.id, "Again").await.unwrap(),
            CloseOutcome::AlreadyClosed
        );
        assert_eq!(
            store.sign_petition(&petition.id, "someone-else").await.unwrap(),
            SignOutcome::Closed
        );

        let stored = store.find_petition(&petition.id).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::Closed);
        assert_eq!(stored.response.as_deref(), Some("Acknowledged"));
        assert_eq!(stored.signatures, vec![owner.id.clone()]);

        let joined = store.find_users(&[owner.id.clone()]).await.unwrap();
        assert_eq!(joined.len(), 1);
    }

    #[tokio::test]
    async fn test_init_redis_unreachable() {
        assert!(init_redis("not a url").await.is_err());
        assert!(init_redis("redis://127.0.0.1:1").await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires a running redis at REDIS_URL"]
    async fn test_redis_concurrent_same_signer() {
        let store = init_redis(&redis_url()).await.unwrap();
        let owner = unique_user(Role::Petitioner);
        store.insert_user(&owner).await.unwrap();

        let petition = Petition::new("Parks".into(), "More parks".into(), owner.id.clone());
        store.insert_petition(&petition).await.unwrap();

        let attempts: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                let id = petition.id.clone();
                let signer = owner.id.clone();
                tokio::spawn(async move { store.sign_petition(&id, &signer).await.unwrap() })
            })
            .collect();

        let mut signed = 0;
        for attempt in attempts {
            if attempt.await.unwrap() == SignOutcome::Signed {
                signed += 1;
            }
        }

        assert_eq!(signed, 1);
        let stored = store.find_petition(&petition.id).await.unwrap().unwrap();
        assert_eq!(stored.signatures, vec![owner.id.clone()]);
    }
}
