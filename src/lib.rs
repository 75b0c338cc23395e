//! # Petition Documentation
//!
//! Petition platform: petitioners register with an allow-listed BioID, create
//! petitions and sign each other's, administrators respond and close them.
//!
//! ## Crates
//! - `backend`: the `petition-server` binary
//! - `backend/server`: axum app, auth, storage
//! - `backend/payloads`: wire structures shared with the client
//! - `backend/client`: the `petition-cli` terminal client
//!
//! ## Notes
//!
//! ### Signing
//! - One signature per user per petition, enforced in the store not the handler
//! - Redis does the check and the append inside one Lua script
//!
//! ### Closing
//! - `closed` if and only if a response is stored, both written together

pub mod user;
