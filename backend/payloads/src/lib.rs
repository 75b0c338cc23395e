//! # Payloads
//!
//! Structures shared between the server and the client. Everything here is
//! serialized as camelCase JSON on the wire.
//!
//! ## Layout
//! - [`models`]: roles, petition status, token claims and the petition views returned by listings
//! - [`requests`]: request/response bodies for every endpoint
//! - [`bio`]: the BioID allow-list checked at registration

pub mod bio;
pub mod models;
pub mod requests;

pub use bio::{BIO_IDS, is_valid_bio_id, parse_bio_ids};
pub use models::{Claims, PetitionView, PetitionerView, Role, Status, UnknownVariant};
pub use requests::{
    CreatePetitionRequest, CreatedPetitionResponse, ErrorResponse, LoginRequest, LoginResponse,
    MessageResponse, PetitionsResponse, RegisterRequest, RespondRequest,
};
