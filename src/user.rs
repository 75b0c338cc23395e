//! # Client Specifications
//!
//! What the client does for each role and which endpoints back it.
//!
//! ## Session
//! - Login stores the bearer token in `.petition-token` (override with `PETITION_TOKEN_FILE`)
//! - Each run decodes the token payload to get `userId` and `role`, no signature check
//! - Expired tokens are ignored and the user is treated as logged out
//! - Logout deletes the file
//!
//! ## Routes
//! - `/login`, `/register`: public
//! - `/dashboard`: petitioner only
//! - `/admin`: admin only
//!
//! Anything else redirects to `/login`. After login the user lands on
//! `/dashboard` or `/admin` depending on role.
//!
//! ## Register
//! To backend
//! - `POST /petitioner/register` with email, fullName, dob (YYYY-MM-DD), password, bioId
//!
//! The client rejects unknown BioIDs before sending.
//!
//! From backend
//! - 201 `{ message }`
//! - 400 `{ error }` on a missing field, bad email or date, unknown BioID, or a taken email/BioID
//!
//! ## Petitioner Dashboard
//! - `GET /petitioner/petitions`, optional `?status=open|closed`
//! - Bar chart of open vs closed counts
//! - Every petition with owner, status and signature count
//! - Open petitions with a sign hint, or "already signed"
//!
//! Create and sign
//! - `POST /petitioner/petitions` with title, text
//! - `POST /petitioner/petitions/{id}/sign`
//! - Dashboard is fetched again after either succeeds
//!
//! ## Admin Dashboard
//! - `GET /admin/petitions`
//! - `POST /admin/petitions/{id}/respond` with response, closes the petition
//! - Responding to a closed petition is a 400
//!
//! ## Errors
//! Non-2xx replies carry `{ "error": string }`, printed as is.
