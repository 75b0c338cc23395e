//! # Client
//!
//! Terminal client for the petition platform.
//!
//! ## Flow
//!
//! - `register` checks the BioID against the allow-list before sending, the server checks again.
//!   `--bio-id-file` swaps in the same file the server reads from `BIO_ID_FILE`
//! - `login` stores the token and lands on the page for the token's role
//! - Every later command restores the session from the stored token
//! - Protected commands pass through [`guard::guard`] first and bounce to login on a mismatch
//! - After `create`, `sign` and `respond` the dashboard is fetched again so it shows the new state
//!
//! The guard only decides what the client offers. Tokens are decoded without
//! verification, so the server re-checks identity and role on every request.

pub mod allow_list;
pub mod api;
pub mod dashboard;
pub mod guard;
pub mod session;

pub use allow_list::AllowList;
pub use api::{ApiClient, ClientError};
pub use guard::{Route, guard};
pub use session::{Action, AuthState, Session, TokenStore, decode_claims};
