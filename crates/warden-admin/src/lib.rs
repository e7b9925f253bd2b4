//! # warden-admin
//!
//! Administration HTTP API for Warden.
//!
//! Reviewers use this API to inspect intercepted statements and decide on
//! them. Every endpoint maps directly onto the
//! [`QueryRecordStore`](warden_store::QueryRecordStore) contract; the proxy
//! never calls the API, it only reacts to the store transitions it causes.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Reviewer page with approve/reject buttons |
//! | `GET`  | `/health` | Liveness check |
//! | `GET`  | `/queries` | All records, newest first |
//! | `GET`  | `/queries/pending` | Records awaiting a decision |
//! | `GET`  | `/queries/{id}` | One record |
//! | `POST` | `/queries/{id}/approve` | Approve a pending record |
//! | `POST` | `/queries/{id}/reject` | Reject with `{ "reason": "..." }` |
//!
//! Responses use a `{ success, message?, data, count? }` envelope, and
//! failures return `{ success: false, error }`. CORS is open to any origin.

pub mod api_types;
pub mod error;
pub mod handlers;
pub mod pages;
pub mod routes;
pub mod server;
pub mod state;

pub use error::AdminError;
pub use routes::create_router;
pub use server::AdminServer;
pub use state::AppState;
