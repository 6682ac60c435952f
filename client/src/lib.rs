//! cities-client: client-side state for the WorldWise cities app.
//!
//! Two independent stores:
//! - [`RecordStore`] caches the remote `cities` collection and tracks a
//!   loading/error state machine around list, get, create and delete.
//! - [`SessionStore`] holds the signed-in user, checked by an injectable
//!   [`CredentialVerifier`].
//!
//! Stores are cheap handles; pass clones to whoever needs them.

pub mod error;
pub mod records;
pub mod remote;
pub mod session;

pub use error::RemoteError;
pub use records::{RecordAction, RecordState, RecordStore};
pub use remote::{CityCollection, HttpCollection};
pub use session::{CredentialVerifier, SessionAction, SessionState, SessionStore, StaticCredentials};

/// Where the mock collection endpoint listens by default.
pub const BASE_URL: &str = "http://localhost:3000";
