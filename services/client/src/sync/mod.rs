//! services/client/src/sync/mod.rs
//!
//! The data-synchronization layer: the query cache, the key catalogue, the
//! query/mutation surfaces built on it, and the session context.

pub mod cache;
pub mod events;
pub mod keys;
pub mod registrations;
pub mod session;

pub use cache::{CacheTransaction, QueryCache, QueryKey, QueryStatus};
pub use events::EventQueries;
pub use registrations::{
    DashboardEntry, DedicatedBackend, MirroredBackend, RegistrationBackend, RegistrationQueries,
};
pub use session::{SessionContext, SessionPhase, AUTH_TOKEN_KEY, USER_DATA_KEY};
