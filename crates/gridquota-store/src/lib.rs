//! GridQuota Store - per-user quota document storage
//!
//! One XML document per user, named `<user>.xml` under a configured root
//! directory. Mutations run as a locked load-mutate-save cycle, and every
//! save can be checked against the revision that was loaded.

mod lock;
pub mod store;

pub use store::{Applied, DocumentStore, LoadedDocument};
