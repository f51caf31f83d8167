//! GridQuota Tree - the per-user quota configuration tree
//!
//! This crate provides:
//! - The in-memory browser -> version -> region -> host model
//! - The XML codec with canonical, idempotent serialization
//! - The mutation engine (find-or-create sections, host append, cascading removal)
//! - The read-only query view with sorted and raw listing modes
//!
//! # Example
//!
//! ```rust
//! use gridquota_common::ListMode;
//! use gridquota_tree::{Host, QuotaDocument, SectionPath, add_host, codec, list_sections};
//!
//! let mut doc = QuotaDocument::new();
//! let section = SectionPath::new("chrome", "90", "eu");
//! add_host(&mut doc, &section, Host::new("h1", "4444", "5"));
//!
//! let xml = codec::serialize(&doc).unwrap();
//! assert_eq!(codec::parse(&xml).unwrap(), doc);
//!
//! let view = list_sections(&doc, ListMode::Sorted);
//! assert_eq!(view.browsers[0].versions[0].regions[0].hosts[0].name, "h1");
//! ```

pub mod codec;
pub mod model;
pub mod mutation;
pub mod query;

pub use model::{
    Browser, DEFAULT_ROOT_ELEMENT, ExtraAttributes, Host, QuotaDocument, Region, RootElement,
    Version,
};
pub use mutation::{
    Created, Mutation, MutationOutcome, SectionPath, add_host, add_section, remove_host,
    remove_section,
};
pub use query::{BrowserView, HostView, QuotaView, RegionView, VersionView, list_sections};
