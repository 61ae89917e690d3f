//! # chefsync-sync
//!
//! Checksum snapshots, diffing and reconciliation of a cookbook server.
//!
//! [`Planner::run`] compares the vendored cookbooks with the server and
//! deletes / uploads whole cookbooks until they match; [`SyncRun`] adds the
//! data bag, environment and role publishing around it. Every mutation goes
//! through a [`Converge`] gate so why-run mode shares the same plan.

pub mod checksum;
pub mod converge;
pub mod diff;
pub mod error;
pub mod ignore;
pub mod local;
pub mod metadata;
pub mod pipeline;
pub mod planner;
pub mod publish;
pub mod server;
pub mod store;

pub use checksum::{ChecksumIndex, ManifestSource};
pub use converge::Converge;
pub use diff::{diff, Classification};
pub use error::SyncError;
pub use ignore::IgnoreList;
pub use local::LocalCookbooks;
pub use pipeline::{RepoLayout, SyncRun};
pub use planner::{AlteredCookbooks, Planner};
pub use server::DirectoryServer;
pub use store::{ChefServer, CookbookStore, DataBagStore, ObjectStore};
