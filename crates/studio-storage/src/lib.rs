mod account_repo;
mod database;
mod gallery_repo;
mod snapshot_repo;

#[cfg(test)]
mod tests;

pub use account_repo::{AccountRepo, SqliteAccountStore};
pub use database::Database;
pub use gallery_repo::GalleryRepo;
pub use snapshot_repo::{SnapshotRepo, SnapshotSummary};
