//! Inventory of remote folders and files
//!
//! This module holds the crawl result model:
//!
//! - `FolderRecord` / `FileRecord`: what one directory listing contained
//! - `Inventory`: directory id → folder record, with JSON persistence
//! - `SharedInventory` and `VisitedSet`: the synchronized state crawl
//!   workers update concurrently

mod store;
mod types;

pub use store::{Inventory, RenameRow, SharedInventory, VisitedSet};
pub use types::{FileRecord, FolderRecord};
