//! URL handling module for Index-Harvester
//!
//! This module provides directory-id parsing, construction of numbered
//! directory URLs, and derivation of safe local file names.

mod directory;
mod filename;

// Re-export main functions
pub use directory::{
    directory_id_from_url, directory_url, is_directory_id, parse_base_url, DirectoryId,
};
pub use filename::{decode_component, file_name_from_url, sanitize_file_name};
