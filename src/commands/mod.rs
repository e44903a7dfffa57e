pub mod classify;
pub mod edit;
pub mod export;
pub mod filter;
pub mod list_files;
pub mod status;
