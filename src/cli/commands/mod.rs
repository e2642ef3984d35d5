//! CLI command implementations

pub mod alias;
pub mod completions;
pub mod hierarchy;
pub mod identity;
pub mod import;
pub mod init;
pub mod link;
pub mod missing;
pub mod product;
