pub mod config;
pub mod ids;
pub mod receipt;
pub mod session;
pub mod split;

pub mod error;
