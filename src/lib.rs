pub mod compare;
pub mod config;
pub mod discover;
pub mod engine;
pub mod error;
pub mod fixture;
pub mod i18n;
pub mod numbering;
pub mod report;
pub mod session;
pub mod types;

// Re-export the localization macros
pub use crate::i18n::{t, t_with_args};
