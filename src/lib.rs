//! inkdiary
//!
//! Core engine for a personal diary application: an entry store with
//! search and sorting, a settings resolver with versioned schema
//! migrations and deep-merged defaults, and smart font ingestion that
//! turns a pasted stylesheet link into a usable font-family. The
//! presentation layer (rendering, modals, animations) lives elsewhere
//! and talks to this crate through `app::DiaryApp`.

pub mod app;
pub mod config;
pub mod error;
pub mod merge;
pub mod services;
pub mod storage;

pub use app::DiaryApp;
pub use error::{AppError, Result};
