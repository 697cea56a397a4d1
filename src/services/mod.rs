//! Services module
//!
//! Business logic services that coordinate between the presentation
//! layer and the repository.

pub mod entries;
pub mod fonts;
pub mod settings;
pub mod transfer;

pub use entries::EntryService;
pub use fonts::FontService;
pub use settings::SettingsService;
pub use transfer::{ExportBundle, TransferService};
