//! Curation pipeline for SRA/BioProject run metadata.
//!
//! A project's run report is fetched, its columns normalized, an environment
//! category suggested from the organism name, category fields injected, and
//! a filtered, editable view exported as CSV. [`Session`] drives the whole
//! pipeline from [`AppEvent`]s.

pub mod catalog;
pub mod classify;
pub mod config;
pub mod edit;
pub mod error_display;
pub mod export;
pub mod fetch;
pub mod filter;
pub mod inject;
pub mod logging;
pub mod normalize;
pub mod session;
mod source;
pub mod table;

pub use catalog::{CatalogError, CategoryMapping, CategoryMappingEntry, FieldCatalog};
pub use classify::{classify, ClassifierRules};
pub use config::{AppConfig, ConfigManager};
pub use edit::{reconcile_edit, EditError, EditEvent};
pub use export::{export_view, ExportOptions};
#[cfg(feature = "http")]
pub use fetch::EnaFetcher;
pub use fetch::{FetchError, FileFetcher, MetadataFetcher, StaticFetcher};
pub use filter::{derive_display_view, DisplayView, FilterRules, FilterSpec};
pub use inject::inject_fields;
pub use normalize::{normalize, NormalizeReport, NormalizeRules};
pub use session::{AppEvent, Notification, NotificationLevel, Session, SessionSettings};
pub use source::{read_delimited, read_delimited_file};
pub use table::{CellValue, MetadataTable, RawTable, RowId};

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "sracurate";

/// Re-export CLI definitions shared with the build script
pub use sracurate_cli::{Args, CompressionFormat};
