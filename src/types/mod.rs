pub mod auth;
pub mod drive;
pub mod sheets;

pub use auth::{GoogleProfile, UserOAuthToken};
pub use drive::{FileEntry, FileTypeFilter, SearchRequest, Thumbnail};
pub use sheets::{AppendUpdates, SheetInfo, SpreadsheetMetadata, SpreadsheetRange};
