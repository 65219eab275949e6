pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod maintenance;
pub mod sanitize;
pub mod search;
pub mod selection;
pub mod storage;

pub use config::{load_config, Config};
pub use db::{Database, DatabaseError, UserId};
pub use error::{ConfigError, DeedIndexError, Result, StorageError, WorkerError};
pub use ingest::{BatchReport, Ingestor, JobProgress, RowExtractor, SpreadsheetExtractor, Submission};
pub use search::{search, SearchFilters, SearchResults};
pub use selection::{AddOutcome, SelectionGroup};
pub use storage::UploadStorage;
