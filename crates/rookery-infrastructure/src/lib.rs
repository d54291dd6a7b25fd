pub mod config_storage;
pub mod json_draft_repository;
pub mod json_history_repository;
pub mod paths;
pub mod storage;

pub use crate::config_storage::ConfigStorage;
pub use crate::json_draft_repository::JsonDraftRepository;
pub use crate::json_history_repository::JsonHistoryRepository;
pub use crate::paths::RookeryPaths;
pub use crate::storage::SecretStorage;
