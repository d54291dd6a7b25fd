//! Draft review domain: models, persistence trait, decision hand-off, and
//! the review-desk state machine.

pub mod desk;
pub mod ledger;
pub mod model;
pub mod repository;

pub use desk::{ReviewDesk, ReviewReply};
pub use ledger::DecisionLedger;
pub use model::{Decision, Draft, PLATFORM_CHAR_LIMIT};
pub use repository::PendingDraftRepository;
