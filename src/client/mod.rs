pub mod host;
pub mod resume;
pub mod session;
pub mod sync;

pub use host::{HostEventBus, Subscription};
pub use resume::{can_resume, is_completed, ResumeDecision, ResumePolicy};
pub use session::{PlayerSession, SessionContext};
pub use sync::{ProgressSyncEngine, SaveOutcome, SyncSession, SyncSnapshot};
