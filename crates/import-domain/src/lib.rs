mod errors;
mod ledger_repository;
mod lock;
mod records;
mod status;
mod task;

pub use errors::DomainError;
pub use ledger_repository::{InMemoryLedger, InMemoryLockStore, ResourceLockStore, TaskLedgerStore};
pub use lock::{AcquireOutcome, ResourceFlowLock, ResourceKey};
pub use records::{CreateLayer7ListenerDetail, Layer7ListenerBindRsDetail};
pub use status::{ImportStatus, RecordState};
pub use task::{Job, JobState, LockTaskType, NewJob, NewTaskItem, ResType, TaskItem, TaskItemState, TaskItemUpdate,
               TaskOperation, TaskSource};
