pub mod change_listener;
pub mod flag_repository;
pub mod notification_dispatcher;
pub mod snapshot_codec;

pub use change_listener::{
    ChangeListener, FlagChangeHandler, IdempotentHandler, ListenerSettings, ListenerStats,
    RecordingHandler,
};
pub use flag_repository::{FlagRepository, RepositorySettings};
pub use notification_dispatcher::{
    DispatchStats, DispatchWorker, NotificationDispatcher, RetryPolicy,
};
pub use snapshot_codec::{decode_snapshot, encode_snapshot, SNAPSHOT_FORMAT};
