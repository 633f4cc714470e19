// Service exports
pub mod appwrite;
pub mod cache;
pub mod local;
pub mod notify;
pub mod postgres;
pub mod store;
pub mod watcher;

pub use appwrite::{AppwriteClient, AppwriteCollections, AppwriteError};
pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use local::{LocalJsonStore, LocalStoreError};
pub use notify::{DispatchReport, LogSink, NotificationPayload, NotificationSink, NotifyError, WebhookSink};
pub use postgres::{PostgresClient, PostgresError};
pub use store::{DocumentSource, MemoryNotifiedStore, NotifiedStore, PoolLoader, StoreError};
pub use watcher::{
    profile_key, resolve_scope, run_auto_hunt_cycle, watcher_config_for, AutoHuntOutcome, WatcherContext,
};
