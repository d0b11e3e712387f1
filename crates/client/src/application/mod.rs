pub mod adapter;
pub mod backoff;
pub mod config;
pub mod manager;
pub mod reconciler;
pub mod registry;

pub use adapter::ProtocolAdapter;
pub use backoff::ReconnectPolicy;
pub use config::{ClientConfig, HistoryCapacities};
pub use manager::{Command, ConnectionManager, ManagerHandles};
pub use reconciler::{FeedState, FeedView, StateReconciler};
pub use registry::SubscriptionRegistry;
