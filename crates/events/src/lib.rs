//! Integration events and the broker-facing publishing contract.

pub mod in_memory_publisher;
pub mod notification;
pub mod publisher;

pub use in_memory_publisher::{InMemoryPublisher, RecordingNotifier};
pub use notification::TransferNotification;
pub use publisher::{DisabledNotifier, NotificationPublisher, PublishError, TransferNotifier};
