// Messaging - Notifications and published snapshots
// Engines push warnings through the notification ringbuf and publish
// read-only state snapshots for the UI.

pub mod channels;
pub mod notification;
pub mod snapshot;

pub use channels::{NotificationConsumer, NotificationProducer, create_notification_channel};
pub use notification::{Notification, NotificationCategory, NotificationLevel};
pub use snapshot::{SnapshotPublisher, SnapshotReader};
