// Communication channels lock-free
// Engines (producers) never block on a full channel: the notification is dropped

use crate::messaging::notification::Notification;
use ringbuf::traits::{Producer, Split};
use ringbuf::HeapRb;

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}

/// Push a notification if a producer is attached.
/// Returns false when the channel is full or absent.
pub fn notify(producer: &mut Option<NotificationProducer>, notification: Notification) -> bool {
    match producer {
        Some(tx) => {
            if tx.try_push(notification).is_err() {
                log::debug!("Notification channel full, dropping notification");
                false
            } else {
                true
            }
        }
        None => false,
    }
}
