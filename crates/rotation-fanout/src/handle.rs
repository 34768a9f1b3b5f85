//! Subscriber handles.

use std::sync::Weak;

use rotation_types::SubscriberId;

use crate::channel::Inner;

/// A registration with a [`FanoutChannel`](crate::FanoutChannel).
///
/// Owns nothing but its ID and a weak reference to the channel.
/// Unsubscribing is idempotent, and dropping the handle unsubscribes.
pub struct SubscriberHandle<T> {
    id: SubscriberId,
    channel: Weak<Inner<T>>,
    released: bool,
}

impl<T> SubscriberHandle<T> {
    pub(crate) const fn new(id: SubscriberId, channel: Weak<Inner<T>>) -> Self {
        Self {
            id,
            channel,
            released: false,
        }
    }

    /// Subscriber identifier.
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Stop delivery to this subscriber.
    ///
    /// Takes effect immediately, even for a delivery turn already in
    /// progress for other subscribers. Returns `true` if this call
    /// removed the subscriber; later calls return `false`.
    pub fn unsubscribe(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.channel
            .upgrade()
            .is_some_and(|channel| channel.remove(self.id))
    }

    /// Whether [`unsubscribe`](Self::unsubscribe) has been called.
    pub const fn is_released(&self) -> bool {
        self.released
    }
}

impl<T> Drop for SubscriberHandle<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl<T> core::fmt::Debug for SubscriberHandle<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
