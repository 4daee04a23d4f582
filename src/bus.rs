use std::collections::BTreeMap;

bitflags::bitflags! {
    /// Broadcast triggers a control can listen to
    #[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
    pub struct Topics: u8 {
        /// Re-read the value from the device
        const REFRESH = 0b01;
        /// Restore the driver default
        const RESET   = 0b10;
    }
}

/// Identity of a live entry in a session
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(pub(crate) u64);

/// Token returned by [`Bus::subscribe`], needed to unsubscribe
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Debug)]
struct Subscription {
    key: Key,
    topics: Topics,
}

/// Registry of which live entries want which broadcasts
///
/// Subscribers are reported in subscription order, which is the order the
/// controls were enumerated in.
#[derive(Debug, Default)]
pub struct Bus {
    next_id: u64,
    subscriptions: BTreeMap<u64, Subscription>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` for the given topics.
    pub fn subscribe(&mut self, key: Key, topics: Topics) -> SubscriptionId {
        let id = self.next_id;
        self.subscriptions.insert(id, Subscription { key, topics });
        self.next_id += 1;
        SubscriptionId(id)
    }

    /// Unregisters a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id.0).is_some()
    }

    /// Keys subscribed to `topic`, in subscription order
    pub fn subscribers(&self, topic: Topics) -> Vec<Key> {
        self.subscriptions
            .values()
            .filter(|sub| sub.topics.contains(topic))
            .map(|sub| sub.key)
            .collect()
    }

    pub fn is_subscribed(&self, key: Key, topic: Topics) -> bool {
        self.subscriptions
            .values()
            .any(|sub| sub.key == key && sub.topics.contains(topic))
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
