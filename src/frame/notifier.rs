// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Change-notification subscriber registry
//!
//! Frame providers hold one of these instead of delegate objects: anchors
//! register by id and the host fans the change event out to each
//! registered anchor after mutating the provider.

use crate::anchor::AnchorId;

/// Id-keyed subscriber set for a single frame provider.
#[derive(Debug, Clone, Default)]
pub struct ChangeNotifier {
    subscribers: Vec<AnchorId>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an anchor. Registering twice is a no-op, matching the
    /// add-unique semantics the anchor state machine relies on.
    pub fn subscribe(&mut self, anchor: AnchorId) {
        if !self.subscribers.contains(&anchor) {
            self.subscribers.push(anchor);
        }
    }

    /// Remove an anchor. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, anchor: AnchorId) {
        self.subscribers.retain(|a| *a != anchor);
    }

    pub fn is_subscribed(&self, anchor: AnchorId) -> bool {
        self.subscribers.contains(&anchor)
    }

    /// Snapshot of the current subscribers, in registration order.
    pub fn subscribers(&self) -> Vec<AnchorId> {
        self.subscribers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_is_unique() {
        let mut n = ChangeNotifier::new();
        n.subscribe(AnchorId(1));
        n.subscribe(AnchorId(1));
        n.subscribe(AnchorId(2));
        assert_eq!(n.subscribers(), vec![AnchorId(1), AnchorId(2)]);
    }

    #[test]
    fn test_unsubscribe() {
        let mut n = ChangeNotifier::new();
        n.subscribe(AnchorId(1));
        n.subscribe(AnchorId(2));
        n.unsubscribe(AnchorId(1));
        assert!(!n.is_subscribed(AnchorId(1)));
        assert!(n.is_subscribed(AnchorId(2)));
        n.unsubscribe(AnchorId(7));
        assert_eq!(n.subscribers(), vec![AnchorId(2)]);
    }
}
