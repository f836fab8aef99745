// Unless explicitly stated otherwise all files in this repository are licensed under the Apache License, Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025 Datadog, Inc.

//! The one-way bus an isolated context posts its verdict on.
//!
//! Like a browser's `postMessage`, the bus carries no origin: every context holds a clone of the
//! same [`MessagePort`], and anything at all may show up in the [`MessageInbox`].

use serde_json::Value;
use std::sync::mpsc;
use std::time::Instant;

/// Creates a connected port and inbox.
pub fn message_channel() -> (MessagePort, MessageInbox) {
    let (sender, receiver) = mpsc::channel();
    (MessagePort { sender }, MessageInbox { receiver })
}

#[derive(Debug, Clone)]
pub struct MessagePort {
    sender: mpsc::Sender<Value>,
}

impl MessagePort {
    /// Posts `message`. Returns false if the inbox no longer exists.
    pub fn post(&self, message: Value) -> bool {
        self.sender.send(message).is_ok()
    }
}

#[derive(Debug)]
pub struct MessageInbox {
    receiver: mpsc::Receiver<Value>,
}

impl MessageInbox {
    /// Returns the next queued message without blocking.
    pub fn try_recv(&self) -> Option<Value> {
        self.receiver.try_recv().ok()
    }

    /// Blocks until a message arrives or `deadline` passes.
    pub fn recv_until(&self, deadline: Instant) -> Option<Value> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return self.try_recv();
        }
        self.receiver.recv_timeout(remaining).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn messages_arrive_in_post_order() {
        let (port, inbox) = message_channel();
        let other = port.clone();
        assert!(port.post(json!(1)));
        assert!(other.post(json!({"type": "result"})));
        assert_eq!(inbox.try_recv(), Some(json!(1)));
        assert_eq!(inbox.try_recv(), Some(json!({"type": "result"})));
        assert_eq!(inbox.try_recv(), None);
    }

    #[test]
    fn recv_until_gives_up_at_deadline() {
        let (_port, inbox) = message_channel();
        let start = Instant::now();
        assert!(inbox
            .recv_until(start + Duration::from_millis(30))
            .is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert!(inbox.recv_until(start).is_none());
    }

    #[test]
    fn post_without_inbox() {
        let (port, inbox) = message_channel();
        drop(inbox);
        assert!(!port.post(json!(null)));
    }
}
