//! Channel type definitions for agent communication
//!
//! Every agent owns two unbounded FIFO channels:
//! - **Inbox**: messages waiting to be dispatched to handlers
//! - **Outbox**: messages the agent emits for external delivery

use tokio::sync::mpsc;

use crate::core::Message;

// ============================================================================
// Channel Type Aliases
// ============================================================================

/// Sender half of the inbox (used by external input and behaviors)
pub type InboxSender = mpsc::UnboundedSender<Message>;

/// Receiver half of the inbox (owned by the dispatch loop)
pub type InboxReceiver = mpsc::UnboundedReceiver<Message>;

/// Sender half of the outbox (used by handlers and behaviors)
pub type OutboxSender = mpsc::UnboundedSender<Message>;

/// Receiver half of the outbox (taken by whoever delivers agent output)
pub type OutboxReceiver = mpsc::UnboundedReceiver<Message>;

// ============================================================================
// Channel Creation
// ============================================================================

/// Create both inbox and outbox channels
pub fn create_agent_channels() -> (InboxSender, InboxReceiver, OutboxSender, OutboxReceiver) {
    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    (inbox_tx, inbox_rx, outbox_tx, outbox_rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inbox_preserves_order() {
        let (inbox_tx, mut inbox_rx, _outbox_tx, _outbox_rx) = create_agent_channels();

        inbox_tx.send(Message::text("one")).unwrap();
        inbox_tx.send(Message::text("two")).unwrap();
        inbox_tx.send(Message::text("three")).unwrap();

        for expected in ["one", "two", "three"] {
            let msg = inbox_rx.recv().await.unwrap();
            assert_eq!(msg.as_text(), Some(expected));
        }
    }

    #[tokio::test]
    async fn test_outbox_close() {
        let (_inbox_tx, _inbox_rx, outbox_tx, mut outbox_rx) = create_agent_channels();

        drop(outbox_tx);

        assert!(outbox_rx.recv().await.is_none());
    }
}
