//! `ExecutionChannel` — the transport boundary between a run and whatever
//! is watching it.
//!
//! Defined here (not in `streaming`) because `ExecutionContext` sends
//! events through one directly; `streaming::ws` supplies the concrete
//! websocket-backed implementation, `engine`'s scheduler uses the same
//! trait object.

use async_trait::async_trait;

use crate::protocol::InboundControl;
use crate::protocol::OutboundEvent;

/// Best-effort, ordered, drop-on-closed message transport for one
/// execution. Implementations must never block the caller indefinitely —
/// a full or closed channel is simply a dropped send.
#[async_trait]
pub trait ExecutionChannel: Send + Sync {
    /// Send an event. Errors are swallowed by the implementation; callers
    /// never need to branch on delivery.
    async fn send(&self, event: OutboundEvent);

    /// Non-blocking poll for the next inbound control message, if any has
    /// arrived since the last call.
    async fn try_recv_control(&self) -> Option<InboundControl>;
}

/// A channel with nothing on the other end. Used where an execution runs
/// without a live client (e.g. `cli validate`, tests) — every send is a
/// no-op, every poll returns `None`.
pub struct NullChannel;

#[async_trait]
impl ExecutionChannel for NullChannel {
    async fn send(&self, _event: OutboundEvent) {}

    async fn try_recv_control(&self) -> Option<InboundControl> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_channel_swallows_everything() {
        let chan = NullChannel;
        chan.send(OutboundEvent::Connected { execution_id: "e1".into() }).await;
        assert!(chan.try_recv_control().await.is_none());
    }
}
