//! `WsChannel` — the concrete `nodes::ExecutionChannel` backing a single
//! execution's websocket stream.
//!
//! Outbound events are pushed onto an unbounded `mpsc` and drained by
//! whichever socket eventually attaches via [`WsChannel::take_outbound`];
//! until then they simply queue up, so an execution can start before a
//! client has connected to watch it. Inbound control messages go the
//! other way: the socket's reader task pushes them in, the executor polls
//! them out via `try_recv_control`.

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use nodes::protocol::{InboundControl, OutboundEvent};
use nodes::ExecutionChannel;

pub struct WsChannel {
    outbound_tx: mpsc::UnboundedSender<OutboundEvent>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<OutboundEvent>>>,
    inbound_tx: mpsc::UnboundedSender<InboundControl>,
    inbound_rx: Mutex<mpsc::UnboundedReceiver<InboundControl>>,
}

impl WsChannel {
    pub fn new() -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
        }
    }

    /// Takes the outbound receiver, for the websocket handler to drain
    /// into the real socket. Returns `None` if already taken — at most
    /// one socket may be bridged to a given execution at a time.
    pub async fn take_outbound(&self) -> Option<mpsc::UnboundedReceiver<OutboundEvent>> {
        self.outbound_rx.lock().await.take()
    }

    /// Called by the socket's reader task when a control message arrives.
    pub fn push_inbound(&self, message: InboundControl) {
        let _ = self.inbound_tx.send(message);
    }
}

impl Default for WsChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionChannel for WsChannel {
    async fn send(&self, event: OutboundEvent) {
        let _ = self.outbound_tx.send(event);
    }

    async fn try_recv_control(&self) -> Option<InboundControl> {
        self.inbound_rx.lock().await.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_is_never_blocked_by_an_undrained_outbound_queue() {
        let chan = WsChannel::new();
        for _ in 0..1000 {
            chan.send(OutboundEvent::Connected { execution_id: "e1".into() }).await;
        }
    }

    #[tokio::test]
    async fn a_second_take_outbound_returns_none() {
        let chan = WsChannel::new();
        assert!(chan.take_outbound().await.is_some());
        assert!(chan.take_outbound().await.is_none());
    }

    #[tokio::test]
    async fn pushed_inbound_is_observed_by_try_recv_control() {
        let chan = WsChannel::new();
        assert!(chan.try_recv_control().await.is_none());
        chan.push_inbound(InboundControl::StopExecution);
        assert!(matches!(chan.try_recv_control().await, Some(InboundControl::StopExecution)));
    }
}
