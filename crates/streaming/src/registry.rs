//! `ConnectionRegistry` — tracks the live [`WsChannel`] for every
//! in-flight execution, so a websocket connecting after the fact can find
//! the channel an already-started execution is writing to, and so an
//! admin broadcast can fan out across everything currently running.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use nodes::protocol::OutboundEvent;
use nodes::ExecutionChannel;

use crate::channel::WsChannel;

#[derive(Default)]
pub struct ConnectionRegistry {
    channels: Mutex<HashMap<Uuid, Arc<WsChannel>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and registers a fresh channel for `execution_id`. Callers
    /// pass the returned `Arc` into `ExecuteParams` as the execution's
    /// `ExecutionChannel`.
    pub fn create(&self, execution_id: Uuid) -> Arc<WsChannel> {
        let channel = Arc::new(WsChannel::new());
        self.channels.lock().unwrap().insert(execution_id, channel.clone());
        channel
    }

    pub fn get(&self, execution_id: Uuid) -> Option<Arc<WsChannel>> {
        self.channels.lock().unwrap().get(&execution_id).cloned()
    }

    pub fn remove(&self, execution_id: Uuid) {
        self.channels.lock().unwrap().remove(&execution_id);
    }

    /// Fans an event out to every currently-registered execution.
    pub async fn broadcast(&self, event: OutboundEvent) {
        let channels: Vec<Arc<WsChannel>> = self.channels.lock().unwrap().values().cloned().collect();
        for channel in channels {
            channel.send(event.clone()).await;
        }
    }
}
