use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::player::events::HostEvent;

const HOST_EVENT_CAPACITY: usize = 32;

/// Fan-out of visibility, viewport and unload notifications
#[derive(Debug, Clone)]
pub struct HostEventBus {
    tx: broadcast::Sender<HostEvent>,
}

impl HostEventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HOST_EVENT_CAPACITY);
        Self { tx }
    }

    /// Deliver an event to every live subscription
    pub fn publish(&self, event: HostEvent) {
        debug!("Host event {:?} to {} listener(s)", event, self.tx.receiver_count());
        let _ = self.tx.send(event);
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Run `handler` for every event published from now on. The listener
    /// lives exactly as long as the returned [`Subscription`].
    pub fn subscribe<F, Fut>(&self, name: &'static str, mut handler: F) -> Subscription
    where
        F: FnMut(HostEvent) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut rx = self.tx.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => handler(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("{} listener skipped {} host event(s)", name, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("{} listener finished", name);
        });

        Subscription {
            name,
            task: Some(task),
        }
    }
}

impl Default for HostEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a registered listener task; dropping it deregisters the listener
#[derive(Debug)]
pub struct Subscription {
    name: &'static str,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wrap an already spawned listener task
    pub fn from_task(name: &'static str, task: JoinHandle<()>) -> Self {
        Self {
            name,
            task: Some(task),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("{} listener removed", self.name);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
