use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use crate::{
    core::Config,
    events::Bus,
    policies::Trap,
    subscribers::{Subscribe, SubscriberSet},
};

use super::platform::Platform;

/// Builder for a [`Platform`] with optional subscribers and root trap.
pub struct PlatformBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    root_trap: Option<Trap>,
}

impl PlatformBuilder {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            root_trap: None,
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive every bus event through dedicated workers with
    /// bounded queues. Building with subscribers requires a Tokio runtime.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Trap consulted when an escalation reaches root.
    ///
    /// Without one (or when it answers `Raise`) the escalation is fatal.
    pub fn with_trap(mut self, trap: Trap) -> Self {
        self.root_trap = Some(trap);
        self
    }

    /// Builds the platform; spawns the bus listener when subscribers are set.
    pub fn build(self) -> Platform {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        if !self.subscribers.is_empty() {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            let mut rx = bus.subscribe();
            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "subscriber listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                set.shutdown().await;
            });
        }

        Platform::new_internal(self.cfg, bus, self.root_trap)
    }
}
