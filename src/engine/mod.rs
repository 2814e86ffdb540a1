use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use anyhow::{anyhow, Result};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::{
    broadcast::Broadcaster,
    registry::{ObjectRegistry, TickReport},
};

/// The registry behind the lock every caller goes through.
pub type SharedRegistry<B> = Arc<Mutex<ObjectRegistry<B>>>;

pub struct EngineSettings {
    pub world_name: String,
    pub tick_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            world_name: "world".to_string(),
            tick_interval: Duration::from_millis(600),
        }
    }
}

pub struct Engine<B> {
    registry: SharedRegistry<B>,
    settings: EngineSettings,
}

impl<B: Broadcaster> Engine<B> {
    pub fn new(registry: ObjectRegistry<B>, settings: EngineSettings) -> Self {
        Self {
            registry: Arc::new(Mutex::new(registry)),
            settings,
        }
    }

    pub fn registry(&self) -> SharedRegistry<B> {
        Arc::clone(&self.registry)
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, ObjectRegistry<B>>> {
        self.registry
            .lock()
            .map_err(|_| anyhow!("object registry lock poisoned"))
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn step(&self) -> Result<TickReport> {
        let report = self.lock()?.tick();
        Ok(report)
    }

    pub fn run(&self, ticks: u64) -> Result<()> {
        self.run_with_hook(ticks, |_| {})
    }

    pub fn run_with_hook<F>(&self, ticks: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(&TickReport),
    {
        for _ in 0..ticks {
            let report = self.step()?;
            hook(&report);
        }
        Ok(())
    }

    /// Ticks on the configured interval until `limit` ticks have run or
    /// `shutdown` resolves. Returns the number of ticks executed.
    pub async fn run_until<F>(&self, limit: Option<u64>, shutdown: F) -> Result<u64>
    where
        F: Future<Output = ()>,
    {
        let mut timer = interval(self.settings.tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut executed = 0_u64;
        info!(
            world = %self.settings.world_name,
            interval_ms = self.settings.tick_interval.as_millis() as u64,
            "object ticker started"
        );
        loop {
            if limit.is_some_and(|limit| executed >= limit) {
                break;
            }
            tokio::select! {
                _ = &mut shutdown => {
                    info!(ticks = executed, "shutdown requested");
                    break;
                }
                _ = timer.tick() => {
                    let report = self.step()?;
                    executed += 1;
                    debug!(tick = report.tick, live = report.live, "tick complete");
                }
            }
        }
        Ok(executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::RecordingBroadcaster;
    use crate::object::{Position, WorldObject};

    #[test]
    fn run_with_hook_reports_each_tick() {
        let mut registry = ObjectRegistry::new(RecordingBroadcaster::new());
        registry.insert(WorldObject::temporary(1, Position::new(0, 0, 0), 0, 10, 3, 2));
        let engine = Engine::new(registry, EngineSettings::default());

        let mut ticks = Vec::new();
        engine
            .run_with_hook(4, |report| ticks.push((report.tick, report.restored)))
            .unwrap();

        assert_eq!(ticks, vec![(1, 0), (2, 0), (3, 1), (4, 0)]);
        assert!(engine.lock().unwrap().exists(2, Position::new(0, 0, 0)));
    }
}
