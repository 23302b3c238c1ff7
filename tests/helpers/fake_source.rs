//! An `EntitySource` whose container list is set by the test.

use async_trait::async_trait;
use dockwatch::core::{Entity, EntitySource};
use dockwatch::errors::CollectError;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct FakeSource {
    entities: Arc<Mutex<Vec<Entity>>>,
    failing: Arc<AtomicBool>,
}

impl FakeSource {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities: Arc::new(Mutex::new(entities)),
            failing: Arc::default(),
        }
    }

    pub fn set_entities(&self, entities: Vec<Entity>) {
        *self.entities.lock().unwrap() = entities;
    }

    /// Makes every following listing fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl EntitySource for FakeSource {
    async fn list_active_entities(&self) -> Result<Vec<Entity>, CollectError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollectError::Enumeration(Box::new(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "docker daemon unreachable",
            ))));
        }
        Ok(self.entities.lock().unwrap().clone())
    }
}
