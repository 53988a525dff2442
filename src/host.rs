//! Host accessory boundary.
//!
//! The host registers one getter per exposed characteristic (the aggregate
//! index plus each configured pollutant) and expects each getter to answer
//! exactly once. [`AccessoryBridge`] adapts the coordinator to that shape and
//! pushes a fault status alongside every answer, so the host can flag the
//! accessory instead of showing stale numbers as fresh.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::config::PollConfig;
use crate::model::{Pollutant, ReadKey, ReadValue};
use crate::poll::PollCoordinator;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CharacteristicError {
    /// The host asked for a pollutant this accessory does not expose.
    #[error("Characteristic not exposed by this accessory: {0}")]
    Unregistered(String),
}

/// Receives the fault status for a characteristic.
pub trait StatusFaultSink: Send + Sync {
    fn set_status_fault(&self, key: ReadKey, faulted: bool);
}

/// A characteristic the host should register a getter for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Characteristic {
    pub key: ReadKey,
    pub name: String,
}

pub struct AccessoryBridge {
    coordinator: Arc<PollCoordinator>,
    faults: Arc<dyn StatusFaultSink>,
    name: String,
    index_name: String,
    exposed: Vec<Pollutant>,
}

impl AccessoryBridge {
    pub fn new(
        coordinator: Arc<PollCoordinator>,
        config: &PollConfig,
        faults: Arc<dyn StatusFaultSink>,
    ) -> Self {
        AccessoryBridge {
            coordinator,
            faults,
            name: config.name.clone(),
            index_name: config.air_quality_index_name.clone(),
            exposed: config.pollutants.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Characteristics to register: the aggregate index first, then the
    /// configured pollutants in configuration order.
    pub fn characteristics(&self) -> Vec<Characteristic> {
        let mut list = vec![Characteristic {
            key: ReadKey::AirQuality,
            name: self.index_name.clone(),
        }];
        list.extend(self.exposed.iter().map(|p| Characteristic {
            key: ReadKey::Pollutant(*p),
            name: format!("{} {}", self.name, p),
        }));
        list
    }

    pub fn exposes(&self, key: ReadKey) -> bool {
        match key {
            ReadKey::AirQuality => true,
            ReadKey::Pollutant(p) => self.exposed.contains(&p),
        }
    }

    /// Getter entry point. `callback` is invoked exactly once.
    ///
    /// The fault status is set before the callback runs: faulted when the
    /// last refresh failed, or when the requested pollutant has no value.
    pub async fn get<F>(&self, key: ReadKey, callback: F)
    where
        F: FnOnce(Result<ReadValue, CharacteristicError>),
    {
        if !self.exposes(key) {
            callback(Err(CharacteristicError::Unregistered(key.to_string())));
            return;
        }

        let reading = self.coordinator.read(key).await;
        let missing = matches!(reading.value, ReadValue::Concentration(None));
        let faulted = reading.fault || missing;

        debug!(accessory = %self.name, %key, value = ?reading.value, faulted, "characteristic read");
        self.faults.set_status_fault(key, faulted);
        callback(Ok(reading.value));
    }
}
