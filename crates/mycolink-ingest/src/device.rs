use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DeviceError;

/// A resolved device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub id: Uuid,
    pub serial: String,
}

/// Who a frame claims to come from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceClaim {
    pub serial: String,
    pub credential: Option<String>,
}

impl DeviceClaim {
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            credential: None,
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }
}

/// Resolves device serial numbers to identities.
pub trait DeviceDirectory: Send + Sync {
    /// Resolve `claim`, checking its credential when the device has one.
    fn resolve(&self, claim: &DeviceClaim) -> Result<DeviceIdentity, DeviceError>;
}

impl<T: DeviceDirectory + ?Sized> DeviceDirectory for Arc<T> {
    fn resolve(&self, claim: &DeviceClaim) -> Result<DeviceIdentity, DeviceError> {
        (**self).resolve(claim)
    }
}

#[derive(Debug, Clone)]
struct DeviceRecord {
    identity: DeviceIdentity,
    secret: Option<String>,
}

/// Directory backed by a map, keyed by serial number.
#[derive(Debug, Default)]
pub struct InMemoryDeviceDirectory {
    devices: RwLock<HashMap<String, DeviceRecord>>,
}

impl InMemoryDeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a serial under a fresh id. Re-registering a serial keeps
    /// its id and replaces its secret.
    pub fn register(&self, serial: impl Into<String>, secret: Option<String>) -> DeviceIdentity {
        let serial = serial.into();
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        let record = devices
            .entry(serial.clone())
            .and_modify(|record| record.secret = secret.clone())
            .or_insert_with(|| DeviceRecord {
                identity: DeviceIdentity {
                    id: Uuid::new_v4(),
                    serial,
                },
                secret,
            });
        record.identity.clone()
    }

    /// Insert a known identity, replacing any entry for its serial.
    pub fn insert(&self, identity: DeviceIdentity, secret: Option<String>) {
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity.serial.clone(), DeviceRecord { identity, secret });
    }

    pub fn len(&self) -> usize {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DeviceDirectory for InMemoryDeviceDirectory {
    fn resolve(&self, claim: &DeviceClaim) -> Result<DeviceIdentity, DeviceError> {
        let devices = self.devices.read().unwrap_or_else(PoisonError::into_inner);
        let record = devices
            .get(&claim.serial)
            .ok_or_else(|| DeviceError::UnknownDevice {
                serial: claim.serial.clone(),
            })?;

        if let Some(secret) = &record.secret {
            let presented = claim.credential.as_deref().unwrap_or_default();
            if !constant_time_eq(secret.as_bytes(), presented.as_bytes()) {
                return Err(DeviceError::CredentialMismatch {
                    serial: claim.serial.clone(),
                });
            }
        }

        Ok(record.identity.clone())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_device() {
        let directory = InMemoryDeviceDirectory::new();
        let identity = directory.register("MCB-001", None);

        assert_eq!(directory.resolve(&DeviceClaim::new("MCB-001")), Ok(identity));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn unknown_serial_is_rejected() {
        let directory = InMemoryDeviceDirectory::new();
        assert_eq!(
            directory.resolve(&DeviceClaim::new("ghost")),
            Err(DeviceError::UnknownDevice {
                serial: "ghost".to_owned()
            })
        );
    }

    #[test]
    fn secret_must_match() {
        let directory = InMemoryDeviceDirectory::new();
        directory.register("MCB-002", Some("s3cret".to_owned()));

        assert!(directory
            .resolve(&DeviceClaim::new("MCB-002").with_credential("s3cret"))
            .is_ok());
        assert!(matches!(
            directory.resolve(&DeviceClaim::new("MCB-002").with_credential("guess")),
            Err(DeviceError::CredentialMismatch { .. })
        ));
        assert!(matches!(
            directory.resolve(&DeviceClaim::new("MCB-002")),
            Err(DeviceError::CredentialMismatch { .. })
        ));
    }

    #[test]
    fn reregister_keeps_id() {
        let directory = InMemoryDeviceDirectory::new();
        let first = directory.register("MCB-003", None);
        let second = directory.register("MCB-003", Some("k".to_owned()));
        assert_eq!(first.id, second.id);
        assert!(directory.resolve(&DeviceClaim::new("MCB-003")).is_err());
    }
}
