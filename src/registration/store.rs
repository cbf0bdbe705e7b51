//! Registration Store
//!
//! Verified LFL numbers plus the active selection, mirrored into a blob
//! store under two keys.

use std::sync::Arc;

use chrono::Utc;

use super::types::{Registration, VerificationError, ACTIVE_KEY, REGISTRATIONS_KEY};
use crate::storage::{BlobStore, StoreError};

/// Registration table with one optional active entry
///
/// Invariants: numbers are unique, and `active` is `None` or names an
/// existing registration.
pub struct RegistrationStore {
    blob: Arc<dyn BlobStore>,
    registrations: Vec<Registration>,
    active: Option<String>,
}

impl RegistrationStore {
    /// Load state from the blob store
    ///
    /// Unparseable or non-array data resets to an empty table. An active
    /// number that no longer exists is cleared.
    pub fn load(blob: Arc<dyn BlobStore>) -> Self {
        let registrations = match blob.get(REGISTRATIONS_KEY) {
            Some(raw) => parse_registrations(&raw),
            None => Vec::new(),
        };

        let stored_active = blob
            .get(ACTIVE_KEY)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let active = match stored_active {
            Some(number) if registrations.iter().any(|r| r.number == number) => Some(number),
            Some(number) => {
                tracing::info!(lfl_number = %number, "Stored active LFL number is not registered, clearing");
                None
            }
            None => None,
        };

        tracing::debug!(
            registrations = registrations.len(),
            active = ?active,
            "Loaded registration store"
        );

        Self {
            blob,
            registrations,
            active,
        }
    }

    /// Write the full table and the active selection back
    pub fn save(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.registrations)?;
        self.blob.set(REGISTRATIONS_KEY, &json)?;

        match &self.active {
            Some(number) => self.blob.set(ACTIVE_KEY, number),
            None => self.blob.remove(ACTIVE_KEY),
        }
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn get(&self, number: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.number == number)
    }

    pub fn contains(&self, number: &str) -> bool {
        self.get(number).is_some()
    }

    /// Add a registration unless the number already exists
    ///
    /// Returns `true` when a new entry was added. An existing entry keeps
    /// its original email and verification time.
    pub fn upsert(&mut self, number: &str, email: &str) -> bool {
        if self.contains(number) {
            return false;
        }

        self.registrations.push(Registration {
            number: number.to_string(),
            email: email.to_string(),
            verified_at: Utc::now(),
        });
        true
    }

    /// Change the active selection; `None` clears it
    pub fn set_active(&mut self, number: Option<&str>) -> Result<(), VerificationError> {
        match number {
            Some(number) if !self.contains(number) => {
                Err(VerificationError::UnknownNumber(number.to_string()))
            }
            Some(number) => {
                self.active = Some(number.to_string());
                Ok(())
            }
            None => {
                self.active = None;
                Ok(())
            }
        }
    }
}

/// Decode the stored array, dropping duplicate numbers after the first
fn parse_registrations(raw: &str) -> Vec<Registration> {
    let parsed: Vec<Registration> = match serde_json::from_str(raw) {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!("Stored registrations are unreadable, resetting: {}", e);
            return Vec::new();
        }
    };

    let mut unique: Vec<Registration> = Vec::with_capacity(parsed.len());
    for registration in parsed {
        if !unique.iter().any(|r| r.number == registration.number) {
            unique.push(registration);
        }
    }
    unique
}
