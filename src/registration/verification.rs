//! Email code verification
//!
//! Two-step challenge gating entry into the registration store:
//!
//! ```text
//! NoPending --request_code--> PendingSent --verify_code(ok)--> NoPending (+ registration)
//!                                  |
//!                                  +--request_code--> PendingSent (code replaced)
//! ```
//!
//! No email is sent. The code is handed back to the caller so it can be
//! shown on screen.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;

use super::store::RegistrationStore;
use super::types::{PendingVerification, Registration, VerificationError, CODE_MAX, CODE_MIN};
use crate::storage::BlobStore;

/// Registration state plus the outstanding challenge
pub struct RegistrationService {
    store: RegistrationStore,
    pending: Option<PendingVerification>,
    /// Codes older than this are rejected; `None` keeps them valid forever
    code_ttl: Option<Duration>,
}

impl RegistrationService {
    /// Load registrations from `blob`
    pub fn load(blob: Arc<dyn BlobStore>, code_ttl: Option<Duration>) -> Self {
        Self {
            store: RegistrationStore::load(blob),
            pending: None,
            code_ttl,
        }
    }

    pub fn registrations(&self) -> &[Registration] {
        self.store.registrations()
    }

    pub fn active(&self) -> Option<&str> {
        self.store.active()
    }

    pub fn pending(&self) -> Option<&PendingVerification> {
        self.pending.as_ref()
    }

    /// Start a challenge for `number` / `email`
    ///
    /// Replaces any earlier pending challenge.
    pub fn request_code(
        &mut self,
        number: &str,
        email: &str,
    ) -> Result<PendingVerification, VerificationError> {
        let number = number.trim();
        let email = email.trim();
        if number.is_empty() || email.is_empty() {
            return Err(VerificationError::MissingFields);
        }

        if let Some(previous) = &self.pending {
            tracing::debug!(lfl_number = %previous.number, "Replacing pending verification");
        }

        let pending = PendingVerification {
            number: number.to_string(),
            email: email.to_string(),
            code: generate_code(),
            requested_at: Utc::now(),
        };

        tracing::info!(
            lfl_number = %pending.number,
            email = %pending.email,
            code = %pending.code,
            "Verification code issued (not emailed)"
        );

        self.pending = Some(pending.clone());
        Ok(pending)
    }

    /// Check `input` against the pending code
    ///
    /// On success the number is registered (if new), made active and
    /// persisted, and the challenge is consumed.
    pub fn verify_code(&mut self, input: &str) -> Result<Registration, VerificationError> {
        let pending = self
            .pending
            .as_ref()
            .ok_or(VerificationError::NoPendingChallenge)?;

        if let Some(ttl) = self.code_ttl {
            if Utc::now() - pending.requested_at > ttl {
                tracing::info!(lfl_number = %pending.number, "Verification code expired");
                self.pending = None;
                return Err(VerificationError::CodeExpired);
            }
        }

        if input.trim() != pending.code {
            tracing::debug!(lfl_number = %pending.number, "Verification code mismatch");
            return Err(VerificationError::CodeMismatch);
        }

        let PendingVerification { number, email, .. } = match self.pending.take() {
            Some(pending) => pending,
            None => return Err(VerificationError::NoPendingChallenge),
        };

        if self.store.upsert(&number, &email) {
            tracing::info!(lfl_number = %number, email = %email, "Registered LFL number");
        } else {
            tracing::info!(lfl_number = %number, "LFL number already registered, re-selecting");
        }

        self.store.set_active(Some(&number))?;
        self.persist();

        self.store
            .get(&number)
            .cloned()
            .ok_or(VerificationError::UnknownNumber(number))
    }

    /// Change the active LFL number; an empty string clears the selection
    pub fn select_active(&mut self, number: &str) -> Result<(), VerificationError> {
        let number = number.trim();
        let selection = (!number.is_empty()).then_some(number);

        self.store.set_active(selection)?;
        self.persist();

        tracing::info!(active = ?selection, "Active LFL number changed");
        Ok(())
    }

    /// Write state back; in-memory state stays authoritative if this fails
    fn persist(&self) {
        if let Err(e) = self.store.save() {
            tracing::error!("Failed to persist registrations: {}", e);
        }
    }
}

/// Uniform six-digit code
fn generate_code() -> String {
    rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX).to_string()
}
