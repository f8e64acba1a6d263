// crates/keel-core/src/identity.rs
//
// Account identity and administrator capabilities for the Keel Protocol.
//
// Every ledger account is a 32-byte identity. Administrator-gated operations
// take an explicit `AuthContext` (the caller's identity) and check it against
// the component's `Admin` capability at the top of the call. Exactly one
// administrator identity is active per component at a time; it changes only
// through an explicit handoff.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::KeelError;
use crate::hex;

/// A ledger account identity (32 bytes). Serializes as a hex string so it
/// is usable as a JSON map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub [u8; 32]);

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        hex::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        hex::deserialize(deserializer).map(Self)
    }
}

impl AccountId {
    /// Construct an identity from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive an identity from a short label by copying its bytes into the
    /// identity prefix. Convenient for fixtures and operator tooling; real
    /// deployments supply full 32-byte identities.
    pub fn from_label(label: &str) -> Self {
        let mut bytes = [0u8; 32];
        for (slot, b) in bytes.iter_mut().zip(label.as_bytes()) {
            *slot = *b;
        }
        Self(bytes)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short hex prefix is enough to tell accounts apart in logs.
        write!(
            f,
            "0x{:02x}{:02x}{:02x}{:02x}…",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// The caller identity presented with an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// The account submitting the operation.
    pub caller: AccountId,
}

impl AuthContext {
    pub fn new(caller: AccountId) -> Self {
        Self { caller }
    }
}

/// Administrator capability for a protocol component.
///
/// Holds the single active administrator identity. Checked per-call rather
/// than through ambient authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    current: AccountId,
}

impl Admin {
    /// Create a capability held by `current`.
    pub fn new(current: AccountId) -> Self {
        Self { current }
    }

    /// The active administrator identity.
    pub fn current(&self) -> AccountId {
        self.current
    }

    /// Check that the caller holds this capability.
    ///
    /// # Errors
    /// Returns `KeelError::Unauthorized` naming the operation otherwise.
    pub fn ensure(&self, ctx: &AuthContext, op: &str) -> Result<(), KeelError> {
        if ctx.caller != self.current {
            return Err(KeelError::Unauthorized(format!(
                "{} requires the administrator capability",
                op
            )));
        }
        Ok(())
    }

    /// Hand the capability to a new administrator.
    ///
    /// # Errors
    /// Returns `KeelError::Unauthorized` if the caller is not the current
    /// administrator.
    pub fn transfer(&mut self, ctx: &AuthContext, new_admin: AccountId) -> Result<(), KeelError> {
        self.ensure(ctx, "transfer_admin")?;
        self.current = new_admin;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_accepts_admin() {
        let admin_id = AccountId::from_label("admin");
        let admin = Admin::new(admin_id);
        assert!(admin.ensure(&AuthContext::new(admin_id), "op").is_ok());
    }

    #[test]
    fn test_ensure_rejects_other_caller() {
        let admin = Admin::new(AccountId::from_label("admin"));
        let ctx = AuthContext::new(AccountId::from_label("mallory"));
        let err = admin.ensure(&ctx, "seed").unwrap_err();
        assert!(matches!(err, KeelError::Unauthorized(_)));
    }

    #[test]
    fn test_transfer_handoff() {
        let first = AccountId::from_label("admin");
        let second = AccountId::from_label("successor");
        let mut admin = Admin::new(first);

        admin.transfer(&AuthContext::new(first), second).unwrap();
        assert_eq!(admin.current(), second);

        // The previous administrator no longer holds the capability.
        assert!(admin.ensure(&AuthContext::new(first), "op").is_err());
        assert!(admin.ensure(&AuthContext::new(second), "op").is_ok());
    }

    #[test]
    fn test_transfer_rejects_non_admin() {
        let mut admin = Admin::new(AccountId::from_label("admin"));
        let mallory = AccountId::from_label("mallory");
        assert!(admin
            .transfer(&AuthContext::new(mallory), mallory)
            .is_err());
    }

    #[test]
    fn test_from_label_distinct() {
        assert_ne!(
            AccountId::from_label("alice"),
            AccountId::from_label("bob")
        );
    }
}
