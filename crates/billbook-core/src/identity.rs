//! # Identity
//!
//! Resolves a caller credential to the tenant that owns the data.
//!
//! ```text
//! credential ──► Identity::authenticate ──► TenantId ──► repositories
//!                        │
//!                        └── rejected ──► CoreError::Unauthenticated
//! ```
//!
//! Token verification is not done here. Deployments plug in their own
//! implementation; single-user installs use [`StaticIdentity`].

use crate::error::{CoreError, CoreResult};
use crate::types::TenantId;

/// Verifies a caller and yields their tenant.
pub trait Identity: Send + Sync {
    fn authenticate(&self, credential: Option<&str>) -> CoreResult<TenantId>;
}

/// Every caller is the same, preconfigured tenant.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    tenant: TenantId,
}

impl StaticIdentity {
    pub fn new(tenant: TenantId) -> Self {
        StaticIdentity { tenant }
    }
}

impl Identity for StaticIdentity {
    fn authenticate(&self, credential: Option<&str>) -> CoreResult<TenantId> {
        // A credential, when supplied, must name the configured tenant.
        match credential {
            Some(c) if c.trim() != self.tenant.as_str() => Err(CoreError::Unauthenticated),
            _ => Ok(self.tenant.clone()),
        }
    }
}
