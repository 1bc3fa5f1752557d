use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

use super::auth::AuthenticatedUser;
use crate::core::config::RolesConfig;
use crate::meeting_requests::error::MeetingRequestsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Approve,
    Confirm,
    Announce,
    Cancel,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Confirm => "confirm",
            Self::Announce => "announce",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait CapabilityPolicy: Send + Sync {
    fn has_capability(&self, user: &AuthenticatedUser, capability: Capability) -> bool;

    fn require(
        &self,
        user: &AuthenticatedUser,
        capability: Capability,
    ) -> Result<(), MeetingRequestsError> {
        if self.has_capability(user, capability) {
            Ok(())
        } else {
            Err(MeetingRequestsError::Forbidden(format!(
                "{} may not {} meeting requests",
                user.identity(),
                capability
            )))
        }
    }
}

/// Grants capabilities by role name, case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct RoleCapabilityPolicy {
    grants: HashMap<Capability, HashSet<String>>,
    compat_identities: HashSet<String>,
}

impl RoleCapabilityPolicy {
    pub fn from_config(config: &RolesConfig) -> Self {
        let normalize = |names: &[String]| -> HashSet<String> {
            names.iter().map(|n| n.trim().to_lowercase()).collect()
        };
        let grants = HashMap::from([
            (Capability::Approve, normalize(&config.approve)),
            (Capability::Confirm, normalize(&config.confirm)),
            (Capability::Announce, normalize(&config.announce)),
            (Capability::Cancel, normalize(&config.cancel)),
        ]);
        Self {
            grants,
            compat_identities: normalize(&config.compat_identities),
        }
    }
}

impl CapabilityPolicy for RoleCapabilityPolicy {
    fn has_capability(&self, user: &AuthenticatedUser, capability: Capability) -> bool {
        let by_role = self
            .grants
            .get(&capability)
            .is_some_and(|roles| roles.iter().any(|role| user.has_role(role)));
        if by_role {
            return true;
        }

        if self
            .compat_identities
            .contains(&user.identity().to_lowercase())
        {
            warn!(
                "Granting {} to {} through compat_identities",
                capability,
                user.identity()
            );
            return true;
        }

        debug!("{} lacks the {} capability", user.identity(), capability);
        false
    }
}
