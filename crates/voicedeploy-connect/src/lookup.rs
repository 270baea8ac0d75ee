use std::sync::Arc;

use tracing::{debug, info, warn};
use voicedeploy_store::{ConfigStore, InstanceReference, SecurityProfileReference};

use crate::api::ConnectApi;
use crate::error::LookupError;

/// The security profile assigned to created agents.
pub const AGENT_PROFILE_NAME: &str = "Agent";

/// Permissions the agent profile needs for calls and customer profiles.
pub const AGENT_PERMISSIONS: &[&str] = &[
    "BasicAgentAccess",
    "OutboundCallAccess",
    "CustomerProfiles.Create",
    "CustomerProfiles.Edit",
    "CustomerProfiles.View",
    "CustomViews.Access",
];

/// Result of the best-effort permission update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionUpdate {
    Applied(Vec<String>),
    Degraded(String),
}

impl PermissionUpdate {
    pub fn is_applied(&self) -> bool {
        matches!(self, PermissionUpdate::Applied(_))
    }
}

/// Instance ID from either an ID or an instance ARN
/// (`arn:aws:connect:<region>:<account>:instance/<id>`).
pub fn instance_id_from_identifier(identifier: &str) -> Result<String, LookupError> {
    let trimmed = identifier.trim();
    let id = trimmed.rsplit('/').next().unwrap_or(trimmed).trim();
    if id.is_empty() {
        return Err(LookupError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(id.to_string())
}

/// Connect lookups that persist their results to the working directory.
#[derive(Clone)]
pub struct RemoteLookup {
    api: Arc<dyn ConnectApi>,
    store: ConfigStore,
}

impl RemoteLookup {
    pub fn new(api: Arc<dyn ConnectApi>, store: ConfigStore) -> Self {
        Self { api, store }
    }

    /// The instance recorded by an earlier run, if any.
    pub fn cached_instance(&self) -> Result<Option<InstanceReference>, LookupError> {
        Ok(self.store.load_optional::<InstanceReference>()?)
    }

    /// Describe the instance and write `connect.json`.
    pub async fn resolve_instance(&self, identifier: &str) -> Result<InstanceReference, LookupError> {
        let instance_id = instance_id_from_identifier(identifier)?;
        debug!(%instance_id, "Resolving Connect instance");

        let summary = self
            .api
            .describe_instance(&instance_id)
            .await
            .map_err(|e| LookupError::LookupFailed {
                identifier: identifier.to_string(),
                reason: e.to_string(),
            })?;

        let arn = summary.arn.ok_or_else(|| LookupError::LookupFailed {
            identifier: identifier.to_string(),
            reason: "response did not include an instance ARN".to_string(),
        })?;

        let instance = InstanceReference {
            id: instance_id,
            arn,
        };
        self.store.save(&instance)?;
        info!(id = %instance.id, arn = %instance.arn, "Connect instance verified");
        Ok(instance)
    }

    /// Find the "Agent" security profile and write `security_profile.json`.
    pub async fn resolve_security_profile(
        &self,
        instance: &InstanceReference,
    ) -> Result<SecurityProfileReference, LookupError> {
        let mut next_token = None;
        loop {
            let page = self
                .api
                .list_security_profiles(&instance.id, next_token)
                .await
                .map_err(|e| LookupError::LookupFailed {
                    identifier: instance.id.clone(),
                    reason: e.to_string(),
                })?;

            if let Some(found) = page
                .profiles
                .into_iter()
                .find(|p| p.name == AGENT_PROFILE_NAME)
            {
                let profile = SecurityProfileReference {
                    id: found.id,
                    arn: found.arn,
                    name: found.name,
                };
                self.store.save(&profile)?;
                info!(arn = %profile.arn, "Agent security profile found");
                return Ok(profile);
            }

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Err(LookupError::ProfileNotFound {
            instance_id: instance.id.clone(),
            name: AGENT_PROFILE_NAME.to_string(),
        })
    }

    /// Set the profile's permissions to [`AGENT_PERMISSIONS`] plus `extra`.
    ///
    /// Never fails: an API error comes back as [`PermissionUpdate::Degraded`].
    pub async fn widen_permissions(
        &self,
        instance: &InstanceReference,
        profile: &SecurityProfileReference,
        extra: &[&str],
    ) -> PermissionUpdate {
        let mut permissions: Vec<String> = Vec::new();
        for permission in AGENT_PERMISSIONS.iter().chain(extra) {
            if !permissions.iter().any(|p| p == permission) {
                permissions.push(permission.to_string());
            }
        }

        match self
            .api
            .update_security_profile(&instance.id, &profile.id, &permissions)
            .await
        {
            Ok(()) => {
                info!(count = permissions.len(), "Agent security profile permissions updated");
                PermissionUpdate::Applied(permissions)
            }
            Err(e) => {
                warn!(error = %e, "Failed to update security profile permissions");
                PermissionUpdate::Degraded(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_from_arn() {
        let id = instance_id_from_identifier(
            "arn:aws:connect:us-east-1:123456789012:instance/11111111-2222-3333",
        )
        .unwrap();
        assert_eq!(id, "11111111-2222-3333");
    }

    #[test]
    fn test_instance_id_passthrough() {
        assert_eq!(instance_id_from_identifier(" abc-123 ").unwrap(), "abc-123");
    }

    #[test]
    fn test_empty_identifier_is_invalid() {
        assert!(matches!(
            instance_id_from_identifier("  "),
            Err(LookupError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            instance_id_from_identifier("arn:aws:connect:us-east-1:1:instance/"),
            Err(LookupError::InvalidIdentifier(_))
        ));
    }
}
