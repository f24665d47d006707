//! Administrator roster, stored as a comma-separated property.

use crate::core::error::StoreError;
use crate::core::store::PropertyStore;
use crate::types::Email;

pub struct AdminRoster<R> {
    source: R,
    key: String,
}

impl<R: PropertyStore> AdminRoster<R> {
    pub fn new(source: R, key: impl Into<String>) -> Self {
        Self {
            source,
            key: key.into(),
        }
    }

    /// Reads the roster, surfacing store failures. A missing property is an
    /// empty roster.
    pub fn admin_emails(&self) -> Result<Vec<Email>, StoreError> {
        Ok(self
            .source
            .get(&self.key)?
            .map(|raw| Email::parse_list(&raw))
            .unwrap_or_default())
    }

    /// Replaces the roster.
    pub fn set_admin_emails(&self, emails: &[Email]) -> Result<(), StoreError> {
        let raw = emails
            .iter()
            .map(|email| email.as_str())
            .collect::<Vec<_>>()
            .join(",");
        self.source.set(&self.key, &raw)
    }

    /// Fails closed: an unreadable or unset roster has no admins, and an
    /// identity that doesn't normalize is never one.
    pub fn is_admin(&self, identity: &str) -> bool {
        let Ok(identity) = Email::try_from(identity) else {
            return false;
        };

        match self.source.get(&self.key) {
            Ok(Some(raw)) => Email::parse_list(&raw).contains(&identity),
            Ok(None) => {
                tracing::warn!(key = %self.key, "admin roster is not configured");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to read admin roster");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests;
