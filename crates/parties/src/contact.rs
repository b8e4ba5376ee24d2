use serde::{Deserialize, Serialize};

use stockroom_core::error::{optional_text, validate_email};
use stockroom_core::DomainResult;

/// Contact information shared by customers and suppliers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ContactInfo {
    /// Trim every field, drop blanks and check the e-mail shape.
    pub fn normalized(self) -> DomainResult<Self> {
        let email = optional_text(self.email).map(|e| e.to_lowercase());
        if let Some(email) = &email {
            validate_email(email)?;
        }
        Ok(Self {
            email,
            phone: optional_text(self.phone),
            address: optional_text(self.address),
        })
    }

    /// Apply a partial update; a present-but-blank field clears the value.
    pub fn patched(&self, patch: ContactPatch) -> DomainResult<Self> {
        let next = Self {
            email: patch.email.or_else(|| self.email.clone()),
            phone: patch.phone.or_else(|| self.phone.clone()),
            address: patch.address.or_else(|| self.address.clone()),
        };
        next.normalized()
    }
}

/// Partial contact update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPatch {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}
