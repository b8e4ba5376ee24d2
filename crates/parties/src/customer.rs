use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::error::required_text;
use stockroom_core::{CustomerId, DomainResult, Entity, Timestamps};

use crate::contact::{ContactInfo, ContactPatch};

const NAME_MAX: usize = 120;

/// A customer that sales are recorded against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    name: String,
    contact: ContactInfo,
    version: u64,
    timestamps: Timestamps,
}

/// Input for registering a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPatch {
    pub name: Option<String>,
    #[serde(default)]
    pub contact: ContactPatch,
}

impl Customer {
    pub fn register(input: NewCustomer, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: CustomerId::new(),
            name: required_text("name", &input.name, NAME_MAX)?,
            contact: input.contact.normalized()?,
            version: 0,
            timestamps: Timestamps::new(now),
        })
    }

    pub fn update(&mut self, patch: CustomerPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = match patch.name {
            Some(name) => required_text("name", &name, NAME_MAX)?,
            None => self.name.clone(),
        };
        let contact = self.contact.patched(patch.contact)?;

        self.name = name;
        self.contact = contact;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn email(&self) -> Option<&str> {
        self.contact.email.as_deref()
    }
}

impl Entity for Customer {
    type Id = CustomerId;
    const TABLE: &'static str = "customers";
    const KIND: &'static str = "customer";

    fn id(&self) -> CustomerId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::DomainError;

    fn new_customer(name: &str) -> NewCustomer {
        NewCustomer {
            name: name.into(),
            contact: ContactInfo {
                email: Some("buyer@example.com".into()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn register_trims_name_and_starts_unsaved() {
        let c = Customer::register(new_customer("  Jane Doe "), Utc::now()).unwrap();
        assert_eq!(c.name(), "Jane Doe");
        assert_eq!(c.version(), 0);
        assert_eq!(c.email(), Some("buyer@example.com"));
    }

    #[test]
    fn register_rejects_empty_name() {
        let err = Customer::register(new_customer(" "), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn update_keeps_absent_fields_and_touches_timestamp() {
        let created = Utc::now();
        let mut c = Customer::register(new_customer("Jane"), created).unwrap();
        let later = created + chrono::Duration::seconds(5);
        c.update(
            CustomerPatch {
                name: None,
                contact: ContactPatch {
                    phone: Some("555-0101".into()),
                    ..Default::default()
                },
            },
            later,
        )
        .unwrap();

        assert_eq!(c.name(), "Jane");
        assert_eq!(c.contact().phone.as_deref(), Some("555-0101"));
        assert_eq!(c.email(), Some("buyer@example.com"));
        assert_eq!(c.timestamps().updated_at, later);
        assert_eq!(c.timestamps().created_at, created);
    }

    #[test]
    fn failed_update_leaves_record_untouched() {
        let mut c = Customer::register(new_customer("Jane"), Utc::now()).unwrap();
        let before = c.clone();
        let res = c.update(
            CustomerPatch {
                name: Some("Janet".into()),
                contact: ContactPatch {
                    email: Some("broken".into()),
                    ..Default::default()
                },
            },
            Utc::now(),
        );
        assert!(res.is_err());
        assert_eq!(c, before);
    }

    #[test]
    fn serializes_with_stable_field_names() {
        let c = Customer::register(new_customer("Jane"), Utc::now()).unwrap();
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["name"], "Jane");
        assert_eq!(json["contact"]["email"], "buyer@example.com");
        let back: Customer = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }
}
