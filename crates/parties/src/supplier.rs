use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::error::{optional_text, required_text};
use stockroom_core::{DomainResult, Entity, SupplierId, Timestamps};

use crate::contact::{ContactInfo, ContactPatch};

const NAME_MAX: usize = 120;

/// A supplier that purchase orders are placed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    id: SupplierId,
    name: String,
    contact_person: Option<String>,
    contact: ContactInfo,
    version: u64,
    timestamps: Timestamps,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    pub contact_person: Option<String>,
    #[serde(default)]
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierPatch {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    #[serde(default)]
    pub contact: ContactPatch,
}

impl Supplier {
    pub fn register(input: NewSupplier, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: SupplierId::new(),
            name: required_text("name", &input.name, NAME_MAX)?,
            contact_person: optional_text(input.contact_person),
            contact: input.contact.normalized()?,
            version: 0,
            timestamps: Timestamps::new(now),
        })
    }

    pub fn update(&mut self, patch: SupplierPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = match patch.name {
            Some(name) => required_text("name", &name, NAME_MAX)?,
            None => self.name.clone(),
        };
        let contact = self.contact.patched(patch.contact)?;

        self.name = name;
        if patch.contact_person.is_some() {
            self.contact_person = optional_text(patch.contact_person);
        }
        self.contact = contact;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact_person(&self) -> Option<&str> {
        self.contact_person.as_deref()
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }
}

impl Entity for Supplier {
    type Id = SupplierId;
    const TABLE: &'static str = "suppliers";
    const KIND: &'static str = "supplier";

    fn id(&self) -> SupplierId {
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
