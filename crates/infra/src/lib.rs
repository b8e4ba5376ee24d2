//! Infrastructure layer: persistence, object storage, mail and configuration.

pub mod config;
pub mod db;
pub mod mail;
pub mod repository;
pub mod storage;

pub use config::{BootstrapAdmin, ConfigError, JwtSettings, JwtSigning, Settings};
pub use mail::{Email, MailError, MailTemplate, Mailer, RecordingMailer, TracingMailer};
pub use repository::{InMemoryRepository, PgRepository, Repository, RepositoryError};
pub use storage::{
    InMemoryObjectStore, LocalObjectStore, ObjectStore, StorageError, StoredBlob, StoredObject,
};
