//! Service layer: the glue between HTTP handlers, repositories and the pure
//! domain crates.
//!
//! One file per area (`parties`, `catalog`, `purchasing`, `sales`, `users`,
//! `reports`); they all extend `AppServices`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

use stockroom_auth::{TokenConfig, TokenService, User};
use stockroom_core::{DomainError, Entity, ExpectedVersion};
use stockroom_infra::db::{self, PgPool};
use stockroom_infra::{
    InMemoryObjectStore, InMemoryRepository, JwtSigning, LocalObjectStore, MailTemplate,
    Mailer, ObjectStore, PgRepository, Repository, Settings, TracingMailer,
};
use stockroom_parties::{Customer, Supplier};
use stockroom_products::Product;
use stockroom_purchasing::PurchaseOrder;
use stockroom_sales::Sale;

use crate::app::errors::ServiceError;

mod catalog;
mod parties;
mod purchasing;
mod reports;
mod sales;
mod stock;
mod users;

pub use catalog::ProductFilter;
pub use sales::{SaleInput, SaleLineInput};
pub use users::{CreateUser, LoginOutcome};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// One repository per entity type.
#[derive(Clone)]
pub struct Repositories {
    pub customers: Arc<dyn Repository<Customer>>,
    pub suppliers: Arc<dyn Repository<Supplier>>,
    pub products: Arc<dyn Repository<Product>>,
    pub purchases: Arc<dyn Repository<PurchaseOrder>>,
    pub sales: Arc<dyn Repository<Sale>>,
    pub users: Arc<dyn Repository<User>>,
    backend: &'static str,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            customers: Arc::new(InMemoryRepository::<Customer>::new()),
            suppliers: Arc::new(InMemoryRepository::<Supplier>::new()),
            products: Arc::new(InMemoryRepository::<Product>::new()),
            purchases: Arc::new(InMemoryRepository::<PurchaseOrder>::new()),
            sales: Arc::new(InMemoryRepository::<Sale>::new()),
            users: Arc::new(InMemoryRepository::<User>::new()),
            backend: "memory",
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            customers: Arc::new(PgRepository::<Customer>::new(pool.clone())),
            suppliers: Arc::new(PgRepository::<Supplier>::new(pool.clone())),
            products: Arc::new(PgRepository::<Product>::new(pool.clone())),
            purchases: Arc::new(PgRepository::<PurchaseOrder>::new(pool.clone())),
            sales: Arc::new(PgRepository::<Sale>::new(pool.clone())),
            users: Arc::new(PgRepository::<User>::new(pool)),
            backend: "postgres",
        }
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

/// Application services shared by every handler (behind an `Arc`).
pub struct AppServices {
    repos: Repositories,
    tokens: Arc<TokenService>,
    store: Arc<dyn ObjectStore>,
    mailer: Arc<dyn Mailer>,
    mail_from: String,
    /// Held by every product write so two confirmations cannot both pass the
    /// availability check and no edit lands in the middle of a stock move.
    stock_lock: Mutex<()>,
    /// Makes the username check and the insert one step.
    user_lock: Mutex<()>,
}

impl AppServices {
    pub fn new(
        repos: Repositories,
        tokens: Arc<TokenService>,
        store: Arc<dyn ObjectStore>,
        mailer: Arc<dyn Mailer>,
        mail_from: impl Into<String>,
    ) -> Self {
        Self {
            repos,
            tokens,
            store,
            mailer,
            mail_from: mail_from.into(),
            stock_lock: Mutex::new(()),
            user_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn storage_backend(&self) -> &'static str {
        self.repos.backend()
    }

    /// Check that the persistence backend answers.
    pub async fn health(&self) -> ServiceResult<()> {
        self.repos.users.ping().await?;
        Ok(())
    }

    /// Render and send a templated mail. Failures are logged, never returned.
    async fn send_mail(&self, template: MailTemplate, to: &str, vars: &BTreeMap<&str, String>) {
        let email = match template.render(&self.mail_from, to, vars) {
            Ok(email) => email,
            Err(e) => {
                warn!(template = template.name, error = %e, "failed to render mail");
                return;
            }
        };
        if let Err(e) = self.mailer.send(email).await {
            warn!(template = template.name, to, error = %e, "failed to send mail");
        }
    }
}

pub fn token_service(settings: &Settings) -> Result<TokenService, stockroom_auth::TokenError> {
    let config = TokenConfig {
        issuer: settings.jwt.issuer.clone(),
        access_ttl: Duration::seconds(settings.jwt.access_ttl_secs),
        refresh_ttl: Duration::seconds(settings.jwt.refresh_ttl_secs),
    };
    match &settings.jwt.signing {
        JwtSigning::Rsa {
            private_key_path,
            public_key_path,
        } => TokenService::rsa_from_files(private_key_path, public_key_path, config),
        JwtSigning::Hmac { secret } => Ok(TokenService::hmac(secret.as_bytes(), config)),
    }
}

/// Wire services from configuration: Postgres when `DATABASE_URL` is set,
/// otherwise in-memory stores.
pub async fn build_services(settings: &Settings) -> anyhow::Result<AppServices> {
    let tokens = Arc::new(token_service(settings)?);
    info!(algorithm = ?tokens.algorithm(), issuer = %settings.jwt.issuer, "token service ready");
    if settings.jwt.uses_dev_secret() {
        warn!("JWT_SECRET not set; signing tokens with the development secret");
    }

    let repos = match &settings.database_url {
        Some(url) => {
            let pool = db::connect(url, settings.database_max_connections).await?;
            db::migrate(&pool).await?;
            Repositories::postgres(pool)
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory repositories (data is lost on restart)");
            Repositories::in_memory()
        }
    };

    let store: Arc<dyn ObjectStore> = match &settings.upload_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "storing uploads on the local filesystem");
            Arc::new(LocalObjectStore::new(dir, settings.public_base_url.clone()))
        }
        None => Arc::new(InMemoryObjectStore::new(settings.public_base_url.clone())),
    };

    let services = AppServices::new(
        repos,
        tokens,
        store,
        Arc::new(TracingMailer),
        settings.mail_from.clone(),
    );

    if let Some(admin) = &settings.bootstrap_admin {
        services.bootstrap_admin(&admin.username, &admin.password).await?;
    }

    Ok(services)
}

/// Services over `repos` with HS256 tokens, in-memory uploads and a recording mailer.
#[cfg(test)]
pub(crate) fn test_services(repos: Repositories) -> AppServices {
    AppServices::new(
        repos,
        Arc::new(TokenService::hmac(b"service-test-secret", TokenConfig::default())),
        Arc::new(InMemoryObjectStore::new("http://localhost")),
        Arc::new(stockroom_infra::RecordingMailer::new()),
        "no-reply@stockroom.test",
    )
}

async fn load<E: Entity>(repo: &dyn Repository<E>, id: E::Id) -> ServiceResult<E> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::from(DomainError::not_found(E::KIND)))
}

async fn insert<E: Entity>(repo: &dyn Repository<E>, entity: E) -> ServiceResult<E> {
    Ok(repo.save(entity, ExpectedVersion::Exact(0)).await?)
}

/// Save a record that was loaded (and then modified) in this request.
async fn update<E: Entity>(repo: &dyn Repository<E>, entity: E) -> ServiceResult<E> {
    let loaded = entity.version();
    Ok(repo.save(entity, ExpectedVersion::Exact(loaded)).await?)
}
