use std::sync::Arc;

use tracing::info;

use crate::auth::identity::{IdentityProvider, TokenIdentityProvider};
use crate::config::AppConfig;
use crate::store::{FinanceStore, MemoryStore, PgStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FinanceStore>,
    pub config: Arc<AppConfig>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let store = match &config.database_url {
            Some(url) => {
                let pg = PgStore::connect(url).await?;
                pg.migrate().await?;
                info!("using postgres store");
                Arc::new(pg) as Arc<dyn FinanceStore>
            }
            None => {
                info!("DATABASE_URL not set; using in-memory store");
                Arc::new(MemoryStore::new()) as Arc<dyn FinanceStore>
            }
        };

        let identity =
            Arc::new(TokenIdentityProvider::new(&config.identity)) as Arc<dyn IdentityProvider>;

        Ok(Self::from_parts(store, config, identity))
    }

    pub fn from_parts(
        store: Arc<dyn FinanceStore>,
        config: Arc<AppConfig>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            config,
            identity,
        }
    }

    /// In-memory state with demo login enabled, for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{IdentityConfig, JwtConfig};

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            environment: "test".into(),
            frontend_origin: None,
            database_url: None,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            identity: IdentityConfig {
                client_id: None,
                issuer: "test-idp".into(),
                secret: None,
                demo_login: true,
            },
        });
        let identity =
            Arc::new(TokenIdentityProvider::new(&config.identity)) as Arc<dyn IdentityProvider>;
        Self::from_parts(Arc::new(MemoryStore::new()), config, identity)
    }
}
