//! Spark client core
//!
//! Session handling, social links and public profiles for the Spark
//! link-in-bio application, on top of a Supabase backend.

pub mod account;
pub mod cache;
pub mod config;
pub mod error;
pub mod links;
pub mod profile;
pub mod remote;
pub mod session;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use reqwest::Client;
use spark_auth::{Auth, AuthOptions, SessionStorage};

use crate::account::AccountService;
use crate::cache::LocalCache;
use crate::links::{LinkList, LinkRepository};
use crate::profile::ProfileRepository;
use crate::remote::RemoteDataService;
use crate::session::SessionManager;
use crate::storage::FileStorage;

pub use crate::config::{ClientOptions, SparkConfig};
pub use crate::error::{Error, Result};

/// The main entry point: every service, wired to one backend and one
/// local store.
#[derive(Clone)]
pub struct Spark {
    config: SparkConfig,
    auth: Arc<Auth>,
    remote: RemoteDataService,
    cache: LocalCache,
    session: SessionManager,
}

impl Spark {
    /// Create a client that keeps its state in `config.cache_dir`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use spark::{Spark, SparkConfig};
    ///
    /// # fn main() -> spark::Result<()> {
    /// let config = SparkConfig::new("https://your-project.supabase.co", "your-anon-key")?;
    /// let spark = Spark::new(config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: SparkConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let storage = FileStorage::new(&config.cache_dir).map_err(|e| {
            Error::cache(format!(
                "cannot open {}: {}",
                config.cache_dir.display(),
                e
            ))
        })?;

        Ok(Self::with_storage(config, http_client, Arc::new(storage)))
    }

    /// Create a client on an existing HTTP client and store.
    pub fn with_storage(
        config: SparkConfig,
        http_client: Client,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        let auth_options = AuthOptions {
            auto_refresh_token: config.options.auto_refresh_token,
            persist_session: config.options.persist_session,
            ..Default::default()
        };
        let auth = Arc::new(
            Auth::new(
                config.base_url(),
                &config.anon_key,
                http_client.clone(),
                auth_options,
            )
            .with_storage(storage.clone()),
        );

        let remote = RemoteDataService::new(&config, http_client, auth.clone());
        let cache = LocalCache::new(storage);
        let session = SessionManager::new(
            auth.clone(),
            ProfileRepository::new(remote.clone()),
            cache.clone(),
        );

        Self {
            config,
            auth,
            remote,
            cache,
            session,
        }
    }

    pub fn config(&self) -> &SparkConfig {
        &self.config
    }

    pub fn auth(&self) -> &Arc<Auth> {
        &self.auth
    }

    pub fn remote(&self) -> &RemoteDataService {
        &self.remote
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn links(&self) -> LinkRepository {
        LinkRepository::new(self.remote.clone())
    }

    /// Load the links of `profile_id` into an editable list.
    pub async fn link_list(&self, profile_id: &str) -> Result<LinkList> {
        LinkList::load(self.links(), profile_id).await
    }

    pub fn profiles(&self) -> ProfileRepository {
        ProfileRepository::new(self.remote.clone())
    }

    pub fn accounts(&self) -> AccountService {
        AccountService::new(self.auth.clone(), self.profiles(), self.session.clone())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::account::SignUpOutcome;
    pub use crate::config::{ClientOptions, SparkConfig};
    pub use crate::error::{Error, Result};
    pub use crate::links::{NewSocialLink, Platform, SocialLink, SocialLinkPatch};
    pub use crate::profile::{Profile, PublicProfile};
    pub use crate::session::{CurrentUser, Navigation, SessionState};
    pub use crate::validation::{PasswordChangeForm, ProfileForm, SignInForm, SignUpForm};
    pub use crate::Spark;
    pub use spark_auth::AuthChangeEvent;
}
