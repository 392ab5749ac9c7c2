//! Authenticated access to the backend tables

use std::sync::Arc;

use reqwest::Client;
use spark_auth::Auth;
use spark_postgrest::PostgrestClient;

use crate::config::SparkConfig;
use crate::error::Result;

/// Table names
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const SOCIAL_LINKS: &str = "social_links";
    pub const PROFILE_THEMES: &str = "profile_themes";
    pub const PROFILE_ANALYTICS: &str = "profile_analytics";
}

/// Hands out table clients that carry the current access token.
///
/// Without a session requests go out with the anonymous key, which row level
/// security limits to public reads.
#[derive(Clone)]
pub struct RemoteDataService {
    base_url: String,
    anon_key: String,
    http_client: Client,
    auth: Arc<Auth>,
    db_schema: String,
}

impl RemoteDataService {
    pub fn new(config: &SparkConfig, http_client: Client, auth: Arc<Auth>) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            anon_key: config.anon_key.clone(),
            http_client,
            auth,
            db_schema: config.options.db_schema.clone(),
        }
    }

    pub fn auth(&self) -> &Arc<Auth> {
        &self.auth
    }

    /// Start a query against `table`.
    pub fn from(&self, table: &str) -> Result<PostgrestClient> {
        let mut client = PostgrestClient::new(
            &self.base_url,
            &self.anon_key,
            table,
            self.http_client.clone(),
        );

        if self.db_schema != "public" {
            client = client.schema(&self.db_schema)?;
        }

        let token = self
            .auth
            .get_session()
            .map(|session| session.access_token)
            .unwrap_or_else(|| self.anon_key.clone());

        Ok(client.with_auth(&token)?)
    }
}
