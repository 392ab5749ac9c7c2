//! Profiles, their themes and view analytics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::links::{LinkRepository, SocialLink};
use crate::remote::{tables, RemoteDataService};
use crate::validation::require;

/// A row of the `profiles` table.
///
/// Columns this client does not know about are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Row written for a new account.
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A row of the `profile_themes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileTheme {
    pub profile_id: String,
    pub background_color: String,
    pub text_color: String,
    pub button_color: String,
    pub button_text_color: String,
}

impl ProfileTheme {
    /// The theme every new profile starts with.
    pub fn default_for(profile_id: &str) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            background_color: "#1e1e1e".to_string(),
            text_color: "#ffffff".to_string(),
            button_color: "#6366f1".to_string(),
            button_text_color: "#ffffff".to_string(),
        }
    }
}

/// A row of the `profile_analytics` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileAnalytics {
    pub profile_id: String,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub last_viewed_at: Option<DateTime<Utc>>,
}

/// Everything the public page for one username shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicProfile {
    pub profile: Profile,
    /// Ordered by position.
    pub links: Vec<SocialLink>,
}

impl PublicProfile {
    pub fn username(&self) -> &str {
        self.profile.username.as_deref().unwrap_or_default()
    }

    pub fn initials(&self) -> String {
        self.username().chars().take(2).collect::<String>().to_uppercase()
    }
}

/// Public page URL for `username`, e.g. `https://spark.example/alice`.
pub fn profile_url(origin: &Url, username: &str) -> Result<Url> {
    let mut url = origin.clone();
    url.path_segments_mut()
        .map_err(|_| Error::config(format!("'{}' cannot be a base URL", origin)))?
        .clear()
        .push(username);
    Ok(url)
}

#[derive(Clone)]
pub struct ProfileRepository {
    remote: RemoteDataService,
}

impl ProfileRepository {
    pub fn new(remote: RemoteDataService) -> Self {
        Self { remote }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Profile>> {
        let profile = self
            .remote
            .from(tables::PROFILES)?
            .select("*")
            .eq("id", id)
            .maybe_single::<Profile>()
            .await?;
        Ok(profile)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Profile>> {
        let profile = self
            .remote
            .from(tables::PROFILES)?
            .select("*")
            .eq("username", username)
            .maybe_single::<Profile>()
            .await?;
        Ok(profile)
    }

    /// Rename a profile; the new name is its public URL segment.
    pub async fn update_username(&self, id: &str, username: &str) -> Result<Profile> {
        require("Username", username)?;

        let rows: Vec<Profile> = self
            .remote
            .from(tables::PROFILES)?
            .eq("id", id)
            .update(json!({ "username": username }))
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("profile {}", id)))
    }

    pub async fn create(&self, profile: &NewProfile) -> Result<()> {
        self.remote
            .from(tables::PROFILES)?
            .insert_minimal(json!([profile]))
            .await?;
        Ok(())
    }

    pub async fn create_theme(&self, theme: &ProfileTheme) -> Result<()> {
        self.remote
            .from(tables::PROFILE_THEMES)?
            .insert_minimal(json!([theme]))
            .await?;
        Ok(())
    }

    pub async fn create_analytics(&self, profile_id: &str) -> Result<()> {
        self.remote
            .from(tables::PROFILE_ANALYTICS)?
            .insert_minimal(json!([{ "profile_id": profile_id }]))
            .await?;
        Ok(())
    }

    pub async fn analytics(&self, profile_id: &str) -> Result<Option<ProfileAnalytics>> {
        let analytics = self
            .remote
            .from(tables::PROFILE_ANALYTICS)?
            .select("*")
            .eq("profile_id", profile_id)
            .maybe_single::<ProfileAnalytics>()
            .await?;
        Ok(analytics)
    }

    /// Count one page view.
    ///
    /// Reads the counter and writes it back incremented; two viewers racing
    /// can both write the same value.
    pub async fn record_view(&self, profile_id: &str) -> Result<Option<ProfileAnalytics>> {
        let views = self
            .analytics(profile_id)
            .await?
            .map(|a| a.views)
            .unwrap_or_default();

        let rows: Vec<ProfileAnalytics> = self
            .remote
            .from(tables::PROFILE_ANALYTICS)?
            .eq("profile_id", profile_id)
            .update(json!({
                "views": views + 1,
                "last_viewed_at": Utc::now(),
            }))
            .await?;

        debug!(profile_id, views = views + 1, "recorded profile view");
        Ok(rows.into_iter().next())
    }

    /// Load the public page for `username` and count the visit.
    ///
    /// A failure to count the view does not fail the page.
    pub async fn load_public(&self, username: &str) -> Result<PublicProfile> {
        let profile = self
            .find_by_username(username)
            .await?
            .ok_or_else(|| Error::not_found("Profile not found"))?;

        let links = LinkRepository::new(self.remote.clone())
            .list(&profile.id)
            .await?;

        if let Err(e) = self.record_view(&profile.id).await {
            warn!(profile_id = %profile.id, error = %e, "failed to record profile view");
        }

        Ok(PublicProfile { profile, links })
    }
}
