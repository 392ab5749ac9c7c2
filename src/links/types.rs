use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Platform;
use crate::validation::{require, ValidationError};

/// A row of the `social_links` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialLink {
    pub id: String,
    pub profile_id: String,
    pub platform: Platform,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    /// Display order; not unique.
    pub position: u32,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn active_by_default() -> bool {
    true
}

/// Fields supplied when adding a link.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSocialLink {
    pub platform: Platform,
    pub url: String,
    pub title: String,
    pub icon: Option<String>,
}

impl NewSocialLink {
    pub fn new(platform: Platform, url: &str, title: &str) -> Self {
        Self {
            platform,
            url: url.to_string(),
            title: title.to_string(),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    /// Only presence is checked; URL shape is not.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("Platform", self.platform.id())?;
        require("Title", &self.title)?;
        require("URL", &self.url)
    }
}

/// Row sent to the backend for a new link.
#[derive(Debug, Serialize)]
pub(crate) struct NewSocialLinkRow<'a> {
    pub profile_id: &'a str,
    pub platform: &'a Platform,
    pub url: &'a str,
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'a str>,
    pub position: u32,
    pub is_active: bool,
}

impl<'a> NewSocialLinkRow<'a> {
    pub fn new(profile_id: &'a str, link: &'a NewSocialLink, position: u32) -> Self {
        Self {
            profile_id,
            platform: &link.platform,
            url: &link.url,
            title: &link.title,
            icon: link.icon.as_deref(),
            position,
            is_active: true,
        }
    }
}

/// Partial update of a link. Unset fields are left alone; the owning
/// profile cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SocialLinkPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl SocialLinkPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(platform) = &self.platform {
            require("Platform", platform.id())?;
        }
        if let Some(title) = &self.title {
            require("Title", title)?;
        }
        if let Some(url) = &self.url {
            require("URL", url)?;
        }
        Ok(())
    }
}
