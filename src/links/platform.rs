//! Platforms a social link can be tagged with

use std::fmt;

use serde::{Deserialize, Serialize};

/// Display metadata for a known platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub placeholder: &'static str,
    pub url_pattern: &'static str,
}

const PLATFORMS: [PlatformInfo; 7] = [
    PlatformInfo {
        id: "linkedin",
        name: "LinkedIn",
        icon: "linkedin",
        placeholder: "https://linkedin.com/in/username",
        url_pattern: "https://linkedin.com/in/*",
    },
    PlatformInfo {
        id: "twitter",
        name: "X (Twitter)",
        icon: "twitter",
        placeholder: "https://twitter.com/username",
        url_pattern: "https://twitter.com/*",
    },
    PlatformInfo {
        id: "instagram",
        name: "Instagram",
        icon: "instagram",
        placeholder: "https://instagram.com/username",
        url_pattern: "https://instagram.com/*",
    },
    PlatformInfo {
        id: "facebook",
        name: "Facebook",
        icon: "facebook",
        placeholder: "https://facebook.com/username",
        url_pattern: "https://facebook.com/*",
    },
    PlatformInfo {
        id: "github",
        name: "GitHub",
        icon: "github",
        placeholder: "https://github.com/username",
        url_pattern: "https://github.com/*",
    },
    PlatformInfo {
        id: "youtube",
        name: "YouTube",
        icon: "youtube",
        placeholder: "https://youtube.com/@username",
        url_pattern: "https://youtube.com/*",
    },
    PlatformInfo {
        id: "website",
        name: "Website",
        icon: "globe",
        placeholder: "https://yourwebsite.com",
        url_pattern: "https://*",
    },
];

/// Platform tag of a social link, stored as its lowercase id.
///
/// Ids this client does not know are kept as `Other` so they survive a
/// read-modify-write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    LinkedIn,
    Twitter,
    Instagram,
    Facebook,
    GitHub,
    YouTube,
    Website,
    Other(String),
}

impl Platform {
    /// Known platforms in picker order.
    pub const ALL: [Platform; 7] = [
        Platform::LinkedIn,
        Platform::Twitter,
        Platform::Instagram,
        Platform::Facebook,
        Platform::GitHub,
        Platform::YouTube,
        Platform::Website,
    ];

    pub fn id(&self) -> &str {
        match self {
            Platform::Other(id) => id.as_str(),
            known => known.info().map(|info| info.id).unwrap_or_default(),
        }
    }

    pub fn info(&self) -> Option<&'static PlatformInfo> {
        let index = match self {
            Platform::LinkedIn => 0,
            Platform::Twitter => 1,
            Platform::Instagram => 2,
            Platform::Facebook => 3,
            Platform::GitHub => 4,
            Platform::YouTube => 5,
            Platform::Website => 6,
            Platform::Other(_) => return None,
        };
        PLATFORMS.get(index)
    }

    /// Display name; unknown ids are shown as stored.
    pub fn display_name(&self) -> &str {
        self.info().map(|info| info.name).unwrap_or_else(|| self.id())
    }

    pub fn placeholder(&self) -> &str {
        self.info().map(|info| info.placeholder).unwrap_or("https://")
    }

    /// Letter shown in place of an icon.
    pub fn initial(&self) -> Option<char> {
        self.display_name().chars().next()
    }
}

impl From<&str> for Platform {
    fn from(id: &str) -> Self {
        match id {
            "linkedin" => Platform::LinkedIn,
            "twitter" => Platform::Twitter,
            "instagram" => Platform::Instagram,
            "facebook" => Platform::Facebook,
            "github" => Platform::GitHub,
            "youtube" => Platform::YouTube,
            "website" => Platform::Website,
            other => Platform::Other(other.to_string()),
        }
    }
}

impl From<String> for Platform {
    fn from(id: String) -> Self {
        match Platform::from(id.as_str()) {
            Platform::Other(_) => Platform::Other(id),
            known => known,
        }
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Other(id) => id,
            known => known.id().to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
