//! The authenticated-user view shared across the application

use serde::{Deserialize, Serialize};
use spark_auth::User;
use url::Url;

use crate::error::Result;
use crate::profile::{profile_url, Profile};

/// The signed-in user as the rest of the application sees it.
///
/// Built from the auth account plus its `profiles` row. Always replaced
/// wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    /// Never empty once resolved.
    pub username: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl CurrentUser {
    /// Combine an auth account with its (possibly missing) profile row.
    ///
    /// The username comes from the profile, then the account metadata, then
    /// the email, then the account id.
    pub fn resolve(user: &User, profile: Option<Profile>) -> Self {
        let email = user.email.clone().unwrap_or_default();
        let username = profile
            .as_ref()
            .and_then(|p| p.username.as_deref())
            .filter(|name| !name.is_empty())
            .or_else(|| user.username())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if email.is_empty() {
                    user.id.clone()
                } else {
                    email.clone()
                }
            });

        Self {
            id: user.id.clone(),
            email,
            username,
            profile,
        }
    }

    /// Two-letter avatar text.
    pub fn initials(&self) -> String {
        self.username.chars().take(2).collect::<String>().to_uppercase()
    }

    /// Public page of this user under `origin`.
    pub fn profile_url(&self, origin: &Url) -> Result<Url> {
        profile_url(origin, &self.username)
    }
}
