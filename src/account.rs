//! Account creation and settings

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use spark_auth::{Auth, Session, User, UserAttributes};
use tracing::{error, info};

use crate::error::Result;
use crate::profile::{NewProfile, ProfileRepository, ProfileTheme};
use crate::session::SessionManager;
use crate::validation::{PasswordChangeForm, ProfileForm, SignUpForm};

/// What a sign-up produced.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: Option<User>,
    /// Present when the backend signs new accounts in straight away.
    pub session: Option<Session>,
    /// The user has to follow the emailed link before signing in.
    pub email_confirmation_required: bool,
}

#[derive(Clone)]
pub struct AccountService {
    auth: Arc<Auth>,
    profiles: ProfileRepository,
    session: SessionManager,
}

impl AccountService {
    pub fn new(auth: Arc<Auth>, profiles: ProfileRepository, session: SessionManager) -> Self {
        Self {
            auth,
            profiles,
            session,
        }
    }

    /// Create an account and its profile, theme and analytics rows.
    ///
    /// The extra rows are best effort: failures are logged, not returned.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<SignUpOutcome> {
        form.validate()?;

        let response = self
            .auth
            .sign_up(
                &form.email,
                &form.password,
                Some(json!({ "username": form.username })),
            )
            .await?;

        if let Some(user) = &response.user {
            info!(user_id = %user.id, "account created");
            self.create_profile_rows(user, form).await;
        }

        Ok(SignUpOutcome {
            email_confirmation_required: response.confirmation_required(),
            user: response.user,
            session: response.session,
        })
    }

    async fn create_profile_rows(&self, user: &User, form: &SignUpForm) {
        let profile = NewProfile {
            id: user.id.clone(),
            username: form.username.clone(),
            email: form.email.clone(),
            created_at: Utc::now(),
        };
        if let Err(e) = self.profiles.create(&profile).await {
            error!(user_id = %user.id, error = %e, "profile creation failed");
        }

        if let Err(e) = self
            .profiles
            .create_theme(&ProfileTheme::default_for(&user.id))
            .await
        {
            error!(user_id = %user.id, error = %e, "theme creation failed");
        }

        if let Err(e) = self.profiles.create_analytics(&user.id).await {
            error!(user_id = %user.id, error = %e, "analytics creation failed");
        }
    }

    /// Rename the signed-in user everywhere the name is stored.
    pub async fn update_username(&self, form: &ProfileForm) -> Result<()> {
        form.validate()?;
        let user = self.session.require_user()?;

        self.profiles.update_username(&user.id, &form.username).await?;
        self.auth
            .update_user(UserAttributes {
                data: Some(json!({ "username": form.username })),
                ..Default::default()
            })
            .await?;

        self.session.refresh().await?;
        Ok(())
    }

    /// The current password is collected but not verified.
    pub async fn change_password(&self, form: &PasswordChangeForm) -> Result<()> {
        form.validate()?;
        self.auth
            .update_user(UserAttributes {
                password: Some(form.new_password.clone()),
                ..Default::default()
            })
            .await?;
        info!("password changed");
        Ok(())
    }
}
