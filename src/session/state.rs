use super::CurrentUser;

/// What the application currently believes about the signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Nothing has been read yet.
    Unknown,
    /// Read from the local cache, not yet confirmed by the backend.
    Cached(CurrentUser),
    /// Confirmed by the backend.
    Resolved(CurrentUser),
    /// Nobody is signed in.
    Empty,
}

impl SessionState {
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            SessionState::Cached(user) | SessionState::Resolved(user) => Some(user),
            SessionState::Unknown | SessionState::Empty => None,
        }
    }

    /// True once the backend has answered, either way.
    pub fn is_settled(&self) -> bool {
        matches!(self, SessionState::Resolved(_) | SessionState::Empty)
    }
}

/// Where the application should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Landing page, after logout.
    Home,
    /// Sign-in page, when a protected view has no user.
    SignIn,
}
