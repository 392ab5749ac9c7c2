//! The current-user session: cached at startup, confirmed against the
//! backend, kept in step with auth events

mod state;
mod user;

pub use state::{Navigation, SessionState};
pub use user::CurrentUser;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use spark_auth::{Auth, AuthChangeEvent, AuthError};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::LocalCache;
use crate::error::Result;
use crate::profile::ProfileRepository;
use crate::validation::SignInForm;

/// Owns the published [`SessionState`].
///
/// Every change to the cache and the published state happens under one lock,
/// together with a generation counter that each explicit sign-in or sign-out
/// advances. A fetch remembers the generation it started in and its result is
/// dropped if the counter moved on in the meantime.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    auth: Arc<Auth>,
    profiles: ProfileRepository,
    cache: LocalCache,
    state: watch::Sender<SessionState>,
    generation: Mutex<u64>,
    navigation: broadcast::Sender<Navigation>,
}

impl SessionManager {
    pub fn new(auth: Arc<Auth>, profiles: ProfileRepository, cache: LocalCache) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        let (navigation, _) = broadcast::channel(8);
        Self {
            inner: Arc::new(Inner {
                auth,
                profiles,
                cache,
                state,
                generation: Mutex::new(0),
                navigation,
            }),
        }
    }

    /// Observe the published state. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn current(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn user(&self) -> Option<CurrentUser> {
        self.inner.state.borrow().user().cloned()
    }

    pub fn on_navigate(&self) -> broadcast::Receiver<Navigation> {
        self.inner.navigation.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.inner.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        *self.lock()
    }

    fn navigate(&self, to: Navigation) {
        debug!(?to, "navigating");
        let _ = self.inner.navigation.send(to);
    }

    /// Write `user` to the cache and publish it, unless a sign-in or
    /// sign-out happened after `generation` was taken.
    fn commit(&self, generation: u64, user: Option<CurrentUser>) -> bool {
        let current = self.lock();
        if *current != generation {
            debug!(
                started = generation,
                current = *current,
                "discarding stale session fetch"
            );
            return false;
        }
        self.store(user);
        true
    }

    /// Like [`Self::commit`] but always applies, and invalidates every fetch
    /// still in flight.
    fn transition(&self, user: Option<CurrentUser>) {
        let mut current = self.lock();
        *current += 1;
        self.store(user);
    }

    // Caller holds the generation lock.
    fn store(&self, user: Option<CurrentUser>) {
        let state = match user {
            Some(user) => {
                if let Err(e) = self.inner.cache.set(&user) {
                    warn!(error = %e, "failed to cache user");
                }
                SessionState::Resolved(user)
            }
            None => {
                if let Err(e) = self.inner.cache.clear() {
                    warn!(error = %e, "failed to clear cached user");
                }
                SessionState::Empty
            }
        };
        self.inner.state.send_replace(state);
    }

    /// Publish whatever the local cache holds, without touching the network.
    ///
    /// An unreadable record counts as no record.
    pub fn load_cached(&self) -> SessionState {
        let _guard = self.lock();
        let state = match self.inner.cache.get() {
            Ok(Some(user)) => SessionState::Cached(user),
            Ok(None) => SessionState::Empty,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable cached user");
                SessionState::Empty
            }
        };
        self.inner.state.send_replace(state.clone());
        state
    }

    /// Publish the cached user, then replace it with what the backend says.
    ///
    /// A failed fetch signs the user out locally.
    pub async fn bootstrap(&self) -> SessionState {
        self.load_cached();

        let generation = self.generation();
        match self.fetch_current_user().await {
            Ok(user) => {
                self.commit(generation, user);
            }
            Err(e) => {
                warn!(error = %e, "could not confirm session, signing out locally");
                self.commit(generation, None);
            }
        }

        self.current()
    }

    /// Authoritative user: session (refreshed if expired), verified account,
    /// profile row.
    async fn fetch_current_user(&self) -> Result<Option<CurrentUser>> {
        if self.inner.auth.current_session().await?.is_none() {
            return Ok(None);
        }
        let user = self.inner.auth.get_user().await?;
        let profile = self.inner.profiles.find_by_id(&user.id).await?;
        Ok(Some(CurrentUser::resolve(&user, profile)))
    }

    /// Re-fetch and republish the current user.
    ///
    /// Returns `None` without touching state when there is no session or a
    /// sign-out overtook the fetch. Errors leave state as it was.
    pub async fn refresh(&self) -> Result<Option<CurrentUser>> {
        let generation = self.generation();
        let user = match self.fetch_current_user().await? {
            Some(user) => user,
            None => return Ok(None),
        };
        if self.commit(generation, Some(user.clone())) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn handle_auth_event(&self, event: AuthChangeEvent) -> Result<()> {
        debug!(?event, "auth state changed");
        match event {
            AuthChangeEvent::SignedIn | AuthChangeEvent::UserUpdated => {
                let generation = self.generation();
                let user = self.fetch_current_user().await?;
                self.commit(generation, user);
            }
            AuthChangeEvent::SignedOut => {
                // The auth client may still hold the token that was signed out.
                self.inner.auth.clear_session();
                self.transition(None);
            }
            AuthChangeEvent::TokenRefreshed => {}
        }
        Ok(())
    }

    /// Follow auth events until the returned handle is dropped.
    pub fn listen(&self) -> AuthListener {
        let mut events = self.inner.auth.on_auth_state_change();
        let manager = self.clone();

        let handle = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "auth events dropped, re-fetching session");
                        AuthChangeEvent::UserUpdated
                    }
                    Err(RecvError::Closed) => break,
                };
                if let Err(e) = manager.handle_auth_event(event).await {
                    warn!(?event, error = %e, "failed to apply auth event");
                }
            }
        });

        AuthListener { handle }
    }

    pub async fn sign_in(&self, form: &SignInForm) -> Result<CurrentUser> {
        form.validate()?;

        self.inner
            .auth
            .sign_in_with_password(&form.email, &form.password)
            .await?;
        let user = self
            .fetch_current_user()
            .await?
            .ok_or(AuthError::MissingSession)?;

        info!(user_id = %user.id, "signed in");
        self.transition(Some(user.clone()));
        Ok(user)
    }

    /// Sign out remotely, then forget the user locally and go home.
    ///
    /// If the backend refuses, nothing local changes. Having no session to
    /// invalidate is not a failure.
    pub async fn logout(&self) -> Result<()> {
        match self.inner.auth.sign_out().await {
            Ok(()) | Err(AuthError::MissingSession) => {}
            Err(e) => return Err(e.into()),
        }

        self.transition(None);
        info!("signed out");
        self.navigate(Navigation::Home);
        Ok(())
    }

    /// The signed-in user, or a redirect to sign-in.
    pub fn require_user(&self) -> Result<CurrentUser> {
        match self.user() {
            Some(user) => Ok(user),
            None => {
                self.navigate(Navigation::SignIn);
                Err(AuthError::MissingSession.into())
            }
        }
    }
}

/// Running auth-event subscription. Dropping it unsubscribes.
pub struct AuthListener {
    handle: JoinHandle<()>,
}

impl AuthListener {
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for AuthListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
