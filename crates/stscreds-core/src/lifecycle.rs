//! Refresh-on-demand control flow around a single command.
//!
//! `Lifecycle::run` executes an operation against the stored credentials.
//! If the operation reports `ExpiredCredentials` the controller performs one
//! MFA re-authentication and calls the operation a second time. There is no
//! third call: the retry bound comes from the shape of `run`, not a counter.

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::credentials::{BootstrapCredentials, BootstrapKeys, SessionCredential, SessionCredentials};
use crate::error::{Error, Result};
use crate::issuer::{SessionIssuer, TokenSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialised,
    Ready,
    Executing,
    Reauthenticating,
    Done,
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninitialised => "uninitialised",
            LifecycleState::Ready => "ready",
            LifecycleState::Executing => "executing",
            LifecycleState::Reauthenticating => "reauthenticating",
            LifecycleState::Done => "done",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub struct Lifecycle<I, T> {
    settings: Settings,
    bootstrap: BootstrapCredentials,
    session: SessionCredentials,
    issuer: I,
    tokens: T,
    state: LifecycleState,
}

impl<I: SessionIssuer, T: TokenSource> Lifecycle<I, T> {
    pub fn new(settings: Settings, issuer: I, tokens: T) -> Self {
        Self {
            bootstrap: settings.bootstrap(),
            session: settings.session(),
            settings,
            issuer,
            tokens,
            state: LifecycleState::Uninitialised,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn bootstrap(&self) -> &BootstrapCredentials {
        &self.bootstrap
    }

    pub fn session(&self) -> &SessionCredentials {
        &self.session
    }

    pub fn issuer(&self) -> &I {
        &self.issuer
    }

    /// Run `op`, re-authenticating and retrying once if it reports expiry.
    pub async fn run<R, F>(&mut self, mut op: F) -> Result<R>
    where
        F: FnMut(&BootstrapCredentials, &SessionCredentials) -> Result<R>,
    {
        self.ensure_ready()?;

        self.transition(LifecycleState::Executing);
        let err = match op(&self.bootstrap, &self.session) {
            Ok(value) => return Ok(self.finish(value)),
            Err(e) if e.is_expired() => e,
            Err(e) => return Err(self.fail(e)),
        };

        info!(profile = %self.settings.profile, error = %err, "Credentials have expired, need to refresh");
        self.transition(LifecycleState::Reauthenticating);
        if let Err(e) = self.reauthenticate().await {
            return Err(self.fail(e));
        }

        self.transition(LifecycleState::Executing);
        match op(&self.bootstrap, &self.session) {
            Ok(value) => Ok(self.finish(value)),
            Err(e) if e.is_expired() => {
                warn!(profile = %self.settings.profile, "Session reported expired straight after re-authenticating");
                Err(self.fail(Error::ExpiredAfterReauth {
                    profile: self.settings.profile.clone(),
                }))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Force a fresh session regardless of the current expiry marker.
    pub async fn authenticate(&mut self) -> Result<SessionCredential> {
        self.ensure_ready()?;

        self.transition(LifecycleState::Reauthenticating);
        match self.reauthenticate().await {
            Ok(credential) => Ok(self.finish(credential)),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// The profile's bootstrap keys, after the initialisation check.
    pub fn bootstrap_keys(&mut self) -> Result<BootstrapKeys> {
        self.ensure_ready()?;
        self.bootstrap.keys().map_err(|e| self.fail(e))
    }

    /// `Uninitialised -> Ready`, or `Failed` if the bootstrap store is absent.
    fn ensure_ready(&mut self) -> Result<()> {
        if self.state == LifecycleState::Ready {
            return Ok(());
        }
        match self.bootstrap.exists() {
            Ok(true) => {
                self.transition(LifecycleState::Ready);
                Ok(())
            }
            Ok(false) => Err(self.fail(Error::NotInitialised {
                path: self.bootstrap.path().to_path_buf(),
            })),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Identify, read a code, exchange it, then persist the session before the marker.
    ///
    /// Writing the session first means a crash in between leaves the old
    /// marker in place, which at worst forces another re-authentication.
    async fn reauthenticate(&mut self) -> Result<SessionCredential> {
        let keys = self.bootstrap.keys()?;
        let identity = self.issuer.identify(&keys).await?;
        debug!(user = %identity.user_name, "Requesting MFA token");

        let code = self.tokens.read_token(&identity)?;
        let credential = self
            .issuer
            .issue_session(&keys, &identity, &code, self.settings.session_duration)
            .await?;

        self.session.ensure_store_dir()?;
        self.session.save(&credential)?;
        self.bootstrap.record_expiry(credential.expires_at)?;

        info!(
            profile = %self.settings.profile,
            expires_at = %credential.expires_at,
            "Re-authenticated"
        );
        Ok(credential)
    }

    fn transition(&mut self, next: LifecycleState) {
        debug!(from = %self.state, to = %next, "Lifecycle transition");
        self.state = next;
    }

    fn finish<R>(&mut self, value: R) -> R {
        self.transition(LifecycleState::Done);
        value
    }

    fn fail(&mut self, err: Error) -> Error {
        self.transition(LifecycleState::Failed);
        err
    }
}
