//! Session context shared by every view.
//!
//! The identity provider lives outside this crate. What the views need from it
//! is a current-user handle, a way to mint a fresh ID token per request, and
//! session-change notifications with an explicit subscribe/unsubscribe
//! lifecycle. `SessionContext` is that handle; it is cloned into each view
//! rather than held as a global.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::errors::ClientError;

/// Produces bearer tokens for the signed-in user.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<String, ClientError>;
}

/// Hands out the same token every time.
pub struct StaticTokenSource(String);

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn fetch_token(&self) -> Result<String, ClientError> {
        Ok(self.0.clone())
    }
}

/// Runs a shell command per request and uses its stdout as the token.
pub struct CommandTokenSource {
    command: String,
}

impl CommandTokenSource {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl TokenSource for CommandTokenSource {
    async fn fetch_token(&self) -> Result<String, ClientError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .await
            .map_err(|e| ClientError::Token(format!("failed to run token command: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClientError::Token(format!(
                "token command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(ClientError::Token("token command printed nothing".into()));
        }
        Ok(token)
    }
}

/// The signed-in user. Cheap to clone; holds no token itself.
#[derive(Clone)]
pub struct Session {
    uid: String,
    tokens: Arc<dyn TokenSource>,
}

impl Session {
    pub fn new(uid: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            uid: uid.into(),
            tokens,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Fetches a fresh ID token. Never cached.
    pub async fn id_token(&self) -> Result<String, ClientError> {
        self.tokens.fetch_token().await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("uid", &self.uid).finish()
    }
}

/// Process-wide session handle, injected into every view that needs it.
#[derive(Clone)]
pub struct SessionContext {
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn sign_in(&self, session: Session) {
        info!(uid = %session.uid, "Session started");
        self.tx.send_replace(Some(session));
    }

    pub fn sign_out(&self) {
        if let Some(previous) = self.tx.send_replace(None) {
            info!(uid = %previous.uid, "Session ended");
        }
    }

    pub fn subscribe(&self) -> SessionSubscription {
        debug!(
            subscribers = self.tx.receiver_count() + 1,
            "Subscribing to session changes"
        );
        SessionSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

/// One listener for session changes. Dropping it unsubscribes.
pub struct SessionSubscription {
    rx: watch::Receiver<Option<Session>>,
}

impl SessionSubscription {
    /// The session as of the last observed notification.
    pub fn current(&mut self) -> Option<Session> {
        self.rx.borrow_and_update().clone()
    }

    /// Waits for the next session change. Returns `false` once the context is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Auth guard: the current session, or `Unauthenticated` so the caller can
/// send the user to sign in.
pub fn require_session(ctx: &SessionContext) -> Result<Session, ClientError> {
    ctx.current().ok_or(ClientError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(uid: &str) -> Session {
        Session::new(uid, Arc::new(StaticTokenSource::new("tok")))
    }

    #[tokio::test]
    async fn test_subscription_sees_sign_in_and_sign_out() {
        let ctx = SessionContext::new();
        let mut sub = ctx.subscribe();
        assert!(sub.current().is_none());

        ctx.sign_in(session("u1"));
        assert!(sub.changed().await);
        assert_eq!(sub.current().unwrap().uid(), "u1");

        ctx.sign_out();
        assert!(sub.changed().await);
        assert!(sub.current().is_none());
    }

    #[tokio::test]
    async fn test_changed_returns_false_when_context_dropped() {
        let ctx = SessionContext::new();
        let mut sub = ctx.subscribe();
        drop(ctx);
        assert!(!sub.changed().await);
    }

    #[tokio::test]
    async fn test_id_token_is_fetched_from_source() {
        let s = session("u1");
        assert_eq!(s.id_token().await.unwrap(), "tok");
    }

    #[tokio::test]
    async fn test_command_token_source_trims_stdout() {
        let source = CommandTokenSource::new("printf '  fresh-token\\n'");
        assert_eq!(source.fetch_token().await.unwrap(), "fresh-token");
    }

    #[tokio::test]
    async fn test_command_token_source_rejects_failure_and_empty_output() {
        assert!(matches!(
            CommandTokenSource::new("exit 3").fetch_token().await,
            Err(ClientError::Token(_))
        ));
        assert!(matches!(
            CommandTokenSource::new("true").fetch_token().await,
            Err(ClientError::Token(_))
        ));
    }

    #[test]
    fn test_require_session() {
        let ctx = SessionContext::new();
        assert!(matches!(
            require_session(&ctx),
            Err(ClientError::Unauthenticated)
        ));
        ctx.sign_in(session("u2"));
        assert_eq!(require_session(&ctx).unwrap().uid(), "u2");
    }
}
