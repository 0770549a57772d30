use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use storage::SessionStore;
use tracing::{debug, error, info, warn};

use crate::{
    error::InitError,
    silhouette::SilhouetteResource,
    state::{GameEnding, SessionState},
    transport::GameApi,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitStatus {
    Ready,
    /// Initialization already ran (or is running) for this controller.
    AlreadyStarted,
    /// Logged and swallowed; the session stays unplayable.
    Failed(String),
}

/// Establishes the one authoritative session and owns its token and
/// silhouette for the session's lifetime.
pub struct SessionController {
    api: Arc<dyn GameApi>,
    store: Arc<dyn SessionStore>,
    resource_dir: PathBuf,
    started: AtomicBool,
}

impl SessionController {
    pub fn new(
        api: Arc<dyn GameApi>,
        store: Arc<dyn SessionStore>,
        resource_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            api,
            store,
            resource_dir: resource_dir.into(),
            started: AtomicBool::new(false),
        }
    }

    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub async fn initialize(&self, session: &mut SessionState) -> InitStatus {
        // Latch before the first await so re-entrant startup never negotiates twice.
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("session: initialize skipped, already started");
            return InitStatus::AlreadyStarted;
        }

        match self.establish(session).await {
            Ok(()) => InitStatus::Ready,
            Err(err) => {
                error!("session: initialization failed: {err}");
                self.release_silhouette(session);
                session.clear_territories();
                InitStatus::Failed(err.to_string())
            }
        }
    }

    async fn establish(&self, session: &mut SessionState) -> Result<(), InitError> {
        let stored = match self.store.load_session_token().await {
            Ok(stored) => stored,
            Err(err) => {
                warn!("session: could not read stored token, starting fresh: {err:#}");
                None
            }
        };

        let token = self
            .api
            .negotiate_session(stored.as_ref())
            .await
            .map_err(InitError::Negotiate)?;

        match &stored {
            Some(previous) if *previous == token => {
                info!("session: resumed session={token}");
            }
            Some(previous) => {
                info!("session: service replaced session previous={previous} session={token}");
            }
            None => info!("session: created session={token}"),
        }

        if let Err(err) = self.store.save_session_token(&token).await {
            warn!("session: failed to persist token session={token}: {err:#}");
        }
        session.set_token(token);

        let payload = self
            .api
            .fetch_silhouette()
            .await
            .map_err(InitError::FetchSilhouette)?;
        let resource = SilhouetteResource::materialize(&self.resource_dir, payload)?;
        info!(
            "session: silhouette stored bytes={} content_type={}",
            resource.byte_len(),
            resource.content_type().unwrap_or("unspecified")
        );
        session.replace_silhouette(resource);

        let catalog = self
            .api
            .fetch_territories()
            .await
            .map_err(InitError::Territories)?;
        info!("session: ready territories={}", catalog.len());
        session.set_territories(catalog);

        Ok(())
    }

    /// Ends the session: a win forgets the stored token, any ending frees the
    /// silhouette.
    pub async fn conclude(&self, session: &mut SessionState, ending: GameEnding) {
        match ending {
            GameEnding::Solved => match self.store.clear_session_token().await {
                Ok(()) => info!("session: solved, stored token invalidated"),
                Err(err) => warn!("session: failed to invalidate stored token: {err:#}"),
            },
            GameEnding::LimitReached => {
                info!("session: guess limit reached, stored token retained");
            }
        }
        self.release_silhouette(session);
    }

    pub fn release_silhouette(&self, session: &mut SessionState) {
        if let Some(resource) = session.take_silhouette() {
            if let Err(err) = resource.release() {
                warn!("session: failed to release silhouette: {err}");
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
