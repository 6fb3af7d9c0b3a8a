// Per-call cancellation and deadline handling for store operations.
use crate::config::AppConfig;
use crate::repositories::error::{StorageError, StorageResult};
use actix_web::{dev::Payload, web, Error as ActixWebError, FromRequest, HttpRequest};
use futures_util::future::{ok, Ready};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Carried into every repository call. Store futures run through [`RequestContext::run`]
/// are dropped as soon as the token is cancelled or the deadline passes; the
/// Postgres repositories also hand the deadline to the server, see
/// `repositories::transaction`.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// No deadline, cancelled only through [`RequestContext::cancel`].
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        RequestContext {
            cancel: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Time left before the deadline; zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn run<T, F>(&self, operation: &'static str, fut: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        if self.cancel.is_cancelled() {
            log::debug!("{} skipped: context already cancelled", operation);
            return Err(StorageError::Cancelled);
        }
        if matches!(self.deadline, Some(deadline) if deadline <= Instant::now()) {
            log::debug!("{} skipped: deadline already passed", operation);
            return Err(StorageError::DeadlineExceeded);
        }

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                log::warn!("{} cancelled by caller", operation);
                Err(StorageError::Cancelled)
            }
            _ = expired => {
                log::warn!("{} aborted: deadline exceeded", operation);
                Err(StorageError::DeadlineExceeded)
            }
            result = fut => result,
        }
    }
}

impl FromRequest for RequestContext {
    type Error = ActixWebError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let timeout = req
            .app_data::<web::Data<AppConfig>>()
            .map(|config| config.request_timeout)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        log::debug!(
            "Request context for {} {} with timeout {:?}",
            req.method(),
            req.path(),
            timeout
        );
        ok(RequestContext::with_timeout(timeout))
    }
}
