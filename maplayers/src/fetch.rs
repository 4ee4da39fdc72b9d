//! Récupération paresseuse et mémorisée du payload d'une couche
//!
//! Machine à états : `NotStarted -> Pending -> Resolved | Failed`. La
//! fonction de récupération n'est appelée qu'une fois ; les demandes
//! concurrentes partagent le futur en cours. Un échec reste mémorisé jusqu'à
//! un `reset` explicite.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::error::FetchError;

/// Futur renvoyé par une fonction de récupération
pub type FetchFuture = BoxFuture<'static, Result<Bytes, FetchError>>;

/// Fonction de récupération fournie par le service d'exécution
pub type FetchFn = Arc<dyn Fn() -> FetchFuture + Send + Sync>;

/// Enveloppe une closure asynchrone en `FetchFn`
pub fn fetch_fn<F, Fut>(f: F) -> FetchFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Bytes, FetchError>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Récupération d'un contenu déjà connu
pub fn ready(body: impl Into<Bytes>) -> FetchFn {
    let body: Bytes = body.into();
    fetch_fn(move || futures::future::ready(Ok(body.clone())))
}

/// Étape observable de la récupération
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    NotStarted,
    Pending,
    Resolved,
    Failed,
}

enum FetchState {
    NotStarted,
    Pending(Shared<FetchFuture>),
    Resolved(Bytes),
    Failed(FetchError),
}

struct FetchSlot {
    state: FetchState,
    /// Nombre d'appels à la fonction de récupération
    launches: u64,
}

/// Récupération à exécution unique
pub struct LazyFetch {
    fetch: FetchFn,
    slot: Mutex<FetchSlot>,
}

impl LazyFetch {
    pub fn new(fetch: FetchFn) -> Self {
        Self {
            fetch,
            slot: Mutex::new(FetchSlot {
                state: FetchState::NotStarted,
                launches: 0,
            }),
        }
    }

    /// Retourne le payload, en lançant la récupération au premier appel
    pub async fn get(&self) -> Result<Bytes, FetchError> {
        self.get_attempt(0).await
    }

    /// Comme `get`, mais un échec survenu avant l'essai `attempt` est oublié
    async fn get_attempt(&self, attempt: u64) -> Result<Bytes, FetchError> {
        let pending = {
            let mut slot = self.lock();
            if matches!(slot.state, FetchState::Failed(_)) && slot.launches < attempt {
                debug!(attempt, "Retrying failed payload fetch");
                slot.state = FetchState::NotStarted;
            }
            let in_flight = match &slot.state {
                FetchState::Resolved(body) => return Ok(body.clone()),
                FetchState::Failed(error) => return Err(error.clone()),
                FetchState::Pending(shared) => Some(shared.clone()),
                FetchState::NotStarted => None,
            };
            match in_flight {
                Some(shared) => shared,
                None => {
                    debug!("Starting payload fetch");
                    let shared = (self.fetch)().shared();
                    slot.state = FetchState::Pending(shared.clone());
                    slot.launches += 1;
                    shared
                }
            }
        };

        let result = pending.await;

        let mut slot = self.lock();
        if matches!(slot.state, FetchState::Pending(_)) {
            slot.state = match &result {
                Ok(body) => FetchState::Resolved(body.clone()),
                Err(error) => FetchState::Failed(error.clone()),
            };
        }
        result
    }

    pub fn phase(&self) -> FetchPhase {
        match &self.lock().state {
            FetchState::NotStarted => FetchPhase::NotStarted,
            FetchState::Pending(_) => FetchPhase::Pending,
            FetchState::Resolved(_) => FetchPhase::Resolved,
            FetchState::Failed(_) => FetchPhase::Failed,
        }
    }

    /// Oublie le résultat : le prochain `get` relance la récupération
    pub fn reset(&self) {
        self.lock().state = FetchState::NotStarted;
    }

    /// Expose la récupération mémorisée comme une `FetchFn`
    ///
    /// Utilisé par la fabrique composite pour partager un seul appel entre
    /// ses sous-fabriques, une `FetchFn` par consommateur. Le n-ième appel
    /// d'un consommateur relance une récupération échouée si elle n'a été
    /// tentée que n-1 fois : un consommateur qui réessaie déclenche un seul
    /// nouvel appel, partagé avec les autres.
    pub fn as_fetch_fn(self: &Arc<Self>) -> FetchFn {
        let this = Arc::clone(self);
        let calls = Arc::new(AtomicU64::new(0));
        Arc::new(move || {
            let this = Arc::clone(&this);
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { this.get_attempt(attempt).await }.boxed()
        })
    }

    fn lock(&self) -> MutexGuard<'_, FetchSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for LazyFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyFetch")
            .field("phase", &self.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(body: &'static str, calls: Arc<AtomicUsize>) -> FetchFn {
        fetch_fn(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(Bytes::from_static(body.as_bytes())))
        })
    }

    #[tokio::test]
    async fn test_fetch_invoked_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = LazyFetch::new(counting("{}", calls.clone()));
        assert_eq!(lazy.phase(), FetchPhase::NotStarted);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(lazy.get().await.unwrap(), Bytes::from_static(b"{}"));
        assert_eq!(lazy.get().await.unwrap(), Bytes::from_static(b"{}"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(lazy.phase(), FetchPhase::Resolved);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_pending() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = tokio::sync::oneshot::channel::<Bytes>();
        let rx = Arc::new(Mutex::new(Some(rx)));
        let counter = calls.clone();
        let lazy = LazyFetch::new(fetch_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let rx = rx.lock().unwrap().take();
            async move {
                match rx {
                    Some(rx) => rx.await.map_err(|e| FetchError::new(e.to_string())),
                    None => Err(FetchError::new("fetch called twice")),
                }
            }
        }));

        let first = lazy.get();
        let second = lazy.get();
        let release = async {
            tokio::task::yield_now().await;
            tx.send(Bytes::from_static(b"payload")).unwrap();
        };
        let (a, b, ()) = tokio::join!(first, second, release);

        assert_eq!(a.unwrap(), Bytes::from_static(b"payload"));
        assert_eq!(b.unwrap(), Bytes::from_static(b"payload"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_memoized_until_reset() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let lazy = LazyFetch::new(fetch_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Err(FetchError::new("503")))
        }));

        assert_eq!(lazy.get().await.unwrap_err().message(), "503");
        assert!(lazy.get().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(lazy.phase(), FetchPhase::Failed);

        lazy.reset();
        assert!(lazy.get().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shared_fetch_fn() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = Arc::new(LazyFetch::new(counting("x", calls.clone())));
        let shared = lazy.as_fetch_fn();

        shared().await.unwrap();
        shared().await.unwrap();
        lazy.get().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_consumer_retry_refetches_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let lazy = Arc::new(LazyFetch::new(fetch_fn(move || {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(if call == 0 {
                Err(FetchError::new("timeout"))
            } else {
                Ok(Bytes::from_static(b"ok"))
            })
        })));
        let first = lazy.as_fetch_fn();
        let second = lazy.as_fetch_fn();

        assert!(first().await.is_err());
        assert!(second().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Deuxième essai de chaque consommateur : un seul nouvel appel
        assert_eq!(first().await.unwrap(), Bytes::from_static(b"ok"));
        assert_eq!(second().await.unwrap(), Bytes::from_static(b"ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
