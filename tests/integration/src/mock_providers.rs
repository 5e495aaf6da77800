//! Scripted providers for integration testing
//!
//! A [`ScriptedProvider`] replays a queue of replies, one per call, and
//! repeats a default reply once the queue is drained. Each reply can be
//! delayed to exercise call timeouts.

use async_trait::async_trait;
use claimcheck_core::{HasConfidence, Provider, ProviderError, ProviderResult};
use claimcheck_resilience::SharedProvider;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One scripted reply
#[derive(Debug, Clone)]
pub struct Reply<Resp> {
    /// Result returned by the call
    pub result: ProviderResult<Resp>,
    /// Time spent before returning
    pub delay: Duration,
}

impl<Resp> Reply<Resp> {
    /// Immediate success
    pub fn ok(response: Resp) -> Self {
        Self {
            result: Ok(response),
            delay: Duration::ZERO,
        }
    }

    /// Immediate failure
    pub fn err(error: ProviderError) -> Self {
        Self {
            result: Err(error),
            delay: Duration::ZERO,
        }
    }

    /// Delay this reply
    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Provider replaying scripted replies
pub struct ScriptedProvider<Req, Resp> {
    id: String,
    script: Mutex<VecDeque<Reply<Resp>>>,
    default_reply: Reply<Resp>,
    calls: AtomicUsize,
    health_ok: bool,
    _request: PhantomData<fn(&Req)>,
}

impl<Req, Resp> ScriptedProvider<Req, Resp>
where
    Req: Send + Sync + 'static,
    Resp: HasConfidence + Clone + Send + Sync + 'static,
{
    /// Create a provider that always returns `default_reply`
    pub fn new(id: impl Into<String>, default_reply: Reply<Resp>) -> Self {
        Self {
            id: id.into(),
            script: Mutex::new(VecDeque::new()),
            default_reply,
            calls: AtomicUsize::new(0),
            health_ok: true,
            _request: PhantomData,
        }
    }

    /// Provider that always succeeds with `response`
    pub fn healthy(id: impl Into<String>, response: Resp) -> Self {
        Self::new(id, Reply::ok(response))
    }

    /// Provider that always fails as unavailable
    pub fn down(id: impl Into<String>) -> Self {
        let id = id.into();
        let error = ProviderError::unavailable(&id, "connection refused");
        Self::new(id, Reply::err(error))
    }

    /// Queue replies returned before the default
    #[must_use]
    pub fn then(self, replies: impl IntoIterator<Item = Reply<Resp>>) -> Self {
        self.script.lock().extend(replies);
        self
    }

    /// Make the health probe fail
    #[must_use]
    pub fn with_failing_probe(mut self) -> Self {
        self.health_ok = false;
        self
    }

    /// Number of calls received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Share as a gateway provider
    pub fn shared(self: &Arc<Self>) -> SharedProvider<Req, Resp> {
        Arc::clone(self) as SharedProvider<Req, Resp>
    }
}

#[async_trait]
impl<Req, Resp> Provider for ScriptedProvider<Req, Resp>
where
    Req: Send + Sync + 'static,
    Resp: HasConfidence + Clone + Send + Sync + 'static,
{
    type Request = Req;
    type Response = Resp;

    fn id(&self) -> &str {
        &self.id
    }

    async fn call(&self, _request: &Req) -> ProviderResult<Resp> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone());

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }

    async fn health_check(&self) -> ProviderResult<()> {
        if self.health_ok {
            Ok(())
        } else {
            Err(ProviderError::unavailable(&self.id, "probe failed"))
        }
    }
}

/// Rate-limit error for a provider
pub fn rate_limited(provider: &str) -> ProviderError {
    ProviderError::rate_limited(provider, "429 too many requests")
}
