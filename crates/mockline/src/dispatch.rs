//! Dispatch engine
//!
//! [`MockAdapter`] is the transport hook installed on an intercepted client.
//! Each call records the request in the ledger, then either settles it from a
//! matching stub or leaves it pending for test code to settle by hand.

use crate::ledger::{RequestLedger, TrackedRequest};
use crate::registry::{Matched, StubRegistry};
use crate::reply::Reply;
use crate::scheduler::Scheduler;
use async_trait::async_trait;
use mockline_http::{settle, Adapter, HttpError, HttpResult, RequestConfig, Response};
use tracing::{debug, warn};

/// Adapter answering requests from a stub registry and request ledger
#[derive(Debug, Clone)]
pub struct MockAdapter {
    ledger: RequestLedger,
    registry: StubRegistry,
    scheduler: Scheduler,
}

impl MockAdapter {
    /// Adapter bound to the given ledger, registry and scheduler
    pub fn new(ledger: RequestLedger, registry: StubRegistry, scheduler: Scheduler) -> Self {
        Self {
            ledger,
            registry,
            scheduler,
        }
    }

    /// Ledger this adapter records into
    pub fn ledger(&self) -> &RequestLedger {
        &self.ledger
    }

    /// Registry this adapter answers from
    pub fn registry(&self) -> &StubRegistry {
        &self.registry
    }

    async fn answer(&self, request: &TrackedRequest, matched: Matched) {
        let Matched { rule, hit } = matched;
        debug!(
            sequence = request.sequence(),
            stub = rule.id,
            reply = ?rule.reply,
            "request matched stub"
        );

        match rule.reply {
            Reply::Static(descriptor) => {
                let response = descriptor.into_response(request.config().clone(), request.request_id());
                self.settle_fresh(request, settle(response));
            }
            Reply::Generator(generate) => {
                let descriptor = generate(request);
                let response = descriptor.into_response(request.config().clone(), request.request_id());
                self.settle_fresh(request, settle(response));
            }
            Reply::Error(descriptor) => {
                let error = descriptor.into_http_error(request.config().clone(), request.request_id());
                self.settle_fresh(request, Err(error));
            }
            Reply::Timeout => {
                // Claim the request now so it cannot be settled by hand while
                // the timeout is pending.
                if let Ok(settler) = request.take_settler() {
                    self.scheduler.wait().await;
                    let error = HttpError::timeout(request.config().clone())
                        .with_request_id(request.request_id());
                    request.deliver(settler, Err(error));
                }
            }
        }

        if let Some(hit) = hit {
            let _ = hit.send(request.clone());
        }
    }

    fn settle_fresh(&self, request: &TrackedRequest, settlement: HttpResult<Response>) {
        // A request is only visible to test code once tracked, and it is
        // answered before this dispatch yields, so it cannot be settled yet.
        if let Err(e) = request.settle_now(settlement) {
            warn!(error = %e, "stub answered an already settled request");
        }
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    async fn dispatch(&self, config: RequestConfig) -> HttpResult<Response> {
        let (request, settlement) = self.ledger.track(config, self.scheduler.clone());
        debug!(
            sequence = request.sequence(),
            method = %request.method(),
            url = request.url(),
            "intercepted request"
        );

        match self.registry.take_match(request.method(), request.url()) {
            Some(matched) => self.answer(&request, matched).await,
            None => debug!(sequence = request.sequence(), "no stub matched, request pending"),
        }
        drop(request);

        match settlement.await {
            Ok(result) => result,
            Err(_) => {
                // Every handle was dropped without settling. Like a request
                // that never gets an answer, stay pending.
                warn!("tracked request abandoned without settlement");
                futures::future::pending::<HttpResult<Response>>().await
            }
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
