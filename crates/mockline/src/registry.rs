//! Stub registry
//!
//! Holds the declared response rules. Lookup precedence when several rules
//! match one request:
//!
//! 1. one-shot rules, in registration order (the oldest fires first and is
//!    consumed);
//! 2. otherwise the most recently registered persistent rule.
//!
//! Registering a rule whose method and URL matcher equal those of an existing
//! persistent rule replaces that rule, whatever the new rule's lifetime.
//! One-shot rules are never replaced.

use crate::ledger::TrackedRequest;
use crate::matcher::{MethodMatcher, UrlMatcher};
use crate::reply::Reply;
use mockline_http::Method;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::debug;

/// How long a rule stays registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubLifetime {
    /// Matches until removed, replaced or the registry is reset
    Persistent,
    /// Consumed by its first match
    Once,
}

/// One declared expectation
#[derive(Debug, Clone)]
pub struct StubRule {
    /// Registration order, unique per registry
    pub id: u64,
    /// Method matcher
    pub method: MethodMatcher,
    /// URL matcher
    pub url: UrlMatcher,
    /// What to answer with
    pub reply: Reply,
    /// Persistent or one-shot
    pub lifetime: StubLifetime,
}

impl StubRule {
    /// Whether this rule answers a request
    pub fn matches(&self, method: &Method, url: &str) -> bool {
        self.method.matches(method) && self.url.matches(url)
    }

    /// Whether this rule is declared for exactly this method and matcher
    pub fn same_key(&self, method: &MethodMatcher, url: &UrlMatcher) -> bool {
        self.method == *method && self.url.same_as(url)
    }
}

/// Resolves with the request that consumed a one-shot stub.
///
/// Resolves to `None` if the stub was removed or the registry reset before
/// any request matched it.
#[derive(Debug)]
#[must_use = "a StubHit does nothing unless awaited"]
pub struct StubHit {
    rx: oneshot::Receiver<TrackedRequest>,
}

impl StubHit {
    /// The consuming request, if the stub has already fired
    pub fn try_hit(&mut self) -> Option<TrackedRequest> {
        self.rx.try_recv().ok()
    }
}

impl Future for StubHit {
    type Output = Option<TrackedRequest>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

#[derive(Debug)]
struct Entry {
    rule: StubRule,
    hit: Option<oneshot::Sender<TrackedRequest>>,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: Vec<Entry>,
    next_id: u64,
}

/// A matched rule, removed from the registry if it was one-shot
#[derive(Debug)]
pub(crate) struct Matched {
    pub rule: StubRule,
    pub hit: Option<oneshot::Sender<TrackedRequest>>,
}

/// Collection of stub rules.
///
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct StubRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl StubRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule, returning it as stored
    pub fn register(
        &self,
        method: impl Into<MethodMatcher>,
        url: impl Into<UrlMatcher>,
        reply: impl Into<Reply>,
        lifetime: StubLifetime,
    ) -> StubRule {
        self.insert(method.into(), url.into(), reply.into(), lifetime, None)
    }

    /// Register a one-shot rule and get notified when it fires
    pub fn register_once(
        &self,
        method: impl Into<MethodMatcher>,
        url: impl Into<UrlMatcher>,
        reply: impl Into<Reply>,
    ) -> StubHit {
        let (tx, rx) = oneshot::channel();
        self.insert(
            method.into(),
            url.into(),
            reply.into(),
            StubLifetime::Once,
            Some(tx),
        );
        StubHit { rx }
    }

    fn insert(
        &self,
        method: MethodMatcher,
        url: UrlMatcher,
        reply: Reply,
        lifetime: StubLifetime,
        hit: Option<oneshot::Sender<TrackedRequest>>,
    ) -> StubRule {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|e| {
            !(e.rule.lifetime == StubLifetime::Persistent && e.rule.same_key(&method, &url))
        });
        let replaced = before - state.entries.len();

        let rule = StubRule {
            id: state.next_id,
            method,
            url,
            reply,
            lifetime,
        };
        state.next_id += 1;
        debug!(
            id = rule.id,
            method = %rule.method,
            url = %rule.url,
            lifetime = ?rule.lifetime,
            replaced,
            "registered stub"
        );
        state.entries.push(Entry {
            rule: rule.clone(),
            hit,
        });
        rule
    }

    /// Find the rule answering a request, consuming it if one-shot
    pub(crate) fn take_match(&self, method: &Method, url: &str) -> Option<Matched> {
        let mut state = self.state.lock();
        let index = Self::match_index(&state.entries, method, url)?;
        let entry = &state.entries[index];
        if entry.rule.lifetime == StubLifetime::Once {
            let entry = state.entries.remove(index);
            Some(Matched {
                rule: entry.rule,
                hit: entry.hit,
            })
        } else {
            Some(Matched {
                rule: entry.rule.clone(),
                hit: None,
            })
        }
    }

    fn match_index(entries: &[Entry], method: &Method, url: &str) -> Option<usize> {
        entries
            .iter()
            .position(|e| e.rule.lifetime == StubLifetime::Once && e.rule.matches(method, url))
            .or_else(|| {
                entries.iter().rposition(|e| {
                    e.rule.lifetime == StubLifetime::Persistent && e.rule.matches(method, url)
                })
            })
    }

    /// The rule that would answer a request, without consuming it
    pub fn find(&self, method: impl Into<Method>, url: &str) -> Option<StubRule> {
        let method = method.into();
        let state = self.state.lock();
        Self::match_index(&state.entries, &method, url).map(|i| state.entries[i].rule.clone())
    }

    /// The rule declared for exactly this method and matcher
    pub fn get(
        &self,
        method: impl Into<MethodMatcher>,
        url: impl Into<UrlMatcher>,
    ) -> Option<StubRule> {
        let (method, url) = (method.into(), url.into());
        self.state
            .lock()
            .entries
            .iter()
            .find(|e| e.rule.same_key(&method, &url))
            .map(|e| e.rule.clone())
    }

    /// Remove every rule declared for this method and matcher, returning how
    /// many were removed
    pub fn remove(&self, method: impl Into<MethodMatcher>, url: impl Into<UrlMatcher>) -> usize {
        let (method, url) = (method.into(), url.into());
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|e| !e.rule.same_key(&method, &url));
        before - state.entries.len()
    }

    /// Number of registered rules
    pub fn count(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether no rules are registered
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Oldest registered rule
    pub fn first(&self) -> Option<StubRule> {
        self.state.lock().entries.first().map(|e| e.rule.clone())
    }

    /// Newest registered rule
    pub fn most_recent(&self) -> Option<StubRule> {
        self.state.lock().entries.last().map(|e| e.rule.clone())
    }

    /// Rule at `index` in registration order
    pub fn at(&self, index: usize) -> Option<StubRule> {
        self.state.lock().entries.get(index).map(|e| e.rule.clone())
    }

    /// Snapshot of every rule in registration order
    pub fn rules(&self) -> Vec<StubRule> {
        self.state.lock().entries.iter().map(|e| e.rule.clone()).collect()
    }

    /// Remove every rule
    pub fn reset(&self) {
        self.state.lock().entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::ResponseDescriptor;
    use proptest::prelude::*;

    fn status(code: u16) -> ResponseDescriptor {
        ResponseDescriptor::new(code)
    }

    fn matched_status(registry: &StubRegistry, method: &str, url: &str) -> Option<u16> {
        registry
            .take_match(&Method::new(method), url)
            .map(|m| match m.rule.reply {
                Reply::Static(d) => d.status,
                other => panic!("unexpected reply {other:?}"),
            })
    }

    #[test]
    fn test_persistent_rules_replace_same_key() {
        let registry = StubRegistry::new();
        registry.register("get", "/users/12346", status(200), StubLifetime::Persistent);
        registry.register("GET", "/users/12346", status(500), StubLifetime::Persistent);

        assert_eq!(registry.count(), 1);
        assert_eq!(matched_status(&registry, "GET", "/users/12346"), Some(500));
        // Persistent rules survive matches
        assert_eq!(matched_status(&registry, "GET", "/users/12346"), Some(500));
    }

    #[test]
    fn test_different_url_or_method_does_not_replace() {
        let registry = StubRegistry::new();
        registry.register("GET", "/users/12346", status(200), StubLifetime::Persistent);
        registry.register("GET", "/users/12345", status(500), StubLifetime::Persistent);
        registry.register("POST", "/users/12346", status(500), StubLifetime::Persistent);

        assert_eq!(registry.count(), 3);
        assert_eq!(matched_status(&registry, "GET", "/users/12346"), Some(200));
    }

    #[test]
    fn test_replacement_takes_new_lifetime() {
        let registry = StubRegistry::new();
        registry.register("GET", "/a", status(200), StubLifetime::Persistent);
        registry.register("GET", "/a", status(201), StubLifetime::Once);

        assert_eq!(registry.count(), 1);
        assert_eq!(matched_status(&registry, "GET", "/a"), Some(201));
        assert_eq!(matched_status(&registry, "GET", "/a"), None);
    }

    #[test]
    fn test_once_rules_are_fifo_and_consumed() {
        let registry = StubRegistry::new();
        registry.register("PUT", "/x", status(201), StubLifetime::Once);
        registry.register("PUT", "/x", status(202), StubLifetime::Once);
        assert_eq!(registry.count(), 2);

        assert_eq!(matched_status(&registry, "PUT", "/x"), Some(201));
        assert_eq!(matched_status(&registry, "PUT", "/x"), Some(202));
        assert_eq!(matched_status(&registry, "PUT", "/x"), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_once_rules_take_precedence_over_persistent() {
        let registry = StubRegistry::new();
        registry.register(MethodMatcher::Any, "/a", status(200), StubLifetime::Persistent);
        registry.register("GET", "/a", status(503), StubLifetime::Once);
        assert_eq!(registry.count(), 2);

        assert_eq!(matched_status(&registry, "GET", "/a"), Some(503));
        assert_eq!(matched_status(&registry, "GET", "/a"), Some(200));
    }

    #[test]
    fn test_most_recent_persistent_wins_across_matchers() {
        let registry = StubRegistry::new();
        registry.register(
            "GET",
            UrlMatcher::pattern(r"/users/\d+").unwrap(),
            status(200),
            StubLifetime::Persistent,
        );
        registry.register("GET", "/users/1", status(404), StubLifetime::Persistent);

        assert_eq!(matched_status(&registry, "GET", "/users/1"), Some(404));
        assert_eq!(matched_status(&registry, "GET", "/users/2"), Some(200));
    }

    #[test]
    fn test_get_and_remove_by_key() {
        let registry = StubRegistry::new();
        registry.register("PUT", "/users/12346", status(204), StubLifetime::Once);
        registry.register("GET", "/users/12346", status(200), StubLifetime::Once);
        registry.register("PUT", "/users/12345", status(204), StubLifetime::Once);
        registry.register("GET", "/users/12345", status(200), StubLifetime::Once);

        assert!(registry.get("PUT", "/users/12345").is_some());
        assert!(registry.get("DELETE", "/users/12345").is_none());

        assert_eq!(registry.remove("PUT", "/users/12345"), 1);
        assert_eq!(registry.count(), 3);
        assert_eq!(registry.remove("PUT", "/users/12345"), 0);
        assert!(registry.find("PUT", "/users/12345").is_none());
        assert!(registry.find("put", "/users/12346").is_some());
    }

    #[test]
    fn test_any_method_rules() {
        let registry = StubRegistry::new();
        registry.register(MethodMatcher::Any, "/a", Reply::Timeout, StubLifetime::Persistent);
        let rule = registry.find("DELETE", "/a").unwrap();
        assert!(rule.reply.is_timeout());
        assert!(registry.find("DELETE", "/b").is_none());
    }

    #[tokio::test]
    async fn test_stub_hit_resolves_none_on_reset() {
        let registry = StubRegistry::new();
        let hit = registry.register_once("GET", "/never", status(200));
        registry.reset();
        assert!(hit.await.is_none());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_ids_follow_registration_order() {
        let registry = StubRegistry::new();
        let a = registry.register("GET", "/a", status(200), StubLifetime::Persistent);
        let b = registry.register("GET", "/b", status(200), StubLifetime::Persistent);
        assert!(a.id < b.id);
        assert_eq!(registry.first().unwrap().id, a.id);
        assert_eq!(registry.most_recent().unwrap().id, b.id);
        assert_eq!(registry.at(1).unwrap().id, b.id);
        assert_eq!(registry.rules().len(), 2);
    }

    proptest! {
        #[test]
        fn prop_once_rules_fire_exactly_once(n in 1usize..16) {
            let registry = StubRegistry::new();
            for _ in 0..n {
                registry.register("GET", "/x", status(200), StubLifetime::Once);
            }
            for remaining in (0..n).rev() {
                prop_assert!(registry.take_match(&Method::new("GET"), "/x").is_some());
                prop_assert_eq!(registry.count(), remaining);
            }
            prop_assert!(registry.take_match(&Method::new("GET"), "/x").is_none());
        }

        #[test]
        fn prop_persistent_duplicates_collapse(statuses in proptest::collection::vec(200u16..600, 1..10)) {
            let registry = StubRegistry::new();
            for s in &statuses {
                registry.register("GET", "/dup", status(*s), StubLifetime::Persistent);
            }
            prop_assert_eq!(registry.count(), 1);
            prop_assert_eq!(matched_status(&registry, "GET", "/dup"), statuses.last().copied());
        }
    }
}
