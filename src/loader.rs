//! Paginated list loading.
//!
//! A [`PagedLoader`] owns the accumulated items of one list and is the only
//! writer of its [`PageState`]. Readers subscribe to immutable snapshots.
//! At most one page request is outstanding at a time: the `Loading` phase is
//! checked and set under the same lock that issues the request.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::pages::PageSource;
use crate::types::Page;

/// Snapshot of a list as seen by a renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum PageState<T> {
    /// Nothing requested yet.
    Idle,
    Loading,
    /// The last request failed. Accumulated items are kept by the loader.
    Error,
    Success {
        items: Arc<[T]>,
        next_cursor: Option<String>,
    },
}

impl<T> PageState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, PageState::Loading)
    }

    /// Items carried by a `Success` snapshot; empty otherwise.
    pub fn items(&self) -> &[T] {
        match self {
            PageState::Success { items, .. } => items,
            _ => &[],
        }
    }
}

/// Passive observation of a rendered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPosition {
    /// Index of the last item on screen, `None` when nothing is visible.
    pub last_visible_index: Option<usize>,
    pub total_items: usize,
}

impl ScrollPosition {
    pub fn new(last_visible_index: Option<usize>, total_items: usize) -> Self {
        Self { last_visible_index, total_items }
    }

    pub fn is_bottom_reached(&self) -> bool {
        match self.last_visible_index {
            Some(last) if self.total_items > 0 => last >= self.total_items - 1,
            _ => false,
        }
    }
}

/// What a loader call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page arrived and was appended.
    Loaded { appended: usize },
    /// The request failed; state is now `Error`.
    Failed,
    /// No request was issued.
    Ignored,
    /// A request was issued but its result was dropped (superseded or closed).
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Loading,
    Success,
    Error,
}

struct Inner<T> {
    phase: Phase,
    items: Vec<T>,
    next_cursor: Option<String>,
    exhausted: bool,
    // Cursor of the request in flight, or of the one that last failed.
    pending: Option<String>,
    inflight: Option<CancellationToken>,
}

struct Ticket {
    cursor: Option<String>,
    cancel: CancellationToken,
}

pub struct PagedLoader<S: PageSource> {
    source: S,
    inner: Mutex<Inner<S::Item>>,
    state_tx: watch::Sender<PageState<S::Item>>,
    lifetime: CancellationToken,
}

impl<S: PageSource> PagedLoader<S> {
    pub fn new(source: S) -> Self {
        Self::with_cancellation(source, &CancellationToken::new())
    }

    /// Bind the loader to a consumer's lifetime: once `parent` is cancelled,
    /// in-flight results are discarded and further calls are ignored.
    pub fn with_cancellation(source: S, parent: &CancellationToken) -> Self {
        let (state_tx, _) = watch::channel(PageState::Idle);
        Self {
            source,
            inner: Mutex::new(Inner {
                phase: Phase::Idle,
                items: Vec::new(),
                next_cursor: None,
                exhausted: false,
                pending: None,
                inflight: None,
            }),
            state_tx,
            lifetime: parent.child_token(),
        }
    }

    pub fn source(&self) -> &S { &self.source }

    pub fn subscribe(&self) -> watch::Receiver<PageState<S::Item>> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> PageState<S::Item> {
        self.state_tx.borrow().clone()
    }

    /// Everything accumulated so far, whatever the current phase.
    pub fn items(&self) -> Vec<S::Item> {
        self.lock().items.clone()
    }

    /// False once a page came back without a next cursor.
    pub fn has_more(&self) -> bool {
        !self.lock().exhausted
    }

    pub fn is_closed(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    /// Tear down: pending results are dropped, later calls are no-ops.
    pub fn close(&self) {
        debug!("loader closed");
        self.lifetime.cancel();
    }

    /// Explicit (re)load from the first page. Clears accumulated items and
    /// supersedes any request in flight.
    pub async fn load(&self) -> LoadOutcome {
        let ticket = {
            let mut inner = self.lock();
            if self.is_closed() {
                return LoadOutcome::Ignored;
            }
            if let Some(prev) = inner.inflight.take() {
                debug!("reload supersedes in-flight request");
                prev.cancel();
            }
            inner.items.clear();
            inner.next_cursor = None;
            inner.exhausted = false;
            self.begin(&mut inner, None)
        };
        self.run(ticket).await
    }

    /// Re-issue the request that failed, keeping accumulated items.
    pub async fn retry(&self) -> LoadOutcome {
        let ticket = {
            let mut inner = self.lock();
            if self.is_closed() || inner.phase != Phase::Error {
                return LoadOutcome::Ignored;
            }
            let cursor = inner.pending.clone();
            self.begin(&mut inner, cursor)
        };
        self.run(ticket).await
    }

    /// Bottom-reached action: fetch the page after the last one loaded.
    pub async fn load_next_page(&self) -> LoadOutcome {
        let ticket = {
            let mut inner = self.lock();
            if self.is_closed() {
                return LoadOutcome::Ignored;
            }
            let phase = inner.phase;
            match phase {
                Phase::Loading | Phase::Error => {
                    debug!(?phase, "next page ignored");
                    return LoadOutcome::Ignored;
                }
                Phase::Success if inner.exhausted => {
                    debug!("next page ignored, list exhausted");
                    return LoadOutcome::Ignored;
                }
                Phase::Idle => self.begin(&mut inner, None),
                Phase::Success => {
                    let cursor = inner.next_cursor.clone();
                    self.begin(&mut inner, cursor)
                }
            }
        };
        self.run(ticket).await
    }

    /// Feed a scroll observation; loads the next page when the end is visible.
    pub async fn on_scroll(&self, position: ScrollPosition) -> LoadOutcome {
        if !position.is_bottom_reached() {
            return LoadOutcome::Ignored;
        }
        self.load_next_page().await
    }

    fn begin(&self, inner: &mut Inner<S::Item>, cursor: Option<String>) -> Ticket {
        let cancel = self.lifetime.child_token();
        inner.phase = Phase::Loading;
        inner.pending = cursor.clone();
        inner.inflight = Some(cancel.clone());
        self.state_tx.send_replace(PageState::Loading);
        debug!(cursor = ?cursor, "requesting page");
        Ticket { cursor, cancel }
    }

    async fn run(&self, ticket: Ticket) -> LoadOutcome {
        let result = tokio::select! {
            biased;
            _ = ticket.cancel.cancelled() => {
                debug!(cursor = ?ticket.cursor, "request cancelled");
                return LoadOutcome::Discarded;
            }
            r = self.source.fetch_page(ticket.cursor.as_deref()) => r,
        };
        self.complete(&ticket, result)
    }

    fn complete(&self, ticket: &Ticket, result: Result<Page<S::Item>, FetchError>) -> LoadOutcome {
        let mut inner = self.lock();
        // Checked under the lock so a concurrent reload or close wins.
        if ticket.cancel.is_cancelled() {
            debug!(cursor = ?ticket.cursor, "stale page dropped");
            return LoadOutcome::Discarded;
        }
        inner.inflight = None;
        match result {
            Ok(page) => {
                let next = page.next_cursor().map(str::to_string);
                let appended = page.results.len();
                inner.items.extend(page.results);
                inner.exhausted = next.is_none();
                inner.next_cursor = next.clone();
                inner.pending = None;
                inner.phase = Phase::Success;
                info!(appended, total = inner.items.len(), has_more = !inner.exhausted, "page loaded");
                self.state_tx.send_replace(PageState::Success {
                    items: Arc::from(inner.items.as_slice()),
                    next_cursor: next,
                });
                LoadOutcome::Loaded { appended }
            }
            Err(e) => {
                warn!(cursor = ?ticket.cursor, error = %e, "page load failed");
                inner.phase = Phase::Error;
                self.state_tx.send_replace(PageState::Error);
                LoadOutcome::Failed
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<S::Item>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: PageSource> Drop for PagedLoader<S> {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}
