//! Interaction Controller
//!
//! One [`Annotator`] per annotatable container. It turns pointer and keyboard
//! events into selection captures, validates and stores new highlights, shows
//! the rejection cue, and drives reconciliation through its timers. Several
//! annotators may share one [`SharedStore`]; each reads and writes only its
//! own scope.

use std::collections::HashSet;
use std::time::Instant;

use crate::anchor::{self, Anchor};
use crate::config::HighlightConfig;
use crate::dom::{DocumentAdapter, DomRange, NodeId, SpanMark};
use crate::error::{HighlightError, Result};
use crate::highlights::{Highlight, NewHighlight, ScopeKey, SharedStore};
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crate::scheduler::{Debouncer, DelayQueue};
use crate::validator::{Rejection, SelectionValidator};

const CUE_STYLE: &str = "background-color: rgba(239, 68, 68, 0.3); transition: opacity 0.5s ease;";

/// A key press with its modifier state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStroke {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyStroke {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ctrl: false,
            meta: false,
        }
    }

    pub fn ctrl(key: &str) -> Self {
        Self {
            ctrl: true,
            ..Self::new(key)
        }
    }

    pub fn meta(key: &str) -> Self {
        Self {
            meta: true,
            ..Self::new(key)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Pointer pressed inside the container
    PointerDown,
    /// Pointer released inside the container
    PointerUp,
    /// Key pressed anywhere on the page
    KeyDown(KeyStroke),
}

/// What handling an event led to
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Not listening, or the event has no binding
    Ignored,
    SelectionStarted,
    /// Pointer released; the selection is shown in the toolbar when valid
    SelectionCaptured(Option<CapturedSelection>),
    Created(Highlight),
    Rejected(Rejection),
}

/// A validated selection ready to become a highlight
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedSelection {
    pub range: DomRange,
    /// Trimmed selection text
    pub text: String,
    pub anchor: Anchor,
}

pub struct Annotator {
    scope: ScopeKey,
    store: SharedStore,
    config: HighlightConfig,
    container: Option<NodeId>,
    active: bool,
    is_selecting: bool,
    current_selection: Option<CapturedSelection>,
    debouncer: Debouncer,
    cues: DelayQueue,
    /// Store revision the painted view was last reconciled against
    observed_revision: Option<u64>,
}

impl Annotator {
    /// Create an annotator for `scope`. It starts active and detached.
    pub fn new(scope: ScopeKey, store: SharedStore, config: HighlightConfig) -> Self {
        let debouncer = Debouncer::new(config.timing.reconcile_debounce);
        let cues = DelayQueue::new(config.timing.cue_revert_delay);
        Self {
            scope,
            store,
            config,
            container: None,
            active: true,
            is_selecting: false,
            current_selection: None,
            debouncer,
            cues,
            observed_revision: None,
        }
    }

    pub fn scope(&self) -> &ScopeKey {
        &self.scope
    }

    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_selecting(&self) -> bool {
        self.is_selecting
    }

    /// Whether event bindings are installed
    pub fn is_listening(&self) -> bool {
        self.active && self.container.is_some()
    }

    pub fn current_selection(&self) -> Option<&CapturedSelection> {
        self.current_selection.as_ref()
    }

    /// Bind to `container` and schedule the first reconciliation pass.
    /// Attaching elsewhere first detaches from the previous container.
    pub fn attach_to<D: DocumentAdapter + ?Sized>(
        &mut self,
        doc: &mut D,
        container: NodeId,
        now: Instant,
    ) -> Result<()> {
        if doc.is_text(container) {
            return Err(HighlightError::InvalidContainer(
                "container must be an element".to_string(),
            ));
        }
        if self.container.is_some_and(|current| current != container) {
            self.detach(doc);
        }
        self.container = Some(container);
        self.observed_revision = None;
        if self.active {
            self.debouncer.request(now);
        }
        tracing::debug!("Annotator attached for submission {}", self.scope.submission_id);
        Ok(())
    }

    /// Unbind from the container and remove everything painted on it.
    /// Stored records are untouched.
    pub fn detach<D: DocumentAdapter + ?Sized>(&mut self, doc: &mut D) {
        self.clear_visuals(doc);
        self.container = None;
        self.observed_revision = None;
    }

    /// Toggle annotation mode. Turning it off strips every painted span
    /// immediately; turning it on schedules a pass.
    pub fn set_active<D: DocumentAdapter + ?Sized>(&mut self, doc: &mut D, active: bool, now: Instant) {
        if self.active == active {
            return;
        }
        self.active = active;
        if active {
            self.observed_revision = None;
            if self.container.is_some() {
                self.debouncer.request(now);
            }
        } else {
            self.clear_visuals(doc);
        }
    }

    pub fn handle_event<D: DocumentAdapter + ?Sized>(
        &mut self,
        doc: &mut D,
        event: InputEvent,
        now: Instant,
    ) -> EventOutcome {
        if !self.is_listening() {
            return EventOutcome::Ignored;
        }
        match event {
            InputEvent::PointerDown => {
                self.is_selecting = true;
                // The new selection does not exist yet, so a pending pass can
                // repaint without invalidating it.
                if self.debouncer.pending() {
                    self.debouncer.cancel();
                    self.reconcile_now(doc);
                }
                EventOutcome::SelectionStarted
            }
            InputEvent::PointerUp => {
                self.is_selecting = false;
                self.current_selection = self.capture_selection(doc).ok();
                EventOutcome::SelectionCaptured(self.current_selection.clone())
            }
            InputEvent::KeyDown(stroke) => {
                if !(stroke.ctrl || stroke.meta) {
                    return EventOutcome::Ignored;
                }
                let select_after = match stroke.key.as_str() {
                    "h" => false,
                    "j" => true,
                    _ => return EventOutcome::Ignored,
                };
                match self.create_highlight_from_current_selection(doc, now) {
                    Ok(highlight) => {
                        if select_after {
                            self.store.write().select(Some(&highlight.id));
                        }
                        EventOutcome::Created(highlight)
                    }
                    Err(rejection) => EventOutcome::Rejected(rejection),
                }
            }
        }
    }

    /// Read the native selection, validate it and encode its anchor
    pub fn capture_selection<D: DocumentAdapter + ?Sized>(
        &self,
        doc: &D,
    ) -> std::result::Result<CapturedSelection, Rejection> {
        let container = self.container.ok_or(Rejection::OutsideContainer)?;
        let range = doc.selection().ok_or(Rejection::Empty)?;

        SelectionValidator::new(&self.config.policy, &self.config.markup)
            .validate(doc, &range, container)?;

        let anchor = anchor::encode(doc, &range, container, &self.config.markup)
            .ok_or(Rejection::Unanchorable)?;
        // Painted spans were checked by the validator; stored highlights still
        // waiting for a reconcile pass only exist as anchors.
        if self.overlaps_unpainted(doc, container, &anchor) {
            return Err(Rejection::OverlapsHighlight);
        }
        Ok(CapturedSelection {
            range,
            text: doc.range_text(&range).trim().to_string(),
            anchor,
        })
    }

    /// Validate the native selection and store it as a highlight in the
    /// active color. On rejection the attempted selection is tinted briefly;
    /// either way the native selection is cleared.
    pub fn create_highlight_from_current_selection<D: DocumentAdapter + ?Sized>(
        &mut self,
        doc: &mut D,
        now: Instant,
    ) -> std::result::Result<Highlight, Rejection> {
        let captured = match self.capture_selection(doc) {
            Ok(captured) => captured,
            Err(rejection) => {
                tracing::warn!("Highlight rejected: {}", rejection);
                if let Some(range) = doc.selection() {
                    self.show_cue(doc, &range, now);
                }
                doc.clear_selection();
                self.current_selection = None;
                return Err(rejection);
            }
        };

        let container_selector = self
            .container
            .and_then(|c| doc.tag(c))
            .unwrap_or("div")
            .to_string();
        let highlight = {
            let mut store = self.store.write();
            let color = store.active_color().to_string();
            store.add(NewHighlight {
                scope: self.scope.clone(),
                color,
                text: captured.text,
                anchor: captured.anchor,
                container_selector,
            })
        };

        doc.clear_selection();
        self.current_selection = None;
        self.debouncer.request(now);
        Ok(highlight)
    }

    /// Schedule a reconciliation pass, e.g. after the host re-rendered the
    /// container's content
    pub fn request_reconcile(&mut self, now: Instant) {
        if self.is_listening() {
            self.debouncer.request(now);
        }
    }

    /// Advance the timers: revert expired cues, notice store changes and run
    /// the pass once the debounce window has elapsed.
    pub fn tick<D: DocumentAdapter + ?Sized>(
        &mut self,
        doc: &mut D,
        now: Instant,
    ) -> Option<ReconcileOutcome> {
        for cue in self.cues.drain_expired(now) {
            doc.unwrap_span(cue);
        }
        if !self.is_listening() {
            return None;
        }

        let revision = self.store.read().revision();
        if self.observed_revision != Some(revision) && !self.debouncer.pending() {
            self.debouncer.request(now);
        }
        if self.debouncer.take_due(now) {
            self.reconcile_now(doc)
        } else {
            None
        }
    }

    /// Run a pass immediately and evict whatever no longer resolves
    pub fn reconcile_now<D: DocumentAdapter + ?Sized>(&mut self, doc: &mut D) -> Option<ReconcileOutcome> {
        let container = self.container.filter(|_| self.active)?;
        let highlights = self.store.read().select_for_scope(&self.scope);

        let outcome = Reconciler::new(&self.config.policy, &self.config.markup)
            .reconcile(doc, container, &highlights);

        let evicted = outcome.evicted_ids();
        let mut store = self.store.write();
        if !evicted.is_empty() {
            tracing::info!("Removing {} invalid highlights", evicted.len());
            store.remove(&evicted);
        }
        if matches!(outcome, ReconcileOutcome::Completed { .. }) {
            self.observed_revision = Some(store.revision());
        }
        Some(outcome)
    }

    pub fn get_highlights(&self) -> Vec<Highlight> {
        self.store.read().select_for_scope(&self.scope)
    }

    pub fn active_color(&self) -> String {
        self.store.read().active_color().to_string()
    }

    pub fn set_active_color(&self, color: &str) -> Result<()> {
        self.store.write().set_active_color(color)
    }

    pub fn available_colors(&self) -> Vec<String> {
        self.store.read().available_colors().to_vec()
    }

    fn show_cue<D: DocumentAdapter + ?Sized>(&mut self, doc: &mut D, range: &DomRange, now: Instant) {
        let mark = SpanMark::span()
            .with_attribute("class", self.config.markup.cue_class.clone())
            .with_attribute("style", CUE_STYLE);
        match doc.wrap_range(range, &mark) {
            Ok(span) => self.cues.push(span, now),
            Err(e) => tracing::warn!("Could not show selection feedback: {}", e),
        }
    }

    fn overlaps_unpainted<D: DocumentAdapter + ?Sized>(
        &self,
        doc: &D,
        container: NodeId,
        anchor: &Anchor,
    ) -> bool {
        let id_attribute = self.config.markup.highlight_id_attribute.as_str();
        let painted: HashSet<&str> = doc
            .descendants(container)
            .into_iter()
            .filter_map(|node| doc.attribute(node, id_attribute))
            .collect();
        self.store
            .read()
            .select_for_scope(&self.scope)
            .iter()
            .filter(|h| !painted.contains(h.id.as_str()))
            .any(|h| h.anchor.overlaps(anchor))
    }

    fn clear_visuals<D: DocumentAdapter + ?Sized>(&mut self, doc: &mut D) {
        self.debouncer.cancel();
        // Cues may sit outside the container, where strip never looks
        for cue in self.cues.drain_all() {
            doc.unwrap_span(cue);
        }
        self.is_selecting = false;
        self.current_selection = None;
        if let Some(container) = self.container {
            let removed = Reconciler::new(&self.config.policy, &self.config.markup)
                .strip(doc, container);
            tracing::debug!("Stripped {} highlight spans", removed);
        }
    }
}
