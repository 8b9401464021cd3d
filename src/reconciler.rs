//! DOM Reconciler
//!
//! Keeps a container's painted highlights in line with the stored records for
//! its scope. A pass strips everything the highlighter painted, re-resolves
//! every anchor against the clean tree, paints the ones that still fit and
//! reports the rest for eviction.

use std::cmp::Ordering;
use std::fmt;

use crate::anchor;
use crate::config::{MarkupConventions, SelectionPolicy};
use crate::dom::{classify, DocumentAdapter, DomRange, NodeId, SpanMark, WrapError};
use crate::highlights::Highlight;

/// Attribute on the container marking a pass in flight
pub const RESTORING_ATTRIBUTE: &str = "data-restoring";

/// Why a stored highlight was dropped
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvictionReason {
    /// A path step no longer exists
    Unresolvable,
    /// The resolved node is shorter than the recorded offset
    OffsetOutOfBounds,
    /// The text at the anchor changed too much
    TextDrift { similarity: f64 },
    /// The anchor resolves to an empty range
    Collapsed,
    /// The range could not be wrapped
    WrapFailed(WrapError),
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionReason::Unresolvable => write!(f, "anchor path no longer resolves"),
            EvictionReason::OffsetOutOfBounds => write!(f, "offset beyond node length"),
            EvictionReason::TextDrift { similarity } => {
                write!(f, "text drifted (similarity {:.2})", similarity)
            }
            EvictionReason::Collapsed => write!(f, "range collapsed"),
            EvictionReason::WrapFailed(e) => write!(f, "wrap failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Eviction {
    pub id: String,
    pub reason: EvictionReason,
}

/// Why a pass did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another pass is running on this container
    InProgress,
    /// The container shows highlight markup owned by another renderer
    ExternalMarkup,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    Skipped(SkipReason),
    Completed {
        /// Ids painted, in store order
        painted: Vec<String>,
        evicted: Vec<Eviction>,
    },
}

impl ReconcileOutcome {
    pub fn evicted_ids(&self) -> Vec<String> {
        match self {
            ReconcileOutcome::Completed { evicted, .. } => {
                evicted.iter().map(|e| e.id.clone()).collect()
            }
            ReconcileOutcome::Skipped(_) => Vec::new(),
        }
    }
}

pub struct Reconciler<'a> {
    policy: &'a SelectionPolicy,
    markup: &'a MarkupConventions,
}

impl<'a> Reconciler<'a> {
    pub fn new(policy: &'a SelectionPolicy, markup: &'a MarkupConventions) -> Self {
        Self { policy, markup }
    }

    /// Run one pass over `container` for the given records
    pub fn reconcile<D: DocumentAdapter + ?Sized>(
        &self,
        doc: &mut D,
        container: NodeId,
        highlights: &[Highlight],
    ) -> ReconcileOutcome {
        if doc.attribute(container, RESTORING_ATTRIBUTE) == Some("true") {
            tracing::debug!("Reconciliation already in progress, skipping");
            return ReconcileOutcome::Skipped(SkipReason::InProgress);
        }
        if self.has_external_markup(doc, container) {
            tracing::debug!("Container shows externally managed highlights, skipping");
            return ReconcileOutcome::Skipped(SkipReason::ExternalMarkup);
        }

        doc.set_attribute(container, RESTORING_ATTRIBUTE, "true");
        self.strip(doc, container);

        let mut evicted = Vec::new();
        let mut resolved = Vec::new();
        for highlight in highlights {
            match self.resolve(doc, container, highlight) {
                Ok(range) => resolved.push((highlight, range)),
                Err(reason) => evicted.push(Eviction {
                    id: highlight.id.clone(),
                    reason,
                }),
            }
        }

        // Paint back to front so earlier boundaries survive the text splits
        resolved.sort_by(|(_, a), (_, b)| {
            doc.compare_points(b.start, a.start)
                .unwrap_or(Ordering::Equal)
        });
        let mut painted_ids = Vec::new();
        for (highlight, range) in &resolved {
            match doc.wrap_range(range, &self.highlight_mark(highlight)) {
                Ok(_) => painted_ids.push(highlight.id.clone()),
                Err(e) => {
                    tracing::warn!("Failed to wrap highlight {}: {}", highlight.id, e);
                    evicted.push(Eviction {
                        id: highlight.id.clone(),
                        reason: EvictionReason::WrapFailed(e),
                    });
                }
            }
        }

        doc.set_attribute(container, RESTORING_ATTRIBUTE, "false");

        let painted = highlights
            .iter()
            .filter(|h| painted_ids.contains(&h.id))
            .map(|h| h.id.clone())
            .collect();
        for eviction in &evicted {
            tracing::debug!("Evicting highlight {}: {}", eviction.id, eviction.reason);
        }
        ReconcileOutcome::Completed { painted, evicted }
    }

    /// Remove every highlight span and selection cue below `container`,
    /// leaving normalized text. Returns how many spans were removed.
    pub fn strip<D: DocumentAdapter + ?Sized>(&self, doc: &mut D, container: NodeId) -> usize {
        let spans: Vec<NodeId> = {
            let view: &D = doc;
            view.descendants(container)
                .into_iter()
                .filter(|&n| classify(view, n, self.markup).is_transparent())
                .collect()
        };
        let mut removed = 0;
        for span in spans {
            if doc.unwrap_span(span) {
                removed += 1;
            }
        }
        doc.normalize(container);
        removed
    }

    fn resolve<D: DocumentAdapter + ?Sized>(
        &self,
        doc: &D,
        container: NodeId,
        highlight: &Highlight,
    ) -> Result<DomRange, EvictionReason> {
        let range = anchor::decode(doc, &highlight.anchor, container)
            .ok_or(EvictionReason::Unresolvable)?;

        if range.start.offset > doc.node_length(range.start.node)
            || range.end.offset > doc.node_length(range.end.node)
        {
            return Err(EvictionReason::OffsetOutOfBounds);
        }

        let text = doc.range_text(&range);
        let similarity = text_similarity(text.trim(), &highlight.text);
        if similarity < self.policy.similarity_threshold {
            return Err(EvictionReason::TextDrift { similarity });
        }

        if doc.compare_points(range.start, range.end) != Some(Ordering::Less) {
            return Err(EvictionReason::Collapsed);
        }

        Ok(range)
    }

    fn highlight_mark(&self, highlight: &Highlight) -> SpanMark {
        SpanMark::span()
            .with_attribute("class", self.markup.highlight_class.clone())
            .with_attribute(
                "style",
                format!("background-color: {}; cursor: pointer;", highlight.color),
            )
            .with_attribute(&self.markup.highlight_id_attribute, highlight.id.clone())
            .with_attribute("title", highlight.text.clone())
    }

    fn has_external_markup<D: DocumentAdapter + ?Sized>(&self, doc: &D, container: NodeId) -> bool {
        doc.descendants(container).into_iter().any(|node| {
            doc.attribute(node, "class").is_some_and(|class| {
                self.markup
                    .external_markup_classes
                    .iter()
                    .any(|fragment| class.contains(fragment.as_str()))
            }) && !doc.has_class(node, &self.markup.highlight_class)
        })
    }
}

/// Share of aligned positions holding the same char, relative to the longer
/// text. Equals `min(len)/max(len)` when one text is a prefix of the other.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }
    let matching = a.chars().zip(b.chars()).filter(|(x, y)| x == y).count();
    matching as f64 / len_a.max(len_b) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::Anchor;
    use crate::dom::Document;
    use crate::highlights::{HighlightStore, NewHighlight, ScopeKey, Section};

    fn record(store: &mut HighlightStore, text: &str, path: Vec<usize>, start: usize, end: usize) -> Highlight {
        store.add(NewHighlight {
            scope: ScopeKey::new("sub-1", 0, Section::Overall),
            color: "#FFE066".to_string(),
            text: text.to_string(),
            anchor: Anchor {
                start_container_path: path.clone(),
                start_offset: start,
                end_container_path: path,
                end_offset: end,
            },
            container_selector: "div".to_string(),
        })
    }

    fn run(doc: &mut Document, container: NodeId, highlights: &[Highlight]) -> ReconcileOutcome {
        let policy = SelectionPolicy::default();
        let markup = MarkupConventions::default();
        Reconciler::new(&policy, &markup).reconcile(doc, container, highlights)
    }

    #[test]
    fn test_similarity_threshold_examples() {
        let short = text_similarity("hello", "hello world");
        assert!((short - 5.0 / 11.0).abs() < 1e-9);
        assert!(short < 0.8);

        let close = text_similarity("hello worl", "hello world");
        assert!((close - 10.0 / 11.0).abs() < 1e-9);
        assert!(close >= 0.8);

        assert_eq!(text_similarity("xyz", "def"), 0.0);
        assert_eq!(text_similarity("", "def"), 0.0);
        assert_eq!(text_similarity("same", "same"), 1.0);
    }

    #[test]
    fn test_paints_multiple_highlights_in_one_text_node() {
        let (mut doc, div) = Document::parse_fragment("<div>The quick brown fox</div>").unwrap();
        let mut store = HighlightStore::default();
        let quick = record(&mut store, "quick", vec![0], 4, 9);
        let fox = record(&mut store, "fox", vec![0], 16, 19);

        let outcome = run(&mut doc, div, &[quick.clone(), fox.clone()]);

        assert_eq!(
            outcome,
            ReconcileOutcome::Completed {
                painted: vec![quick.id.clone(), fox.id.clone()],
                evicted: vec![],
            }
        );
        let html = doc.inner_html(div);
        assert!(html.starts_with("The <span class=\"text-highlight\""));
        assert!(html.contains(&format!("data-highlight-id=\"{}\"", quick.id)));
        assert!(html.contains(">quick</span> brown <span"));
        assert!(html.ends_with(">fox</span>"));
        assert_eq!(doc.attribute(div, RESTORING_ATTRIBUTE), Some("false"));
    }

    #[test]
    fn test_repeated_passes_are_stable() {
        let (mut doc, div) = Document::parse_fragment("<div>The quick brown fox</div>").unwrap();
        let mut store = HighlightStore::default();
        let quick = record(&mut store, "quick", vec![0], 4, 9);
        let highlights = vec![quick];

        run(&mut doc, div, &highlights);
        let first = doc.inner_html(div);
        let outcome = run(&mut doc, div, &highlights);

        assert!(outcome.evicted_ids().is_empty());
        assert_eq!(doc.inner_html(div), first);
    }

    #[test]
    fn test_evicts_on_text_drift() {
        let (mut doc, div) = Document::parse_fragment("<div>abc def ghi</div>").unwrap();
        let mut store = HighlightStore::default();
        let def = record(&mut store, "def", vec![0], 4, 7);
        let text = doc.children(div)[0];
        doc.set_text(text, "abc xyz ghi");

        let outcome = run(&mut doc, div, &[def.clone()]);

        match outcome {
            ReconcileOutcome::Completed { painted, evicted } => {
                assert!(painted.is_empty());
                assert_eq!(evicted.len(), 1);
                assert_eq!(evicted[0].id, def.id);
                assert_eq!(evicted[0].reason, EvictionReason::TextDrift { similarity: 0.0 });
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(doc.inner_html(div), "abc xyz ghi");
    }

    #[test]
    fn test_evicts_unresolvable_and_out_of_bounds() {
        let (mut doc, div) = Document::parse_fragment("<div>short</div>").unwrap();
        let mut store = HighlightStore::default();
        let missing = record(&mut store, "gone", vec![4], 0, 4);
        let too_far = record(&mut store, "beyond", vec![0], 3, 9);
        let collapsed = record(&mut store, "", vec![0], 2, 2);

        let outcome = run(&mut doc, div, &[missing.clone(), too_far.clone(), collapsed.clone()]);

        let ReconcileOutcome::Completed { evicted, painted } = outcome else {
            panic!("pass was skipped");
        };
        assert!(painted.is_empty());
        assert_eq!(evicted[0].reason, EvictionReason::Unresolvable);
        assert_eq!(evicted[1].reason, EvictionReason::OffsetOutOfBounds);
        assert!(matches!(
            evicted[2].reason,
            EvictionReason::TextDrift { .. } | EvictionReason::Collapsed
        ));
    }

    #[test]
    fn test_evicts_wrap_failure() {
        let (mut doc, div) = Document::parse_fragment("<div><p>one <b>two</b> three</p></div>").unwrap();
        let mut store = HighlightStore::default();
        let mut crossing = record(&mut store, "one tw", vec![0, 0], 0, 6);
        crossing.anchor.end_container_path = vec![0, 1, 0];
        crossing.anchor.end_offset = 2;

        let outcome = run(&mut doc, div, &[crossing.clone()]);

        let ReconcileOutcome::Completed { evicted, .. } = outcome else {
            panic!("pass was skipped");
        };
        assert_eq!(evicted.len(), 1);
        assert_eq!(
            evicted[0].reason,
            EvictionReason::WrapFailed(WrapError::PartialElement)
        );
        assert_eq!(doc.inner_html(div), "<p>one <b>two</b> three</p>");
    }

    #[test]
    fn test_skips_when_in_progress() {
        let (mut doc, div) = Document::parse_fragment("<div>The quick brown fox</div>").unwrap();
        doc.set_attribute(div, RESTORING_ATTRIBUTE, "true");
        let mut store = HighlightStore::default();
        let quick = record(&mut store, "quick", vec![0], 4, 9);

        let outcome = run(&mut doc, div, &[quick]);

        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::InProgress));
        assert_eq!(doc.inner_html(div), "The quick brown fox");
    }

    #[test]
    fn test_skips_external_markup() {
        let (mut doc, div) = Document::parse_fragment(
            r#"<div>The <span class="bg-red-100 rounded">quick</span> brown fox</div>"#,
        )
        .unwrap();
        let outcome = run(&mut doc, div, &[]);
        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::ExternalMarkup));
    }

    #[test]
    fn test_strip_removes_highlights_and_cues() {
        let (mut doc, div) = Document::parse_fragment(concat!(
            r#"<div><p>The <span class="text-highlight">quick</span> brown "#,
            r#"<span class="invalid-selection-feedback">fox</span></p></div>"#
        ))
        .unwrap();
        let policy = SelectionPolicy::default();
        let markup = MarkupConventions::default();

        let removed = Reconciler::new(&policy, &markup).strip(&mut doc, div);

        assert_eq!(removed, 2);
        assert_eq!(doc.inner_html(div), "<p>The quick brown fox</p>");
        assert_eq!(doc.children(doc.children(div)[0]).len(), 1);
    }
}
