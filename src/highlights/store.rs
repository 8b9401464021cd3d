//! In-memory highlight store
//!
//! Holds every highlight grouped by submission, the active annotation color
//! and the currently selected highlight. Lists keep insertion order.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use super::types::{Highlight, NewHighlight, ScopeKey};
use crate::config::DEFAULT_PALETTE;
use crate::error::{HighlightError, Result};

/// A store shared by several annotators
pub type SharedStore = Arc<RwLock<HighlightStore>>;

#[derive(Debug, Clone)]
pub struct HighlightStore {
    /// submission id -> highlights in insertion order
    highlights: HashMap<String, Vec<Highlight>>,
    selected: Option<String>,
    active_color: String,
    palette: Vec<String>,
    revision: u64,
}

impl HighlightStore {
    /// Create a store with the given palette; the first color starts active
    pub fn new(palette: Vec<String>) -> Self {
        let palette = if palette.is_empty() {
            DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
        } else {
            palette
        };
        Self {
            highlights: HashMap::new(),
            selected: None,
            active_color: palette[0].clone(),
            palette,
            revision: 0,
        }
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    /// Assign id and timestamps and append to the highlight's submission
    pub fn add(&mut self, new: NewHighlight) -> Highlight {
        let highlight = Highlight::create(new);
        self.highlights
            .entry(highlight.scope.submission_id.clone())
            .or_default()
            .push(highlight.clone());
        self.revision += 1;
        highlight
    }

    /// Remove every highlight whose id is listed; absent ids are ignored.
    /// Returns how many were removed.
    pub fn remove(&mut self, ids: &[String]) -> usize {
        let mut removed = 0;
        for list in self.highlights.values_mut() {
            let before = list.len();
            list.retain(|h| !ids.contains(&h.id));
            removed += before - list.len();
        }
        if self.selected.as_ref().is_some_and(|id| ids.contains(id)) {
            self.selected = None;
        }
        if removed > 0 {
            self.revision += 1;
        }
        removed
    }

    pub fn remove_one(&mut self, id: &str) -> bool {
        self.remove(&[id.to_string()]) > 0
    }

    /// All highlights for a scope, in insertion order
    pub fn select_for_scope(&self, scope: &ScopeKey) -> Vec<Highlight> {
        self.highlights
            .get(&scope.submission_id)
            .map(|list| list.iter().filter(|h| h.in_scope(scope)).cloned().collect())
            .unwrap_or_default()
    }

    /// All highlights of a submission regardless of question or section
    pub fn for_submission(&self, submission_id: &str) -> &[Highlight] {
        self.highlights
            .get(submission_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get(&self, id: &str) -> Option<&Highlight> {
        self.highlights.values().flatten().find(|h| h.id == id)
    }

    /// Set or clear the note attached to a highlight
    pub fn set_comment(&mut self, id: &str, comment: Option<String>) -> Result<&Highlight> {
        let highlight = self
            .highlights
            .values_mut()
            .flatten()
            .find(|h| h.id == id)
            .ok_or_else(|| HighlightError::NotFound(id.to_string()))?;
        highlight.comment = comment.filter(|c| !c.trim().is_empty());
        highlight.updated_at = Utc::now();
        self.revision += 1;
        Ok(&*highlight)
    }

    /// Swap a scope's list for records loaded elsewhere. Records belonging
    /// to another scope are dropped.
    pub fn replace_scope(&mut self, scope: &ScopeKey, records: Vec<Highlight>) {
        let list = self.highlights.entry(scope.submission_id.clone()).or_default();
        list.retain(|h| !h.in_scope(scope));
        let total = records.len();
        list.extend(records.into_iter().filter(|h| h.in_scope(scope)));
        let kept = list.iter().filter(|h| h.in_scope(scope)).count();
        if kept < total {
            tracing::warn!(
                "Dropped {} loaded highlights outside scope {}/{}/{}",
                total - kept,
                scope.submission_id,
                scope.question_index,
                scope.section
            );
        }
        self.revision += 1;
    }

    pub fn clear_submission(&mut self, submission_id: &str) {
        if let Some(list) = self.highlights.remove(submission_id) {
            if self
                .selected
                .as_ref()
                .is_some_and(|id| list.iter().any(|h| &h.id == id))
            {
                self.selected = None;
            }
            self.revision += 1;
        }
    }

    pub fn clear_all(&mut self) {
        self.highlights.clear();
        self.selected = None;
        self.revision += 1;
    }

    /// Mark a highlight as selected (e.g. for comment editing)
    pub fn select(&mut self, id: Option<&str>) {
        self.selected = id.map(str::to_string);
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Color the next highlight will get
    pub fn active_color(&self) -> &str {
        &self.active_color
    }

    /// Change the color of the next highlight; existing ones are untouched
    pub fn set_active_color(&mut self, color: &str) -> Result<()> {
        let entry = self
            .palette
            .iter()
            .find(|c| c.eq_ignore_ascii_case(color))
            .ok_or_else(|| HighlightError::UnknownColor(color.to_string()))?;
        self.active_color = entry.clone();
        Ok(())
    }

    pub fn available_colors(&self) -> &[String] {
        &self.palette
    }

    /// Bumped on every change to the stored highlights
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.highlights.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HighlightStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::Anchor;
    use crate::highlights::Section;

    fn new_highlight(scope: &ScopeKey, text: &str) -> NewHighlight {
        NewHighlight {
            scope: scope.clone(),
            color: "#FFE066".to_string(),
            text: text.to_string(),
            anchor: Anchor {
                start_container_path: vec![0],
                start_offset: 0,
                end_container_path: vec![0],
                end_offset: text.chars().count(),
            },
            container_selector: "div".to_string(),
        }
    }

    #[test]
    fn test_add_and_select_for_scope() {
        let mut store = HighlightStore::default();
        let scope = ScopeKey::new("sub-1", 0, Section::Overall);
        let other_question = ScopeKey::new("sub-1", 1, Section::Overall);
        let other_section = ScopeKey::new("sub-1", 0, Section::Grammar);

        let first = store.add(new_highlight(&scope, "first"));
        store.add(new_highlight(&other_question, "elsewhere"));
        store.add(new_highlight(&other_section, "grammar"));
        let second = store.add(new_highlight(&scope, "second"));

        let listed = store.select_for_scope(&scope);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
        assert_eq!(store.len(), 4);
        assert_eq!(store.for_submission("sub-1").len(), 4);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = HighlightStore::default();
        let scope = ScopeKey::new("sub-1", 0, Section::Overall);
        let a = store.add(new_highlight(&scope, "aa"));
        let b = store.add(new_highlight(&scope, "bb"));
        let ids = vec![a.id.clone(), "missing".to_string()];

        assert_eq!(store.remove(&ids), 1);
        let once = store.select_for_scope(&scope);
        let revision = store.revision();

        assert_eq!(store.remove(&ids), 0);
        assert_eq!(store.select_for_scope(&scope), once);
        assert_eq!(store.revision(), revision);
        assert_eq!(once.len(), 1);
        assert_eq!(once[0].id, b.id);
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut store = HighlightStore::default();
        let scope = ScopeKey::new("sub-1", 0, Section::Overall);
        let a = store.add(new_highlight(&scope, "aa"));
        store.select(Some(&a.id));
        assert_eq!(store.selected(), Some(a.id.as_str()));

        assert!(store.remove_one(&a.id));
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_active_color_is_independent() {
        let mut store = HighlightStore::default();
        let scope = ScopeKey::new("sub-1", 0, Section::Overall);
        store.add(new_highlight(&scope, "aa"));
        let revision = store.revision();

        store.set_active_color("#99ccff").unwrap();
        store.set_active_color("#FF9999").unwrap();

        assert_eq!(store.active_color(), "#FF9999");
        assert_eq!(store.revision(), revision);
        assert_eq!(store.select_for_scope(&scope)[0].color, "#FFE066");
    }

    #[test]
    fn test_active_color_must_be_in_palette() {
        let mut store = HighlightStore::new(vec!["#fef08a".to_string()]);
        assert_eq!(store.active_color(), "#fef08a");
        let err = store.set_active_color("#000000").unwrap_err();
        assert!(matches!(err, HighlightError::UnknownColor(_)));
        assert_eq!(store.active_color(), "#fef08a");
    }

    #[test]
    fn test_set_comment() {
        let mut store = HighlightStore::default();
        let scope = ScopeKey::new("sub-1", 0, Section::Overall);
        let a = store.add(new_highlight(&scope, "aa"));

        let updated = store.set_comment(&a.id, Some("nice phrase".to_string())).unwrap();
        assert_eq!(updated.comment.as_deref(), Some("nice phrase"));
        assert!(updated.updated_at >= a.updated_at);

        let cleared = store.set_comment(&a.id, Some("   ".to_string())).unwrap();
        assert!(cleared.comment.is_none());

        assert!(store.set_comment("missing", None).is_err());
    }

    #[test]
    fn test_replace_scope_keeps_other_scopes() {
        let mut store = HighlightStore::default();
        let scope = ScopeKey::new("sub-1", 0, Section::Overall);
        let other = ScopeKey::new("sub-1", 1, Section::Overall);
        store.add(new_highlight(&scope, "old"));
        let kept = store.add(new_highlight(&other, "kept"));

        let mut donor = HighlightStore::default();
        let loaded = donor.add(new_highlight(&scope, "loaded"));
        let stray = donor.add(new_highlight(&other, "stray"));

        store.replace_scope(&scope, vec![loaded.clone(), stray]);

        assert_eq!(store.select_for_scope(&scope), vec![loaded]);
        assert_eq!(store.select_for_scope(&other), vec![kept]);
    }

    #[test]
    fn test_clear() {
        let mut store = HighlightStore::default();
        let a = ScopeKey::new("sub-a", 0, Section::Overall);
        let b = ScopeKey::new("sub-b", 0, Section::Overall);
        store.add(new_highlight(&a, "aa"));
        store.add(new_highlight(&b, "bb"));

        store.clear_submission("sub-a");
        assert!(store.select_for_scope(&a).is_empty());
        assert_eq!(store.len(), 1);

        store.clear_all();
        assert!(store.is_empty());
    }
}
