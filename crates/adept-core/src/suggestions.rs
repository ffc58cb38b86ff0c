// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Predictive-search result list.
//!
//! Holds the ranked suggestions for the latest query plus an optional
//! keyboard cursor.  Up/Down wrap around; committing hands back the item and
//! clears the list.

use adept_gateway::SuggestionItem;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// What the overlay should currently show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SuggestionView {
    Hidden,
    Items {
        items: Vec<SuggestionItem>,
        selected: Option<usize>,
    },
    /// No matches for a long `problems` query: offer free-form submission.
    CustomInputHint { query: String },
}

#[derive(Debug, Default)]
pub struct SuggestionSet {
    items: Vec<SuggestionItem>,
    /// `None` means nothing is highlighted.
    selected: Option<usize>,
    hint: Option<String>,
}

impl SuggestionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list; the cursor goes back to "nothing highlighted".
    pub fn set_results(&mut self, items: Vec<SuggestionItem>) {
        self.items = items;
        self.selected = None;
        self.hint = None;
    }

    /// Show the custom-input hint instead of an empty list.
    pub fn show_hint(&mut self, query: impl Into<String>) {
        self.items.clear();
        self.selected = None;
        self.hint = Some(query.into());
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.selected = None;
        self.hint = None;
    }

    /// Cyclic cursor movement.  From "nothing highlighted", Down selects the
    /// first item and Up the last.
    pub fn move_cursor(&mut self, direction: Direction) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        self.selected = Some(match (self.selected, direction) {
            (None, Direction::Down) => 0,
            (None, Direction::Up) => len - 1,
            (Some(i), Direction::Down) => (i + 1) % len,
            (Some(i), Direction::Up) => i.checked_sub(1).unwrap_or(len - 1),
        });
    }

    /// Take the item at `index` (or the highlighted one when `None`) and clear
    /// the list.  Returns `None`, leaving the list untouched, when there is no
    /// such item.
    pub fn commit(&mut self, index: Option<usize>) -> Option<SuggestionItem> {
        let idx = index.or(self.selected)?;
        if idx >= self.items.len() {
            return None;
        }
        let item = self.items.swap_remove(idx);
        self.clear();
        Some(item)
    }

    pub fn items(&self) -> &[SuggestionItem] {
        &self.items
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn view(&self) -> SuggestionView {
        if let Some(query) = &self.hint {
            return SuggestionView::CustomInputHint { query: query.clone() };
        }
        if self.items.is_empty() {
            return SuggestionView::Hidden;
        }
        SuggestionView::Items { items: self.items.clone(), selected: self.selected }
    }
}
