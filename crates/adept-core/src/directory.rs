// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
/// Source of municipality names offered before a session starts.
pub trait MunicipalityDirectory: Send + Sync {
    fn lookup(&self, query: &str) -> Vec<String>;
}

/// Fixed in-memory list, filtered by case-insensitive substring match.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    names: Vec<String>,
}

impl StaticDirectory {
    pub const MIN_QUERY_CHARS: usize = 2;

    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { names: names.into_iter().map(Into::into).collect() }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl MunicipalityDirectory for StaticDirectory {
    fn lookup(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        if query.chars().count() < Self::MIN_QUERY_CHARS {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        self.names
            .iter()
            .filter(|n| n.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}
