//! Filter list parsing.

use crate::error::PolicyError;
use crate::filters::filter::Filter;
use crate::types::FilterKind;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Ordered filters parsed from list text, one filter per non-empty line.
#[derive(Debug, Clone, Default)]
pub struct FilterList {
    filters: Vec<Arc<Filter>>,
}

impl FilterList {
    pub fn parse(text: &str) -> Self {
        let filters = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| Arc::new(Filter::parse(line)))
            .collect();
        Self { filters }
    }

    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let text = std::fs::read_to_string(path).map_err(|source| PolicyError::FilterListIo {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn filters(&self) -> &[Arc<Filter>] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn extend(&mut self, other: FilterList) {
        self.filters.extend(other.filters);
    }

    pub fn counts_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for filter in &self.filters {
            *counts.entry(filter.kind().as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Invalid filters with their parse errors.
    pub fn invalid(&self) -> Vec<(&str, &str)> {
        self.filters
            .iter()
            .filter_map(|filter| match filter.as_ref() {
                Filter::Invalid { text, reason } => Some((text.as_str(), reason.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn count_of(&self, kind: FilterKind) -> usize {
        self.filters.iter().filter(|f| f.kind() == kind).count()
    }
}
