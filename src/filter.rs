use crate::models::Entry;

/// Narrows the shelf by category label and free text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub category: String,
    pub search: String,
}

impl Filter {
    pub fn new(category: impl Into<String>, search: impl Into<String>) -> Self {
        Filter {
            category: category.into(),
            search: search.into(),
        }
    }

    /// Uncategorized entries pass any category filter. Otherwise the filter
    /// must appear inside the entry's category, not the other way round.
    fn category_matches(&self, entry: &Entry) -> bool {
        self.category.is_empty()
            || entry.category.is_empty()
            || entry.category.contains(&self.category)
    }

    /// Case-insensitive substring match against the text or the title.
    fn search_matches(&self, entry: &Entry) -> bool {
        let needle = self.search.to_lowercase();
        entry.text.to_lowercase().contains(&needle)
            || entry
                .title
                .as_deref()
                .map_or(false, |t| !t.is_empty() && t.to_lowercase().contains(&needle))
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        self.category_matches(entry) && self.search_matches(entry)
    }

    /// Matching entries in their original order.
    pub fn apply<'a>(&self, entries: &'a [Entry]) -> Vec<&'a Entry> {
        entries.iter().filter(|e| self.matches(e)).collect()
    }
}
