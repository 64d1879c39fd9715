// page.rs — Page requests and page results for workspace listings.
//
// Pages are zero-based. `Page` metadata always describes the filtered
// (workspace-scoped) set the store produced, never the whole table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::lifecycle::UnknownName;

/// Column a listing is ordered by.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Id,
    Status,
}

impl FromStr for SortKey {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created_at" | "created" | "createddate" => Ok(SortKey::CreatedAt),
            "id" => Ok(SortKey::Id),
            "status" => Ok(SortKey::Status),
            _ => Err(UnknownName {
                kind: "sort key",
                name: s.to_string(),
            }),
        }
    }
}

/// Ascending or descending.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "oldest" => Ok(SortDirection::Asc),
            "desc" | "descending" | "newest" => Ok(SortDirection::Desc),
            _ => Err(UnknownName {
                kind: "sort direction",
                name: s.to_string(),
            }),
        }
    }
}

/// Which slice of a listing to return, and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page index.
    pub page: u64,
    /// Elements per page. Always at least 1.
    pub size: u64,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl PageRequest {
    /// Page `page` of `size` elements ordered by creation time, oldest first.
    /// A zero size is bumped to 1.
    pub fn of(page: u64, size: u64) -> Self {
        Self {
            page,
            size: size.max(1),
            sort: SortKey::CreatedAt,
            direction: SortDirection::Asc,
        }
    }

    pub fn sorted_by(mut self, sort: SortKey, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    /// Number of elements to skip.
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

/// One page of a listing plus the metadata describing the full filtered set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page<T> {
    pub content: Vec<T>,
    /// Zero-based index of this page.
    pub number: u64,
    /// Requested page size.
    pub size: u64,
    /// Elements in the filtered set across all pages.
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            number: request.page,
            size: request.size,
            total_elements,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(self.size)
    }

    /// Elements on this page.
    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let page: Page<u8> = Page::new(vec![1, 2, 3], &PageRequest::of(1, 3), 7);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.number_of_elements(), 3);
    }

    #[test]
    fn empty_set_has_zero_pages() {
        let page: Page<u8> = Page::new(vec![], &PageRequest::of(0, 10), 0);
        assert_eq!(page.total_pages(), 0);
        assert!(page.is_empty());
    }

    #[test]
    fn zero_size_is_clamped() {
        let req = PageRequest::of(2, 0);
        assert_eq!(req.size, 1);
        assert_eq!(req.offset(), 2);
    }

    #[test]
    fn sort_names_parse() {
        assert_eq!("createdDate".parse::<SortKey>(), Ok(SortKey::CreatedAt));
        assert_eq!("newest".parse::<SortDirection>(), Ok(SortDirection::Desc));
        assert!("title".parse::<SortKey>().is_err());
    }
}
