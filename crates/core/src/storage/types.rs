use serde::{Deserialize, Serialize};

/// One page of a paginated listing.
///
/// `next_cursor` is an opaque continuation token: thread it into the next call
/// unchanged, stop when it is `None`. A stale cursor held across significant
/// data changes may skip or repeat items; that is an accepted
/// eventual-consistency tradeoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// An empty terminal page.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_page_is_last() {
        let page: Page<u32> = Page::empty();
        assert!(page.items.is_empty());
        assert!(page.is_last());
    }
}
