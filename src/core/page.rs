//! Page cursor over a body of lines
//!
//! A page is `min(height, remaining)` lines; the cursor only moves forward.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    total: usize,
    next: usize,
}

impl PageCursor {
    pub fn new(total: usize) -> Self {
        Self { total, next: 0 }
    }

    /// Index of the first line not yet shown
    pub fn position(&self) -> usize {
        self.next
    }

    pub fn remaining(&self) -> usize {
        self.total - self.next
    }

    pub fn is_exhausted(&self) -> bool {
        self.next >= self.total
    }

    /// Consume the next page of at most `height` lines
    ///
    /// Returns the index range of the page, or `None` once every line has
    /// been consumed. A zero height still consumes one line per page.
    pub fn next_page(&mut self, height: usize) -> Option<Range<usize>> {
        if self.is_exhausted() {
            return None;
        }
        let end = (self.next + height.max(1)).min(self.total);
        let page = self.next..end;
        self.next = end;
        Some(page)
    }

    /// Drop every remaining line
    pub fn discard(&mut self) {
        self.next = self.total;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_pages_of_45_by_20() {
        let mut cursor = PageCursor::new(45);
        assert_eq!(cursor.next_page(20), Some(0..20));
        assert_eq!(cursor.position(), 20);
        assert_eq!(cursor.next_page(20), Some(20..40));
        assert_eq!(cursor.remaining(), 5);
        assert_eq!(cursor.next_page(20), Some(40..45));
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.next_page(20), None);
    }

    #[test]
    fn test_empty_body() {
        let mut cursor = PageCursor::new(0);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.next_page(20), None);
    }

    #[test]
    fn test_discard() {
        let mut cursor = PageCursor::new(30);
        cursor.next_page(20);
        cursor.discard();
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(cursor.next_page(20), None);
    }

    proptest! {
        #[test]
        fn prop_page_sizes(total in 0usize..300, height in 1usize..30) {
            let mut cursor = PageCursor::new(total);
            let mut sizes = Vec::new();
            let mut last = 0;
            while let Some(page) = cursor.next_page(height) {
                prop_assert!(page.start >= last);
                last = page.end;
                sizes.push(page.len());
            }

            prop_assert_eq!(sizes.len(), total.div_ceil(height));
            prop_assert_eq!(sizes.iter().sum::<usize>(), total);
            if let Some(&tail) = sizes.last() {
                let expected = if total % height == 0 { height } else { total % height };
                prop_assert_eq!(tail, expected);
            }
        }
    }
}
