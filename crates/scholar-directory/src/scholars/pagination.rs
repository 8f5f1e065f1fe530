use serde::Serialize;

pub const PAGE_SIZE: usize = 25;

/// Page cursor over a filtered result set.
///
/// There is always at least one page, and the current page is clamped into range whenever the
/// total changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
    total: usize,
    current: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            total: 0,
            current: 1,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn current_page(&self) -> usize {
        self.current
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total, self.page_size)
    }

    pub fn set_total(&mut self, total: usize) {
        self.total = total;
        self.current = self.current.clamp(1, self.total_pages());
    }

    pub fn go_to(&mut self, page: usize) {
        self.current = page.clamp(1, self.total_pages());
    }

    pub fn reset(&mut self) {
        self.current = 1;
    }

    pub fn next_page(&mut self) {
        if self.current < self.total_pages() {
            self.current += 1;
        }
    }

    pub fn prev_page(&mut self) {
        if self.current > 1 {
            self.current -= 1;
        }
    }

    /// Zero-based index of the first item on the current page.
    pub fn offset(&self) -> usize {
        (self.current - 1) * self.page_size
    }

    /// Current page's window of `items`. Updates the total first.
    pub fn slice<'a, T>(&mut self, items: &'a [T]) -> &'a [T] {
        self.set_total(items.len());
        let start = self.offset().min(items.len());
        let end = (start + self.page_size).min(items.len());
        &items[start..end]
    }

    pub fn info(&self) -> PageInfo {
        PageInfo {
            page: self.current,
            total: self.total,
            total_pages: self.total_pages(),
            page_size: self.page_size,
        }
    }
}

/// `ceil(total / page_size)`, never less than one.
pub fn total_pages(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1)).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub page_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_set_has_one_page() {
        let mut paginator = Paginator::default();
        paginator.set_total(0);
        assert_eq!(paginator.total_pages(), 1);
        assert_eq!(paginator.current_page(), 1);
        assert!(paginator.slice::<u8>(&[]).is_empty());
    }

    #[test]
    fn twenty_six_items_span_two_pages() {
        let items: Vec<usize> = (0..26).collect();
        let mut paginator = Paginator::default();
        paginator.set_total(items.len());
        assert_eq!(paginator.total_pages(), 2);

        paginator.next_page();
        assert_eq!(paginator.current_page(), 2);
        assert_eq!(paginator.slice(&items), &[25]);
    }

    #[test]
    fn navigation_stops_at_bounds() {
        let mut paginator = Paginator::default();
        paginator.set_total(30);
        paginator.prev_page();
        assert_eq!(paginator.current_page(), 1);
        paginator.next_page();
        paginator.next_page();
        paginator.next_page();
        assert_eq!(paginator.current_page(), 2);
    }

    #[test]
    fn shrinking_total_clamps_current_page() {
        let mut paginator = Paginator::default();
        paginator.set_total(100);
        paginator.go_to(4);
        assert_eq!(paginator.current_page(), 4);
        assert_eq!(paginator.offset(), 75);

        paginator.set_total(30);
        assert_eq!(paginator.current_page(), 2);

        paginator.set_total(0);
        assert_eq!(paginator.current_page(), 1);
    }

    #[test]
    fn go_to_clamps_out_of_range_requests() {
        let mut paginator = Paginator::default();
        paginator.set_total(60);
        paginator.go_to(0);
        assert_eq!(paginator.current_page(), 1);
        paginator.go_to(99);
        assert_eq!(paginator.current_page(), 3);
        assert_eq!(
            paginator.info(),
            PageInfo {
                page: 3,
                total: 60,
                total_pages: 3,
                page_size: 25,
            }
        );
    }
}
