//! Pagination engine.

use fleetdeck_core::PageLimit;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<E> {
    pub items: Vec<E>,
    /// Count before slicing.
    pub total_items: usize,
    pub total_pages: usize,
    /// 1-based, always within `1..=total_pages`.
    pub current_page: usize,
    pub limit: PageLimit,
    pub needs_pagination: bool,
}

impl<E> Page<E> {
    /// 1-based inclusive positions of the visible items, for "showing X-Y of N".
    pub fn range(&self) -> Option<(usize, usize)> {
        if self.items.is_empty() {
            return None;
        }
        let start = match self.limit.size() {
            Some(n) => (self.current_page - 1) * n + 1,
            None => 1,
        };
        Some((start, start + self.items.len() - 1))
    }

    pub fn has_prev(&self) -> bool { self.current_page > 1 }
    pub fn has_next(&self) -> bool { self.current_page < self.total_pages }
}

pub fn total_pages(total_items: usize, limit: PageLimit) -> usize {
    match limit.size() {
        Some(n) => total_items.div_ceil(n).max(1),
        None => 1,
    }
}

/// Clamp a requested 1-based page into range. Page 0 reads as page 1.
pub fn clamp_page(requested: usize, total_items: usize, limit: PageLimit) -> usize {
    requested.clamp(1, total_pages(total_items, limit))
}

/// True when `limit` would split `total_items` across more than one page.
pub fn needs_pagination(total_items: usize, limit: PageLimit) -> bool {
    limit.size().map(|n| total_items > n).unwrap_or(false)
}

pub fn paginate<E: Clone>(records: &[E], limit: PageLimit, current_page: usize) -> Page<E> {
    let total_items = records.len();
    let total_pages = total_pages(total_items, limit);
    let current_page = clamp_page(current_page, total_items, limit);
    let items = match limit.size() {
        Some(n) => {
            let start = ((current_page - 1) * n).min(total_items);
            let end = (start + n).min(total_items);
            records[start..end].to_vec()
        }
        None => records.to_vec(),
    };
    Page { items, total_items, total_pages, current_page, limit, needs_pagination: needs_pagination(total_items, limit) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seven_items_five_per_page() {
        let data: Vec<u32> = (1..=7).collect();
        let p1 = paginate(&data, PageLimit::per_page(5), 1);
        assert_eq!(p1.items.len(), 5);
        assert_eq!(p1.total_pages, 2);
        assert!(p1.needs_pagination);
        assert_eq!(p1.range(), Some((1, 5)));
        assert!(p1.has_next() && !p1.has_prev());

        let p2 = paginate(&data, PageLimit::per_page(5), 2);
        assert_eq!(p2.items, vec![6, 7]);
        assert_eq!(p2.range(), Some((6, 7)));
    }

    #[test]
    fn unlimited_is_one_page() {
        let data: Vec<u32> = (1..=7).collect();
        let p = paginate(&data, PageLimit::Unlimited, 3);
        assert_eq!(p.total_pages, 1);
        assert_eq!(p.current_page, 1);
        assert_eq!(p.items.len(), 7);
        assert!(!p.needs_pagination);
    }

    #[test]
    fn out_of_range_pages_clamp() {
        let data: Vec<u32> = (1..=7).collect();
        assert_eq!(paginate(&data, PageLimit::per_page(5), 0).current_page, 1);
        assert_eq!(paginate(&data, PageLimit::per_page(5), 99).current_page, 2);
        let empty: Vec<u32> = Vec::new();
        let p = paginate(&empty, PageLimit::per_page(5), 4);
        assert_eq!((p.current_page, p.total_pages), (1, 1));
        assert!(p.items.is_empty());
        assert_eq!(p.range(), None);
    }

    #[test]
    fn zero_page_size_acts_as_one() {
        let data: Vec<u32> = (1..=3).collect();
        let p = paginate(&data, PageLimit::Limited(0), 2);
        assert_eq!(p.items, vec![2]);
        assert_eq!(p.total_pages, 3);
    }

    #[test]
    fn pages_cover_every_item_exactly_once() {
        let data: Vec<u32> = (0..23).collect();
        for per in 1..=25 {
            let limit = PageLimit::per_page(per);
            let pages = total_pages(data.len(), limit);
            let joined: Vec<u32> = (1..=pages).flat_map(|p| paginate(&data, limit, p).items).collect();
            assert_eq!(joined, data, "per_page={}", per);
        }
    }
}
