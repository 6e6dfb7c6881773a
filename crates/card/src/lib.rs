//! FleetDeck card state: the per-card orchestrator that owns search, sort, cluster
//! and page state and derives the visible page from a record snapshot.
//!
//! One [`CardData`] per mounted card. Nothing here is global; two cards of the same
//! kind keep independent state and share only the persisted cluster selection key.

#![forbid(unsafe_code)]

use std::sync::Arc;

use fleetdeck_core::{GlobalFilter, Fields, PageLimit, SortDirection, SortField};
use fleetdeck_persist::KvStore;
use fleetdeck_search::{clamp_page, run_pipeline, PipelineState, PipelineStats, SearchConfig, SortConfig};
use tracing::{debug, warn};

pub mod clusters;
pub mod presets;

pub use clusters::ClusterFilter;

/// Everything a card declares up front.
pub struct CardConfig<T, F: SortField> {
    pub filter: SearchConfig<T>,
    pub sort: SortConfig<T, F>,
    pub default_limit: PageLimit,
}

impl<T, F: SortField> Clone for CardConfig<T, F> {
    fn clone(&self) -> Self {
        Self { filter: self.filter.clone(), sort: self.sort.clone(), default_limit: self.default_limit }
    }
}

/// Filter half of a [`CardView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub search: String,
    /// Selection as stored, stale entries included.
    pub local_clusters: Vec<String>,
    /// Selection entries that matched available clusters this round.
    pub effective_clusters: Vec<String>,
    pub available_clusters: Vec<String>,
}

/// Sort half of a [`CardView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState<F> {
    pub field: F,
    pub direction: SortDirection,
    /// Fields the card can sort by.
    pub options: Vec<F>,
}

/// What presentation code renders. Recomputed on every [`CardData::compute`].
#[derive(Debug, Clone)]
pub struct CardView<'a, T, F> {
    pub items: Vec<&'a T>,
    pub total_items: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub items_per_page: PageLimit,
    pub needs_pagination: bool,
    /// 1-based "showing X-Y" bounds.
    pub range: Option<(usize, usize)>,
    pub filters: FilterState,
    pub sorting: SortState<F>,
    pub stats: PipelineStats,
}

impl<T, F> CardView<'_, T, F> {
    /// No records survived the filters (the empty state, not an error).
    pub fn is_empty(&self) -> bool { self.total_items == 0 }
}

pub struct CardData<T, F: SortField> {
    config: CardConfig<T, F>,
    search: String,
    clusters: ClusterFilter,
    sort_field: F,
    sort_direction: SortDirection,
    limit: PageLimit,
    page: usize,
    last_available: Option<Vec<String>>,
    last_total_pages: Option<usize>,
}

impl<T: Fields, F: SortField> CardData<T, F> {
    /// Card with an in-memory cluster selection.
    pub fn new(config: CardConfig<T, F>) -> Self {
        Self::with_clusters(config, ClusterFilter::ephemeral())
    }

    /// Card whose cluster selection persists under the config's storage key, if it has one.
    pub fn with_store(config: CardConfig<T, F>, store: Arc<dyn KvStore>) -> Self {
        let clusters = match config.filter.storage_key.as_deref() {
            Some(key) => ClusterFilter::persisted(store, key),
            None => ClusterFilter::ephemeral(),
        };
        Self::with_clusters(config, clusters)
    }

    fn with_clusters(config: CardConfig<T, F>, clusters: ClusterFilter) -> Self {
        if !config.sort.has(config.sort.default_field) {
            warn!(field = config.sort.default_field.key(), "default sort field has no comparator; rows stay in input order");
        }
        Self {
            search: String::new(),
            clusters,
            sort_field: config.sort.default_field,
            sort_direction: config.sort.default_direction,
            limit: config.default_limit,
            page: 1,
            last_available: None,
            last_total_pages: None,
            config,
        }
    }

    pub fn config(&self) -> &CardConfig<T, F> { &self.config }
    pub fn search(&self) -> &str { &self.search }
    pub fn sort_field(&self) -> F { self.sort_field }
    pub fn sort_direction(&self) -> SortDirection { self.sort_direction }
    pub fn items_per_page(&self) -> PageLimit { self.limit }
    pub fn current_page(&self) -> usize { self.page }
    pub fn local_clusters(&self) -> &[String] { self.clusters.local() }

    /// Replace the search text. A changed query goes back to page 1.
    pub fn set_search(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.search {
            self.search = text;
            self.page = 1;
        }
    }

    /// Switch the sort field. Fields without a comparator are refused.
    pub fn set_sort_by(&mut self, field: F) -> bool {
        if !self.config.sort.has(field) {
            warn!(field = field.key(), "refusing sort field without comparator");
            return false;
        }
        self.sort_field = field;
        true
    }

    pub fn set_sort_direction(&mut self, direction: SortDirection) {
        self.sort_direction = direction;
    }

    /// Flip the direction, as a second click on the active column header does.
    pub fn toggle_sort_direction(&mut self) -> SortDirection {
        self.sort_direction = self.sort_direction.reversed();
        self.sort_direction
    }

    /// Change the page size; always returns to page 1.
    pub fn set_items_per_page(&mut self, limit: PageLimit) {
        let limit = match limit.size() {
            Some(n) => PageLimit::per_page(n),
            None => PageLimit::Unlimited,
        };
        if limit != self.limit {
            debug!(from = %self.limit, to = %limit, "page size changed");
        }
        self.limit = limit;
        self.page = 1;
        self.last_total_pages = None;
    }

    /// Jump to a 1-based page, clamped against the last computed page count.
    pub fn go_to_page(&mut self, page: usize) {
        let upper = self.last_total_pages.unwrap_or(usize::MAX);
        self.page = page.clamp(1, upper.max(1));
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.go_to_page(self.page.saturating_sub(1));
    }

    /// Flip one cluster in the local selection and return to page 1.
    pub fn toggle_cluster(&mut self, name: &str) -> bool {
        let selected = self.clusters.toggle(name, self.last_available.as_deref());
        self.page = 1;
        selected
    }

    /// Drop the local selection ("no narrowing") and return to page 1.
    pub fn clear_clusters(&mut self) {
        self.clusters.clear();
        self.page = 1;
    }

    /// Snapshot of the state the pipeline runs with.
    pub fn state(&self) -> PipelineState<F> {
        PipelineState {
            search: self.search.clone(),
            local_clusters: self.clusters.local().to_vec(),
            sort_field: self.sort_field,
            sort_direction: self.sort_direction,
            limit: self.limit,
            page: self.page,
        }
    }

    /// Run scope, filter, sort and paginate over `records` and return the visible page.
    /// The clamped page is written back so later page moves start from a valid page.
    pub fn compute<'a>(&mut self, records: &'a [T], global: &GlobalFilter) -> CardView<'a, T, F> {
        let out = run_pipeline(records, &self.state(), &self.config.filter, &self.config.sort, global);
        let page = out.page;
        if page.current_page != self.page {
            debug!(requested = self.page, resolved = page.current_page, "page clamped into range");
            self.page = page.current_page;
        }
        debug_assert_eq!(self.page, clamp_page(self.page, page.total_items, self.limit));
        self.last_total_pages = Some(page.total_pages);
        self.last_available = Some(out.available_clusters.clone());
        let range = page.range();
        CardView {
            total_items: page.total_items,
            current_page: page.current_page,
            total_pages: page.total_pages,
            items_per_page: page.limit,
            needs_pagination: page.needs_pagination,
            range,
            items: page.items,
            filters: FilterState {
                search: self.search.clone(),
                local_clusters: self.clusters.local().to_vec(),
                effective_clusters: out.effective_local_clusters,
                available_clusters: out.available_clusters,
            },
            sorting: SortState {
                field: self.sort_field,
                direction: self.sort_direction,
                options: self.config.sort.fields(),
            },
            stats: out.stats,
        }
    }
}

impl<T, F: SortField> std::fmt::Debug for CardData<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardData")
            .field("search", &self.search)
            .field("clusters", &self.clusters)
            .field("sort_field", &self.sort_field)
            .field("sort_direction", &self.sort_direction)
            .field("limit", &self.limit)
            .field("page", &self.page)
            .finish()
    }
}
