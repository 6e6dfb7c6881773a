//! Fixed-order composition: cluster scope, text filter, sort, paginate.

use std::time::Instant;

use fleetdeck_core::{Fields, GlobalFilter, PageLimit, SortDirection, SortField};
use serde::Serialize;
use tracing::trace;

use crate::filter::{filter_records, SearchConfig};
use crate::paginate::{paginate, Page};
use crate::scope::apply_cluster_scope;
use crate::sort::{sort_records, SortConfig};

/// UI state one card feeds into the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState<F> {
    pub search: String,
    pub local_clusters: Vec<String>,
    pub sort_field: F,
    pub sort_direction: SortDirection,
    pub limit: PageLimit,
    pub page: usize,
}

/// Record counts after each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub total: usize,
    pub after_scope: usize,
    pub after_global_filter: usize,
    pub after_search: usize,
    pub page_items: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput<'a, T> {
    pub page: Page<&'a T>,
    pub available_clusters: Vec<String>,
    pub effective_local_clusters: Vec<String>,
    pub stats: PipelineStats,
}

pub fn run_pipeline<'a, T, F>(
    records: &'a [T],
    state: &PipelineState<F>,
    search: &SearchConfig<T>,
    sort: &SortConfig<T, F>,
    global: &GlobalFilter,
) -> PipelineOutput<'a, T>
where
    T: Fields,
    F: SortField,
{
    let started = Instant::now();
    let scoped = apply_cluster_scope(records, search.cluster_field.as_deref(), global, &state.local_clusters);
    let after_scope = scoped.records.len();
    let globally = filter_records(scoped.records, &global.custom_filter, search);
    let after_global_filter = globally.len();
    let searched = filter_records(globally, &state.search, search);
    let after_search = searched.len();
    let ordered = sort_records(&searched, state.sort_field, state.sort_direction, sort);
    let page = paginate(&ordered, state.limit, state.page);
    let stats = PipelineStats { total: records.len(), after_scope, after_global_filter, after_search, page_items: page.items.len() };
    metrics::histogram!("card_pipeline_ms", started.elapsed().as_secs_f64() * 1_000.0);
    trace!(?stats, page = page.current_page, pages = page.total_pages, "card pipeline evaluated");
    PipelineOutput { page, available_clusters: scoped.available, effective_local_clusters: scoped.effective_local, stats }
}
