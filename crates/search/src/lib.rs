//! FleetDeck search: the pure list-state engines every card composes.
//! Filter, sort, cluster scope and pagination are synchronous and side-effect free.

#![forbid(unsafe_code)]

pub mod filter;
pub mod paginate;
pub mod pipeline;
pub mod scope;
pub mod sort;

pub use filter::{filter_records, matches, normalize_query, Predicate, SearchConfig};
pub use paginate::{clamp_page, needs_pagination, paginate, total_pages, Page};
pub use pipeline::{run_pipeline, PipelineOutput, PipelineState, PipelineStats};
pub use scope::{apply_cluster_scope, available_clusters, cluster_of, ScopeOutcome};
pub use sort::{by_field, compare_text, compare_values, sort_records, Comparator, SortConfig};
