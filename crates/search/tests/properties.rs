#![forbid(unsafe_code)]

use fleetdeck_core::{GlobalFilter, PageLimit, SortDirection, SortField};
use fleetdeck_search::{
    apply_cluster_scope, by_field, filter_records, paginate, run_pipeline, sort_records, total_pages, PipelineState,
    SearchConfig, SortConfig,
};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Col { Name, Cluster }

impl SortField for Col {
    fn all() -> &'static [Self] { &[Col::Name, Col::Cluster] }
    fn key(self) -> &'static str { match self { Col::Name => "name", Col::Cluster => "cluster" } }
}

fn fleet() -> Vec<Value> {
    let clusters = ["east", "west", "edge"];
    let words = ["api", "web", "batch", "cache", "proxy", "queue", "db"];
    (0..40)
        .map(|i| {
            json!({
                "name": format!("{}-{:02}", words[i % words.len()], i),
                "cluster": clusters[i % clusters.len()],
                "owner": if i % 4 == 0 { "platform" } else { "apps" },
            })
        })
        .collect()
}

fn search_cfg() -> SearchConfig<Value> {
    SearchConfig::new(["name", "owner"]).cluster_field("cluster")
}

fn sort_cfg() -> SortConfig<Value, Col> {
    SortConfig::exhaustive(Col::Name, SortDirection::Asc, |f| match f {
        Col::Name => by_field("name"),
        Col::Cluster => by_field("cluster"),
    })
}

fn ids(v: &[&Value]) -> Vec<String> {
    v.iter().map(|r| r["name"].as_str().unwrap_or("").to_string()).collect()
}

#[test]
fn filter_is_idempotent() {
    let data = fleet();
    let cfg = search_cfg();
    for q in ["", "a", "api", "PLAT", "-0", "zzz"] {
        let once = filter_records(&data, q, &cfg);
        let twice = filter_records(once.iter().copied(), q, &cfg);
        assert_eq!(ids(&once), ids(&twice), "query {:?}", q);
    }
}

#[test]
fn filter_narrows_as_query_grows() {
    let data = fleet();
    let cfg = search_cfg();
    let typed = "cache-1";
    let mut prev = ids(&filter_records(&data, "", &cfg));
    for end in 1..=typed.len() {
        let cur = ids(&filter_records(&data, &typed[..end], &cfg));
        assert!(cur.iter().all(|n| prev.contains(n)), "prefix {:?}", &typed[..end]);
        prev = cur;
    }
}

#[test]
fn descending_is_reverse_of_ascending_without_ties() {
    let data = fleet();
    let refs: Vec<&Value> = data.iter().collect();
    let cfg = sort_cfg();
    let asc = ids(&sort_records(&refs, Col::Name, SortDirection::Asc, &cfg));
    let mut desc = ids(&sort_records(&refs, Col::Name, SortDirection::Desc, &cfg));
    desc.reverse();
    assert_eq!(asc, desc);
}

#[test]
fn pages_cover_the_sorted_set() {
    let data = fleet();
    let refs: Vec<&Value> = data.iter().collect();
    let sorted = sort_records(&refs, Col::Name, SortDirection::Asc, &sort_cfg());
    for per in [1usize, 3, 5, 7, 40, 41] {
        let limit = PageLimit::per_page(per);
        let mut joined = Vec::new();
        for p in 1..=total_pages(sorted.len(), limit) {
            joined.extend(paginate(&sorted, limit, p).items);
        }
        assert_eq!(ids(&joined), ids(&sorted));
    }
}

#[test]
fn requested_pages_always_resolve_in_range() {
    let data = fleet();
    for per in [1usize, 6, 100] {
        for req in [0usize, 1, 2, 7, 39, 40, 41, usize::MAX / 2] {
            let p = paginate(&data, PageLimit::per_page(per), req);
            assert!(p.current_page >= 1 && p.current_page <= p.total_pages);
        }
    }
}

#[test]
fn cluster_scope_is_a_subset_and_identity_when_unscoped() {
    let data = fleet();
    let all = apply_cluster_scope(&data, Some("cluster"), &GlobalFilter::all(), &[]);
    assert_eq!(all.records.len(), data.len());
    assert_eq!(all.available, ["east", "edge", "west"]);

    let east = apply_cluster_scope(&data, Some("cluster"), &GlobalFilter::all(), &["east".to_string()]);
    assert!(east.records.len() < data.len());
    assert!(east.records.iter().all(|r| data.iter().any(|d| std::ptr::eq(d, *r))));
    assert!(east.records.iter().all(|r| r["cluster"] == "east"));
}

#[test]
fn pipeline_stages_run_in_order() {
    let data = fleet();
    let state = PipelineState {
        search: "a".into(),
        local_clusters: vec!["west".into()],
        sort_field: Col::Name,
        sort_direction: SortDirection::Desc,
        limit: PageLimit::per_page(4),
        page: 9,
    };
    let global = GlobalFilter::clusters(["west", "edge"]).with_custom_filter("apps");
    let out = run_pipeline(&data, &state, &search_cfg(), &sort_cfg(), &global);
    assert_eq!(out.available_clusters, ["edge", "west"]);
    assert_eq!(out.effective_local_clusters, ["west"]);
    assert!(out.stats.after_scope <= out.stats.total);
    assert!(out.stats.after_global_filter <= out.stats.after_scope);
    assert!(out.stats.after_search <= out.stats.after_global_filter);
    // page 9 is out of range and clamps to the last page
    assert_eq!(out.page.current_page, out.page.total_pages);
    assert_eq!(out.page.total_items, out.stats.after_search);
    for r in &out.page.items {
        assert_eq!(r["cluster"], "west");
        assert_eq!(r["owner"], "apps");
    }
}
