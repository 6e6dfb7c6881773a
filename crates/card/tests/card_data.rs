use std::sync::Arc;

use fleetdeck_card::presets::{self, JsonSort};
use fleetdeck_card::{CardConfig, CardData};
use fleetdeck_core::kinds::{PvcRecord, PvcSort};
use fleetdeck_core::{GlobalFilter, PageLimit, SortDirection, SortField};
use fleetdeck_persist::{scoped_key, KvStore, MemoryStore};
use fleetdeck_search::{SearchConfig, SortConfig};
use serde_json::{json, Value};

fn pvc(name: &str, cluster: &str, status: &str, created_at: i64) -> PvcRecord {
    PvcRecord {
        name: name.into(),
        namespace: "default".into(),
        cluster: Some(cluster.into()),
        status: status.into(),
        capacity: None,
        storage_class: None,
        volume: None,
        access_modes: Default::default(),
        created_at,
    }
}

fn names<'a>(items: &[&'a PvcRecord]) -> Vec<&'a str> {
    items.iter().map(|p| p.name.as_str()).collect()
}

fn twelve_pvcs() -> Vec<PvcRecord> {
    (0..12)
        .map(|i| pvc(&format!("pvc-{:02}", i), if i % 3 == 0 { "c2" } else { "c1" }, "Bound", i))
        .collect()
}

#[test]
fn search_narrows_and_resets_to_first_page() {
    let mut data = twelve_pvcs();
    data.push(pvc("scratch", "c1", "Pending", 100));
    let mut card = CardData::new(presets::pvcs());
    card.go_to_page(3);
    card.compute(&data, &GlobalFilter::all());
    assert_eq!(card.current_page(), 3);

    card.set_search("  PENDING ");
    assert_eq!(card.current_page(), 1);
    let view = card.compute(&data, &GlobalFilter::all());
    assert_eq!(names(&view.items), ["scratch"]);
    assert_eq!(view.total_items, 1);
    assert!(!view.needs_pagination);
}

#[test]
fn default_sort_and_direction_toggle() {
    let data = vec![pvc("b", "c1", "Bound", 1), pvc("c", "c1", "Bound", 2), pvc("a", "c1", "Bound", 3)];
    let mut card = CardData::new(presets::pvcs());
    let view = card.compute(&data, &GlobalFilter::all());
    assert_eq!(names(&view.items), ["a", "b", "c"]);
    assert_eq!(view.sorting.field, PvcSort::Name);
    assert_eq!(view.sorting.options, PvcSort::all());

    card.set_sort_direction(SortDirection::Desc);
    let view = card.compute(&data, &GlobalFilter::all());
    assert_eq!(names(&view.items), ["c", "b", "a"]);

    assert!(card.set_sort_by(PvcSort::Age));
    card.set_sort_direction(SortDirection::Asc);
    let view = card.compute(&data, &GlobalFilter::all());
    assert_eq!(names(&view.items), ["a", "c", "b"]);
}

#[test]
fn page_is_clamped_when_results_shrink() {
    let data = twelve_pvcs();
    let mut card = CardData::new(presets::pvcs());
    card.compute(&data, &GlobalFilter::all());
    card.go_to_page(3);
    let view = card.compute(&data, &GlobalFilter::all());
    assert_eq!(view.current_page, 3);
    assert_eq!(view.range, Some((11, 12)));

    let fewer: Vec<PvcRecord> = data.into_iter().take(6).collect();
    let view = card.compute(&fewer, &GlobalFilter::all());
    assert_eq!(view.total_pages, 2);
    assert_eq!(view.current_page, 2);
    assert_eq!(card.current_page(), 2);
    assert_eq!(names(&view.items), ["pvc-05"]);
}

#[test]
fn go_to_page_never_leaves_the_computed_range() {
    let data = twelve_pvcs();
    let mut card = CardData::new(presets::pvcs());
    card.compute(&data, &GlobalFilter::all());
    card.go_to_page(0);
    assert_eq!(card.current_page(), 1);
    card.go_to_page(99);
    assert_eq!(card.current_page(), 3);
    card.next_page();
    assert_eq!(card.current_page(), 3);
    card.prev_page();
    card.prev_page();
    card.prev_page();
    assert_eq!(card.current_page(), 1);
}

#[test]
fn unlimited_page_size_shows_everything_from_page_one() {
    let data = twelve_pvcs();
    let mut card = CardData::new(presets::pvcs());
    card.compute(&data, &GlobalFilter::all());
    card.go_to_page(2);
    card.set_items_per_page(PageLimit::Unlimited);
    assert_eq!(card.current_page(), 1);
    let view = card.compute(&data, &GlobalFilter::all());
    assert_eq!(view.items.len(), 12);
    assert_eq!(view.total_pages, 1);
    assert!(!view.needs_pagination);
    assert_eq!(view.items_per_page, PageLimit::Unlimited);
}

#[test]
fn zero_page_size_is_treated_as_one() {
    let data = twelve_pvcs();
    let mut card = CardData::new(presets::pvcs());
    card.set_items_per_page(PageLimit::Limited(0));
    let view = card.compute(&data, &GlobalFilter::all());
    assert_eq!(view.items_per_page, PageLimit::Limited(1));
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.total_pages, 12);
}

#[test]
fn global_and_local_scopes_compose() {
    let data = vec![
        pvc("a", "c1", "Bound", 1),
        pvc("b", "c2", "Bound", 2),
        pvc("c", "c3", "Bound", 3),
        PvcRecord { cluster: None, ..pvc("d", "", "Bound", 4) },
    ];
    let global = GlobalFilter::clusters(["c1", "c2"]);
    let mut card = CardData::new(presets::pvcs());
    let view = card.compute(&data, &global);
    assert_eq!(names(&view.items), ["a", "b", "d"]);
    assert_eq!(view.filters.available_clusters, ["c1", "c2"]);

    card.toggle_cluster("c2");
    let view = card.compute(&data, &global);
    assert_eq!(names(&view.items), ["b", "d"]);
    assert_eq!(view.filters.local_clusters, ["c2"]);

    card.clear_clusters();
    let view = card.compute(&data, &global);
    assert_eq!(view.total_items, 3);
    assert!(view.filters.local_clusters.is_empty());
}

#[test]
fn empty_global_selection_hides_clustered_records() {
    let data = vec![pvc("a", "c1", "Bound", 1), PvcRecord { cluster: None, ..pvc("b", "", "Bound", 2) }];
    let mut card = CardData::new(presets::pvcs());
    let view = card.compute(&data, &GlobalFilter::clusters(Vec::<String>::new()));
    assert_eq!(names(&view.items), ["b"]);
    assert!(view.filters.available_clusters.is_empty());
}

#[test]
fn stale_persisted_selection_does_not_narrow() {
    let store = Arc::new(MemoryStore::new());
    let key = scoped_key(fleetdeck_card::clusters::STORAGE_NAMESPACE, "pvc-status");
    store.set(&key, r#"["c9"]"#).unwrap();
    let data = vec![pvc("a", "c1", "Bound", 1), pvc("b", "c2", "Bound", 2)];

    let mut card = CardData::with_store(presets::pvcs(), store.clone());
    assert_eq!(card.local_clusters(), ["c9"]);
    let view = card.compute(&data, &GlobalFilter::all());
    assert_eq!(view.total_items, 2);
    assert!(view.filters.effective_clusters.is_empty());

    card.toggle_cluster("c1");
    assert_eq!(store.get(&key).unwrap().as_deref(), Some(r#"["c1"]"#));
    let view = card.compute(&data, &GlobalFilter::all());
    assert_eq!(names(&view.items), ["a"]);
}

#[test]
fn toggling_a_cluster_outside_the_data_keeps_the_selection_a_subset() {
    let data = vec![pvc("a", "c1", "Bound", 1)];
    let mut card = CardData::new(presets::pvcs());
    card.compute(&data, &GlobalFilter::all());
    assert!(!card.toggle_cluster("c9"));
    let view = card.compute(&data, &GlobalFilter::all());
    assert!(view.filters.local_clusters.iter().all(|c| view.filters.available_clusters.contains(c)));
    assert!(view.filters.local_clusters.is_empty());
    assert_eq!(view.total_items, 1);
}

#[test]
fn toggle_sort_direction_flips_the_order() {
    let data = vec![pvc("b", "c1", "Bound", 1), pvc("a", "c1", "Bound", 2)];
    let mut card = CardData::new(presets::pvcs());
    assert_eq!(card.toggle_sort_direction(), SortDirection::Desc);
    let view = card.compute(&data, &GlobalFilter::all());
    assert_eq!(names(&view.items), ["b", "a"]);
    assert_eq!(card.toggle_sort_direction(), SortDirection::Asc);
}

#[test]
fn selection_survives_remount() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let data = vec![pvc("a", "c1", "Bound", 1), pvc("b", "c2", "Bound", 2)];
    {
        let mut card = CardData::with_store(presets::pvcs(), store.clone());
        card.toggle_cluster("c2");
    }
    let mut card = CardData::with_store(presets::pvcs(), store);
    let view = card.compute(&data, &GlobalFilter::all());
    assert_eq!(names(&view.items), ["b"]);
}

#[test]
fn two_cards_keep_independent_state() {
    let data = twelve_pvcs();
    let mut left = CardData::new(presets::pvcs());
    let mut right = CardData::new(presets::pvcs());
    left.set_search("pvc-01");
    right.set_sort_direction(SortDirection::Desc);
    let l = left.compute(&data, &GlobalFilter::all());
    let r = right.compute(&data, &GlobalFilter::all());
    assert_eq!(names(&l.items), ["pvc-01"]);
    assert_eq!(r.items[0].name, "pvc-11");
    assert_eq!(right.search(), "");
}

#[test]
fn sort_field_without_comparator_is_refused() {
    let config: CardConfig<Value, JsonSort> = CardConfig {
        filter: SearchConfig::new(["name"]),
        sort: SortConfig::new(JsonSort::Name, SortDirection::Asc)
            .comparator(JsonSort::Name, |a: &Value, b: &Value| a["name"].as_str().cmp(&b["name"].as_str())),
        default_limit: PageLimit::default(),
    };
    let mut card = CardData::new(config);
    assert!(!card.set_sort_by(JsonSort::Status));
    assert_eq!(card.sort_field(), JsonSort::Name);
    let data = vec![json!({ "name": "z" }), json!({ "name": "m" })];
    let view = card.compute(&data, &GlobalFilter::all());
    assert_eq!(view.items[0]["name"], "m");
    assert_eq!(view.sorting.options, [JsonSort::Name]);
}

#[test]
fn global_custom_filter_applies_before_local_search() {
    let data = vec![
        json!({ "name": "api", "namespace": "prod", "cluster": "c1" }),
        json!({ "name": "api", "namespace": "dev", "cluster": "c1" }),
        json!({ "name": "web", "namespace": "prod", "cluster": "c2" }),
    ];
    let mut card = CardData::new(presets::json(["name", "namespace"], Some("cluster"), None));
    card.set_search("api");
    let view = card.compute(&data, &GlobalFilter::all().with_custom_filter("prod"));
    assert_eq!(view.total_items, 1);
    assert_eq!(view.items[0]["namespace"], "prod");
    assert_eq!(view.stats.after_global_filter, 2);
    assert_eq!(view.stats.after_search, 1);
}

#[test]
fn empty_input_yields_an_empty_first_page() {
    let data: Vec<PvcRecord> = Vec::new();
    let mut card = CardData::new(presets::pvcs());
    card.go_to_page(4);
    let view = card.compute(&data, &GlobalFilter::all());
    assert!(view.is_empty());
    assert_eq!(view.current_page, 1);
    assert_eq!(view.total_pages, 1);
    assert_eq!(view.range, None);
}
