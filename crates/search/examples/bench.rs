use fleetdeck_core::kinds::{PvcRecord, PvcSort};
use fleetdeck_core::{GlobalFilter, PageLimit, SortDirection, SortField};
use fleetdeck_search::{by_field, run_pipeline, PipelineState, SearchConfig, SortConfig};
use std::time::Instant;

fn gen_pvc(i: usize) -> PvcRecord {
    let phase = match i % 3 {
        0 => "Bound",
        1 => "Pending",
        _ => "Lost",
    };
    PvcRecord {
        name: format!("data-{i:06}"),
        namespace: format!("ns{}", i % 10),
        cluster: Some(format!("cluster-{}", i % 8)),
        status: phase.to_string(),
        capacity: Some(format!("{}Gi", 1 + i % 500)),
        storage_class: Some(if i % 2 == 0 { "gp3".into() } else { "standard".into() }),
        volume: Some(format!("pv-{i:06}")),
        access_modes: smallvec::smallvec!["ReadWriteOnce".to_string()],
        created_at: 1_577_836_800 + i as i64,
    }
}

fn percentile_us(xs: &mut [u128], p: f64) -> u128 {
    xs.sort_unstable();
    let idx = ((xs.len() as f64 - 1.0) * p).round() as usize;
    xs[idx]
}

fn main() {
    let n: usize = std::env::var("FLEETDECK_BENCH_DOCS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(100_000);
    let per_page: usize = std::env::var("FLEETDECK_BENCH_LIMIT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(50);

    eprintln!("generating {} pvcs", n);
    let t0 = Instant::now();
    let data: Vec<PvcRecord> = (0..n).map(gen_pvc).collect();
    let gen_ms = t0.elapsed().as_secs_f64() * 1_000.0;

    let search = SearchConfig::<PvcRecord>::new(["name", "namespace", "status", "storageClass"]).cluster_field("cluster");
    let sort = SortConfig::exhaustive(PvcSort::Name, SortDirection::Asc, |f| match f {
        PvcSort::Age => by_field("createdAt"),
        other => by_field(other.key()),
    });

    let queries: Vec<String> = ["", "data-0001", "pending", "ns3", "zzz"].iter().map(|s| s.to_string()).collect();
    let scopes = [
        (GlobalFilter::all(), Vec::new()),
        (GlobalFilter::all(), vec!["cluster-1".to_string()]),
        (GlobalFilter::clusters(["cluster-2", "cluster-3"]), vec!["cluster-3".to_string()]),
    ];

    let run = |label: &str, field: PvcSort, dir: SortDirection| {
        let mut times: Vec<u128> = Vec::new();
        for q in &queries {
            for (global, local) in &scopes {
                let state = PipelineState {
                    search: q.clone(),
                    local_clusters: local.clone(),
                    sort_field: field,
                    sort_direction: dir,
                    limit: PageLimit::per_page(per_page),
                    page: 2,
                };
                let t = Instant::now();
                let _ = run_pipeline(&data, &state, &search, &sort, global);
                times.push(t.elapsed().as_micros());
            }
        }
        let p50 = percentile_us(&mut times.clone(), 0.50) as f64 / 1000.0;
        let p99 = percentile_us(&mut times, 0.99) as f64 / 1000.0;
        println!("{}: p50={:.3}ms p99={:.3}ms ({} runs, per_page={})", label, p50, p99, times.len(), per_page);
    };

    println!("generate: {:.1}ms docs={}", gen_ms, n);
    run("name_asc", PvcSort::Name, SortDirection::Asc);
    run("capacity_desc", PvcSort::Capacity, SortDirection::Desc);
    run("age_asc", PvcSort::Age, SortDirection::Asc);
}
