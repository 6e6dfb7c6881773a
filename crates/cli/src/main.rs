use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use fleetdeck_card::presets::{self, JsonSort};
use fleetdeck_card::{CardConfig, CardData, CardView, ClusterFilter};
use fleetdeck_core::kinds::{AlertSort, HelmSort, PvcSort, RbacSort};
use fleetdeck_core::{GlobalFilter, PageLimit, SortDirection, SortField};
use fleetdeck_persist::{KvStore, SqliteStore};
use fleetdeck_search::PipelineStats;
use fleetdeck_store::{spawn_feed, ClusterUpdate};
use serde::Serialize;
use tokio::signal;
use tracing::{debug, info, warn};

mod fleet;

use fleet::{flatten, load_fleet, render_table, CardRecord};

#[derive(Parser, Debug)]
#[command(name = "fleetdeckctl", version, about = "FleetDeck card pipeline CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Kind { Alerts, Pvcs, Helm, Rbac, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one card over a record file and print the requested page
    List {
        #[command(flatten)]
        card: CardArgs,
    },
    /// Inspect or change a card's persisted cluster selection
    Clusters {
        #[command(subcommand)]
        action: ClustersAction,
    },
    /// Re-read a record file on an interval and re-render on every change
    Watch {
        #[command(flatten)]
        card: CardArgs,
        /// Seconds between re-reads
        #[arg(long = "interval", default_value_t = 2)]
        interval: u64,
        /// Queued cluster updates that force a publish before the next tick
        #[arg(long = "queue-cap", env = "FLEETDECK_QUEUE_CAP", default_value_t = 64)]
        queue_cap: usize,
    },
}

#[derive(Args, Debug, Clone)]
struct CardArgs {
    /// JSON or YAML record file: a list, a Kubernetes List, or a map of cluster to list
    file: PathBuf,
    /// Record kind, which selects the card preset
    #[arg(long = "kind", value_enum, default_value_t = Kind::Json)]
    kind: Kind,
    /// Local search text
    #[arg(long = "search", default_value = "")]
    search: String,
    /// Sort field key (e.g. name, capacity, age)
    #[arg(long = "sort")]
    sort: Option<String>,
    /// asc or desc; defaults to the card's direction
    #[arg(long = "direction")]
    direction: Option<SortDirection>,
    /// Flip the resulting sort direction
    #[arg(long = "reverse")]
    reverse: bool,
    /// Page size, or "unlimited"
    #[arg(long = "limit", env = "FLEETDECK_PAGE_SIZE")]
    limit: Option<PageLimit>,
    /// 1-based page to show
    #[arg(long = "page", default_value_t = 1)]
    page: usize,
    /// Globally selected clusters; all clusters when omitted
    #[arg(long = "clusters", value_delimiter = ',')]
    clusters: Vec<String>,
    /// Global free-text filter applied before the card's search
    #[arg(long = "filter", default_value = "")]
    filter: String,
    /// Card key whose persisted cluster selection applies
    #[arg(long = "card")]
    card: Option<String>,
    /// Search fields for --kind json (dotted paths or JSON pointers)
    #[arg(long = "fields", value_delimiter = ',', default_value = "name,namespace,status,cluster")]
    fields: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum ClustersAction {
    /// Print the stored selection
    Show {
        #[arg(long = "card")]
        card: String,
    },
    /// Add or remove one cluster
    Toggle {
        #[arg(long = "card")]
        card: String,
        name: String,
    },
    /// Drop the selection (no local narrowing)
    Clear {
        #[arg(long = "card")]
        card: String,
    },
}

fn init_tracing() {
    let env = std::env::var("FLEETDECK_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("FLEETDECK_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid FLEETDECK_METRICS_ADDR; expected host:port");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::List { card } => {
            info!(file = %card.file.display(), kind = ?card.kind, "list invoked");
            match card.kind {
                Kind::Alerts => list::<_, AlertSort>(presets::alerts(), &card, cli.output)?,
                Kind::Pvcs => list::<_, PvcSort>(presets::pvcs(), &card, cli.output)?,
                Kind::Helm => list::<_, HelmSort>(presets::helm_releases(), &card, cli.output)?,
                Kind::Rbac => list::<_, RbacSort>(presets::rbac_bindings(), &card, cli.output)?,
                Kind::Json => list::<_, JsonSort>(json_config(&card), &card, cli.output)?,
            }
        }
        Commands::Clusters { action } => clusters(action, cli.output)?,
        Commands::Watch { card, interval, queue_cap } => {
            info!(file = %card.file.display(), kind = ?card.kind, interval, "watch invoked");
            let every = Duration::from_secs(interval.max(1));
            match card.kind {
                Kind::Alerts => watch::<_, AlertSort>(presets::alerts(), &card, every, queue_cap, cli.output).await?,
                Kind::Pvcs => watch::<_, PvcSort>(presets::pvcs(), &card, every, queue_cap, cli.output).await?,
                Kind::Helm => watch::<_, HelmSort>(presets::helm_releases(), &card, every, queue_cap, cli.output).await?,
                Kind::Rbac => watch::<_, RbacSort>(presets::rbac_bindings(), &card, every, queue_cap, cli.output).await?,
                Kind::Json => watch::<_, JsonSort>(json_config(&card), &card, every, queue_cap, cli.output).await?,
            }
        }
    }

    Ok(())
}

fn json_config(args: &CardArgs) -> CardConfig<serde_json::Value, JsonSort> {
    presets::json(args.fields.iter().cloned(), Some("cluster"), None)
}

fn global_filter(args: &CardArgs) -> GlobalFilter {
    let base = if args.clusters.is_empty() { GlobalFilter::all() } else { GlobalFilter::clusters(args.clusters.iter().cloned()) };
    base.with_custom_filter(args.filter.clone())
}

fn open_store() -> Result<Arc<dyn KvStore>> {
    Ok(Arc::new(SqliteStore::open_default()?))
}

/// Build a card from CLI flags. `--card` switches to the persisted selection under that key.
fn build_card<T: CardRecord, F: SortField>(mut config: CardConfig<T, F>, args: &CardArgs) -> Result<CardData<T, F>> {
    let mut card = match &args.card {
        Some(key) => {
            config.filter.storage_key = Some(key.clone());
            CardData::with_store(config, open_store()?)
        }
        None => CardData::new(config),
    };
    if let Some(key) = &args.sort {
        let field = F::parse_key(key)?;
        if !card.set_sort_by(field) {
            anyhow::bail!("sort field {} has no comparator on this card", field.key());
        }
    }
    if let Some(dir) = args.direction {
        card.set_sort_direction(dir);
    }
    if args.reverse {
        card.toggle_sort_direction();
    }
    if let Some(limit) = args.limit {
        card.set_items_per_page(limit);
    }
    card.set_search(args.search.clone());
    card.go_to_page(args.page);
    Ok(card)
}

fn list<T: CardRecord, F: SortField>(config: CardConfig<T, F>, args: &CardArgs, output: Output) -> Result<()> {
    let records = flatten(load_fleet::<T>(&args.file)?);
    let mut card = build_card(config, args)?;
    let view = card.compute(&records, &global_filter(args));
    print_view(&view, output)
}

async fn watch<T: CardRecord, F: SortField>(
    config: CardConfig<T, F>,
    args: &CardArgs,
    every: Duration,
    queue_cap: usize,
    output: Output,
) -> Result<()> {
    let mut card = build_card(config, args)?;
    let global = global_filter(args);
    let (tx, feed) = spawn_feed::<T>(queue_cap);

    let reader = tokio::spawn({
        let file = args.file.clone();
        async move {
            let mut known: BTreeSet<String> = BTreeSet::new();
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                if !push_file::<T>(&file, &mut known, &tx).await {
                    break;
                }
            }
        }
    });

    let mut rx = feed.subscribe_epoch();
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    debug!("feed closed");
                    break;
                }
                let snap = feed.current();
                let view = card.compute(&snap.items, &global);
                if output == Output::Human {
                    println!("epoch {}", snap.epoch);
                }
                print_view(&view, output)?;
            }
            _ = signal::ctrl_c() => {
                info!("interrupted; stopping watch");
                break;
            }
        }
    }
    reader.abort();
    Ok(())
}

/// Load the file once and push one update per cluster. Returns false once the feed is gone.
async fn push_file<T: CardRecord>(
    file: &Path,
    known: &mut BTreeSet<String>,
    tx: &tokio::sync::mpsc::Sender<ClusterUpdate<T>>,
) -> bool {
    let path = file.to_path_buf();
    let fleet = match tokio::task::spawn_blocking(move || load_fleet::<T>(&path)).await {
        Ok(Ok(f)) => f,
        // keep the last good snapshot on screen
        Ok(Err(e)) => {
            warn!(error = %e, "re-read failed");
            return true;
        }
        Err(e) => {
            warn!(error = %e, "re-read task failed");
            return true;
        }
    };
    let present: BTreeSet<String> = fleet.keys().cloned().collect();
    for gone in known.difference(&present) {
        if tx.send(ClusterUpdate::removed(gone.clone())).await.is_err() {
            return false;
        }
    }
    for (cluster, items) in fleet {
        if tx.send(ClusterUpdate::replaced(cluster, items)).await.is_err() {
            return false;
        }
    }
    *known = present;
    true
}

fn clusters(action: ClustersAction, output: Output) -> Result<()> {
    let store = open_store()?;
    let (card, filter, now_selected) = match action {
        ClustersAction::Show { card } => {
            let f = ClusterFilter::persisted(store, &card);
            (card, f, None)
        }
        ClustersAction::Toggle { card, name } => {
            let mut f = ClusterFilter::persisted(store, &card);
            let on = f.toggle(&name, None);
            info!(card = %card, cluster = %name, selected = on, "cluster toggled");
            (card, f, Some((name, on)))
        }
        ClustersAction::Clear { card } => {
            let mut f = ClusterFilter::persisted(store, &card);
            f.clear();
            info!(card = %card, "cluster selection cleared");
            (card, f, None)
        }
    };
    match output {
        Output::Human => {
            if let Some((name, on)) = &now_selected {
                println!("{} {}", if *on { "selected" } else { "deselected" }, name);
            }
            if filter.is_narrowing() {
                println!("{}: {}", card, filter.local().join(", "));
            } else {
                println!("{}: all clusters (no local selection)", card);
            }
        }
        Output::Json => {
            #[derive(Serialize)]
            struct Selection<'a> { card: &'a str, clusters: &'a [String] }
            println!("{}", serde_json::to_string_pretty(&Selection { card: &card, clusters: filter.local() })?);
        }
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewJson<'a, T> {
    items: &'a [&'a T],
    total_items: usize,
    current_page: usize,
    total_pages: usize,
    items_per_page: PageLimit,
    needs_pagination: bool,
    search: &'a str,
    local_clusters: &'a [String],
    effective_clusters: &'a [String],
    available_clusters: &'a [String],
    sort_by: &'static str,
    sort_direction: SortDirection,
    stats: PipelineStats,
}

fn print_view<T: CardRecord, F: SortField>(view: &CardView<'_, T, F>, output: Output) -> Result<()> {
    match output {
        Output::Json => {
            let body = ViewJson {
                items: &view.items,
                total_items: view.total_items,
                current_page: view.current_page,
                total_pages: view.total_pages,
                items_per_page: view.items_per_page,
                needs_pagination: view.needs_pagination,
                search: &view.filters.search,
                local_clusters: &view.filters.local_clusters,
                effective_clusters: &view.filters.effective_clusters,
                available_clusters: &view.filters.available_clusters,
                sort_by: view.sorting.field.key(),
                sort_direction: view.sorting.direction,
                stats: view.stats,
            };
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Output::Human => {
            if view.is_empty() {
                println!("No matching records.");
            } else {
                let rows: Vec<Vec<String>> = view.items.iter().map(|r| r.row()).collect();
                print!("{}", render_table(T::HEADERS, &rows));
            }
            println!("{}", footer(view));
        }
    }
    Ok(())
}

fn footer<T, F: SortField>(view: &CardView<'_, T, F>) -> String {
    let mut parts = Vec::new();
    match view.range {
        Some((from, to)) => parts.push(format!("Showing {}-{} of {}", from, to, view.total_items)),
        None => parts.push("Showing 0 of 0".to_string()),
    }
    if view.needs_pagination {
        parts.push(format!("page {}/{}", view.current_page, view.total_pages));
    }
    parts.push(format!("sort {} {}", view.sorting.field.key(), view.sorting.direction));
    if !view.filters.available_clusters.is_empty() {
        let local = if view.filters.effective_clusters.is_empty() {
            "all".to_string()
        } else {
            view.filters.effective_clusters.join(",")
        };
        parts.push(format!("clusters {} of {}", local, view.filters.available_clusters.join(",")));
    }
    parts.join(" • ")
}
