use std::{env, path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use poolmap::{
    catalog::load_polygons,
    config::errors::{
        ERR_CLI_BAD_FLAG, ERR_CLI_MISSING_COMMAND, ERR_CLI_OFFLINE, ERR_CLI_UNKNOWN_COMMAND,
        ERR_CLI_VALIDATION, ERR_CONFIG_ENV, ERR_TRANSPORT_CLIENT,
    }, init_tracing, validate_form, AppConfig, AppServices, Batch, BatchId,
    Catalog, Dispatch, Dispatcher, FormKind, HttpTransport, NewBatch, PricedPolygon, RunOptions,
    Store, StoreEvent,
};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("poolmap: {err:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return Err(anyhow!("{ERR_CLI_MISSING_COMMAND}: missing command"));
    }
    let cmd = args.remove(0);
    match cmd.as_str() {
        "watch" => watch_cmd(&args).await,
        "schema" => schema_cmd(&args),
        "validate" => validate_cmd(&args),
        "create-batch" => create_batch_cmd(&args).await,
        "run-batch" => run_batch_cmd(&args).await,
        "osm" => osm_cmd(&args).await,
        "polygons" => polygons_cmd(&args),
        "polygon-pools" => polygon_pools_cmd(&args).await,
        "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => Err(anyhow!("{ERR_CLI_UNKNOWN_COMMAND}: unknown command '{other}'")),
    }
}

/// Positional arguments plus `--flag value` pairs, in order.
#[derive(Default, Debug)]
struct Parsed {
    positional: Vec<String>,
    flags: Vec<(String, String)>,
}

impl Parsed {
    fn get(&self, flag: &str) -> Option<&str> {
        self.flags
            .iter()
            .rev()
            .find(|(k, _)| k == flag)
            .map(|(_, v)| v.as_str())
    }

    fn all(&self, flag: &str) -> impl Iterator<Item = &str> + '_ {
        let flag = flag.to_string();
        self.flags
            .iter()
            .filter(move |(k, _)| *k == flag)
            .map(|(_, v)| v.as_str())
    }

    fn number<T: std::str::FromStr>(&self, flag: &str) -> Result<Option<T>> {
        self.get(flag)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|_| anyhow!("{ERR_CLI_BAD_FLAG}: --{flag} expects a number, got '{raw}'"))
            })
            .transpose()
    }
}

fn parse_args(cmd: &str, args: &[String], allowed: &[&str]) -> Result<Parsed> {
    let mut parsed = Parsed::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let arg = &args[idx];
        if let Some(flag) = arg.strip_prefix("--") {
            if !allowed.contains(&flag) {
                bail!("{ERR_CLI_BAD_FLAG}: unexpected flag '{arg}' for {cmd} command");
            }
            idx += 1;
            let value = args
                .get(idx)
                .with_context(|| format!("{ERR_CLI_BAD_FLAG}: {arg} expects a value"))?;
            parsed.flags.push((flag.to_string(), value.clone()));
        } else {
            parsed.positional.push(arg.clone());
        }
        idx += 1;
    }
    Ok(parsed)
}

fn load_config(parsed: &Parsed) -> Result<AppConfig> {
    let mut config = AppConfig::from_env()
        .with_context(|| format!("{ERR_CONFIG_ENV}: invalid environment"))?;
    if let Some(server) = parsed.get("server") {
        config.server = Some(server.to_string());
    }
    if let Some(ms) = parsed.number::<u64>("interval-ms")? {
        config.reconcile_interval_ms = ms;
    }
    if let Some(path) = parsed.get("polygons") {
        config.polygons_path = Some(PathBuf::from(path));
    }
    config.validate()?;
    Ok(config)
}

fn dispatcher_for(config: &AppConfig) -> Result<Dispatcher> {
    let store = Arc::new(Store::new(Catalog::default(), config.server.clone()));
    let transport = HttpTransport::new(config.http_timeout())
        .with_context(|| format!("{ERR_TRANSPORT_CLIENT}: http client init failed"))?;
    Ok(Dispatcher::new(store, Arc::new(transport)))
}

async fn watch_cmd(args: &[String]) -> Result<()> {
    let parsed = parse_args("watch", args, &["server", "interval-ms", "ticks"])?;
    let config = load_config(&parsed)?;
    let ticks = parsed.number::<u64>("ticks")?;
    tracing::info!(target = "poolmap", config = %config.summary(), "watch starting");

    let services = AppServices::init(&config)?;
    if !services.is_reconciling() {
        services.shutdown().await;
        bail!("{ERR_CLI_OFFLINE}: no server configured; set POOLMAP_SERVER or pass --server");
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = services.store.subscribe(move |event: &StoreEvent| {
        tracing::debug!(target = "poolmap", event = event.name(), payload = %event.payload(), "store event");
        if matches!(event, StoreEvent::BatchesReplaced { .. }) {
            let _ = tx.send(());
        }
    });

    let deadline = async {
        match ticks {
            Some(n) => tokio::time::sleep(watch_window(config.reconcile_interval_ms, n)).await,
            None => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            Some(()) = rx.recv() => print_batches(&services.store.batches()),
        }
    }

    services.store.unsubscribe(subscription);
    services.shutdown().await;
    Ok(())
}

/// How long `watch --ticks n` runs. Saturates instead of wrapping.
fn watch_window(interval_ms: u64, ticks: u64) -> Duration {
    Duration::from_millis(interval_ms.saturating_mul(ticks))
}

fn print_batches(batches: &[Batch]) {
    println!("batches: {}", batches.len());
    for batch in batches {
        println!(
            "  {} name={} working={} osm_done={} progress={}",
            batch.id().map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
            batch.name().unwrap_or("-"),
            batch.is_working(),
            batch.osm_done(),
            batch
                .progress()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".into()),
        );
    }
}

fn form_kind(parsed: &Parsed) -> Result<FormKind> {
    let raw = parsed
        .positional
        .first()
        .with_context(|| format!("{ERR_CLI_BAD_FLAG}: expected a form name (run|new-batch)"))?;
    raw.parse::<FormKind>()
        .map_err(|e| anyhow!("{ERR_CLI_BAD_FLAG}: {e}"))
}

fn schema_cmd(args: &[String]) -> Result<()> {
    let parsed = parse_args("schema", args, &[])?;
    let kind = form_kind(&parsed)?;
    println!("{}", serde_json::to_string_pretty(kind.schema())?);
    Ok(())
}

fn validate_cmd(args: &[String]) -> Result<()> {
    let parsed = parse_args("validate", args, &[])?;
    let kind = form_kind(&parsed)?;
    let mut pairs = Vec::new();
    for raw in &parsed.positional[1..] {
        let (name, value) = raw
            .split_once('=')
            .with_context(|| format!("{ERR_CLI_BAD_FLAG}: expected key=value, got '{raw}'"))?;
        pairs.push((name, value));
    }
    let values = kind.schema().parse_pairs(pairs);
    check(kind, &values)?;
    println!("{}: ok", kind.as_str());
    Ok(())
}

fn check(kind: FormKind, values: &Map<String, Value>) -> Result<()> {
    validate_form(kind, values).map_err(|violations| {
        for v in &violations {
            println!("{}: {v}", v.field());
        }
        anyhow!(
            "{ERR_CLI_VALIDATION}: {} violation(s) in {} form",
            violations.len(),
            kind.as_str()
        )
    })
}

async fn await_dispatch(dispatch: Dispatch) -> Result<()> {
    match dispatch.outcome().await {
        None => bail!("{ERR_CLI_OFFLINE}: no server configured; set POOLMAP_SERVER or pass --server"),
        Some(result) => {
            result?;
            println!("sent");
            Ok(())
        }
    }
}

async fn create_batch_cmd(args: &[String]) -> Result<()> {
    let parsed = parse_args(
        "create-batch",
        args,
        &["server", "name", "width", "height", "zoom", "node"],
    )?;
    let config = load_config(&parsed)?;

    let mut pairs: Vec<(&str, &str)> = Vec::new();
    for (flag, field) in [
        ("name", "name"),
        ("width", "width"),
        ("height", "height"),
        ("zoom", "zoomLevel"),
    ] {
        if let Some(v) = parsed.get(flag) {
            pairs.push((field, v));
        }
    }
    let schema = FormKind::NewBatch.schema();
    let values = schema.parse_pairs(pairs);
    check(FormKind::NewBatch, &values)?;

    let mut body = schema.with_defaults(&values);
    body.insert("nodes".into(), serde_json::to_value(parse_nodes(&parsed)?)?);
    let batch: NewBatch = serde_json::from_value(Value::Object(body))
        .with_context(|| format!("{ERR_CLI_VALIDATION}: new batch parameters do not fit the request body"))?;

    await_dispatch(dispatcher_for(&config)?.add_batch(batch)).await
}

fn parse_nodes(parsed: &Parsed) -> Result<Vec<[f64; 2]>> {
    parsed
        .all("node")
        .map(|raw| {
            let (lat, lon) = raw
                .split_once(',')
                .with_context(|| format!("{ERR_CLI_BAD_FLAG}: --node expects lat,lon, got '{raw}'"))?;
            let lat = lat.trim().parse::<f64>();
            let lon = lon.trim().parse::<f64>();
            match (lat, lon) {
                (Ok(lat), Ok(lon)) => Ok([lat, lon]),
                _ => Err(anyhow!("{ERR_CLI_BAD_FLAG}: --node expects lat,lon, got '{raw}'")),
            }
        })
        .collect()
}

fn batch_id(parsed: &Parsed, cmd: &str) -> Result<BatchId> {
    parsed
        .positional
        .first()
        .map(|id| BatchId::new(id.as_str()))
        .with_context(|| format!("{ERR_CLI_BAD_FLAG}: {cmd} expects a batch id"))
}

async fn run_batch_cmd(args: &[String]) -> Result<()> {
    let parsed = parse_args("run-batch", args, &["server", "coverage", "sleep-min", "sleep-max"])?;
    let config = load_config(&parsed)?;
    let id = batch_id(&parsed, "run-batch")?;

    let mut pairs: Vec<(&str, &str)> = Vec::new();
    for (flag, field) in [
        ("coverage", "coverage"),
        ("sleep-min", "sleep_min"),
        ("sleep-max", "sleep_max"),
    ] {
        if let Some(v) = parsed.get(flag) {
            pairs.push((field, v));
        }
    }
    let schema = FormKind::BatchRun.schema();
    let values = schema.parse_pairs(pairs);
    check(FormKind::BatchRun, &values)?;
    let options: RunOptions = serde_json::from_value(Value::Object(schema.with_defaults(&values)))
        .with_context(|| format!("{ERR_CLI_VALIDATION}: run options do not fit the request body"))?;

    await_dispatch(dispatcher_for(&config)?.run_batch(id, options)).await
}

async fn osm_cmd(args: &[String]) -> Result<()> {
    let parsed = parse_args("osm", args, &["server"])?;
    let config = load_config(&parsed)?;
    let id = batch_id(&parsed, "osm")?;
    await_dispatch(dispatcher_for(&config)?.trigger_osm(id)).await
}

fn polygons_cmd(args: &[String]) -> Result<()> {
    let parsed = parse_args("polygons", args, &["polygons"])?;
    let config = load_config(&parsed)?;
    let path = config
        .polygons_path
        .with_context(|| format!("{ERR_CLI_BAD_FLAG}: no polygons file; set POOLMAP_POLYGONS or pass --polygons"))?;
    let polygons = load_polygons(&path)?;
    for polygon in polygons.iter().map(PricedPolygon::from) {
        println!(
            "{}\t{}\tlevel={}\tpools={}\tprice={:.2}",
            polygon.polygon.id,
            polygon.polygon.name.as_deref().unwrap_or("-"),
            polygon.polygon.level.as_deref().unwrap_or("-"),
            polygon.polygon.pool_count(),
            polygon.price,
        );
    }
    Ok(())
}

async fn polygon_pools_cmd(args: &[String]) -> Result<()> {
    let parsed = parse_args("polygon-pools", args, &["server"])?;
    let config = load_config(&parsed)?;
    let raw = parsed
        .positional
        .first()
        .with_context(|| format!("{ERR_CLI_BAD_FLAG}: polygon-pools expects a polygon id"))?;
    let id: u64 = raw
        .parse()
        .map_err(|_| anyhow!("{ERR_CLI_BAD_FLAG}: polygon id must be numeric, got '{raw}'"))?;
    let pools = dispatcher_for(&config)?
        .polygon_pools(id)
        .await
        .with_context(|| format!("{ERR_CLI_OFFLINE}: no server configured; set POOLMAP_SERVER or pass --server"))??;
    println!("{}", serde_json::to_string_pretty(&pools)?);
    Ok(())
}

fn print_usage() {
    tracing::warn!("Usage:");
    tracing::warn!("  poolmap watch [--server URL] [--interval-ms N] [--ticks N]");
    tracing::warn!("  poolmap schema <run|new-batch>");
    tracing::warn!("  poolmap validate <run|new-batch> key=value...");
    tracing::warn!("  poolmap create-batch --name NAME [--width N] [--height N] [--zoom N] [--node LAT,LON]... [--server URL]");
    tracing::warn!("  poolmap run-batch <id> [--coverage X] [--sleep-min N] [--sleep-max N] [--server URL]");
    tracing::warn!("  poolmap osm <id> [--server URL]");
    tracing::warn!("  poolmap polygons [--polygons PATH]");
    tracing::warn!("  poolmap polygon-pools <id> [--server URL]");
    tracing::warn!("  poolmap --help");
}
