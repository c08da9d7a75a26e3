mod sink;
mod watch;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use landmass_geom::Vec2;
use landmass_runtime::{Executor, InlineExecutor, RayonExecutor};
use landmass_stream::ChunkStreamer;
use landmass_world::{TerrainConfig, UpdatableSettings, load_config_from_path};

use crate::sink::TallySink;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Streams procedural terrain around a moving viewer",
    long_about = None
)]
struct Args {
    /// Terrain config (TOML). Defaults are used if the file is missing.
    #[arg(long, default_value = "assets/terrain.toml")]
    config: PathBuf,

    /// Frames to simulate
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Viewer speed along +X, world units per frame
    #[arg(long, default_value_t = 4.0)]
    speed: f32,

    /// Worker threads; 0 picks one per core
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Build everything on the main thread
    #[arg(long)]
    inline: bool,

    /// Reload the config when the file changes
    #[arg(long)]
    watch: bool,

    /// Sleep between frames, in milliseconds
    #[arg(long, default_value_t = 0)]
    frame_ms: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = if args.config.exists() {
        load_config_from_path(&args.config)?
    } else {
        log::warn!("{} not found; using default terrain settings", args.config.display());
        TerrainConfig::default()
    };
    let mut settings = UpdatableSettings::new(config);

    let executor: Arc<dyn Executor> = if args.inline {
        Arc::new(InlineExecutor)
    } else {
        let pool = RayonExecutor::new(args.threads)?;
        log::info!("{} worker thread(s)", pool.workers());
        Arc::new(pool)
    };
    let sink = TallySink::default();
    let mut streamer = ChunkStreamer::new(settings.current(), executor, Box::new(sink.clone()))?;
    streamer.subscribe_to(&mut settings);

    let reload_rx = args
        .watch
        .then(|| watch::spawn_config_watcher(args.config.clone()));
    let frame = Duration::from_millis(args.frame_ms);
    let start = Instant::now();
    let mut viewer = Vec2::ZERO;

    for _ in 0..args.ticks {
        if let Some(rx) = &reload_rx {
            watch::process_config_events(rx, &args.config, &mut settings);
        }
        let report = streamer.tick(viewer);
        log::debug!(
            "tick {} viewer ({:.1}, {:.1}): {} completions, {} retried, {} created, \
             {} evicted, {} visible, {} in flight",
            report.tick,
            viewer.x,
            viewer.y,
            report.completions,
            report.retried,
            report.chunks_created,
            report.chunks_evicted,
            report.visible,
            report.in_flight
        );
        viewer.x += args.speed;
        if !frame.is_zero() {
            std::thread::sleep(frame);
        }
    }

    // Let outstanding jobs land so the summary reflects the final window.
    let settle_deadline = Instant::now() + Duration::from_secs(30);
    while streamer.in_flight() > 0 && Instant::now() < settle_deadline {
        streamer.tick(viewer);
        if !args.inline {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    let stats = streamer.stats();
    let queue = streamer.queue_stats();
    log::info!(
        "{} frames in {:.2?}: {} chunks ({} visible, {} colliders), {} evicted",
        args.ticks,
        start.elapsed(),
        stats.chunks,
        stats.visible,
        stats.colliders,
        stats.evicted_total
    );
    log::info!(
        "jobs: {} submitted, {} failed, {} rejected; {} stale results dropped; {} settings reloads",
        queue.submitted,
        queue.failed,
        queue.rejected,
        stats.stale_results_dropped,
        stats.settings_reloads
    );
    for (lod, count) in streamer.lod_histogram() {
        log::info!("  lod {}: {} chunk(s) shown", lod, count);
    }
    let totals = sink.totals();
    log::info!(
        "sink: {} triangles uploaded, {} shown, {} hidden, {} colliders, {} removed",
        totals.triangles_uploaded,
        totals.shown,
        totals.hidden,
        totals.colliders,
        totals.removed
    );
    let mut by_lod: Vec<_> = totals.meshes_by_lod.iter().collect();
    by_lod.sort_unstable();
    for (lod, n) in by_lod {
        log::debug!("  uploads at lod {}: {}", lod, n);
    }
    Ok(())
}
