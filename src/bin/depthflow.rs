use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "depthflow", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of a flow archive's manifest.
    Inspect(InspectArgs),
    /// Unpack every asset of a flow archive into a directory.
    Extract(ExtractArgs),
    /// Print histogram division points and layer bounds of a depth map.
    Divisions(DivisionsArgs),
    /// Manage cached model weights.
    Models(ModelsArgs),
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Flow archive (zip).
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Flow archive (zip).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory (created if missing).
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct DivisionsArgs {
    /// Depth map image (value in the red channel, 0 = far).
    #[arg(long)]
    depth: PathBuf,

    /// Widen each printed bound by this much on both sides (0..=10).
    #[arg(long, default_value_t = 0)]
    overlap: u8,
}

#[derive(Parser, Debug)]
struct ModelsArgs {
    #[command(subcommand)]
    action: ModelsAction,

    /// Weight cache directory.
    #[arg(long, env = "DEPTHFLOW_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    /// Depth model source URL (cache key).
    #[arg(long, global = true, default_value = depthflow::DEFAULT_DEPTH_MODEL_URL)]
    depth_url: String,

    /// Inpaint model source URL (cache key).
    #[arg(long, global = true, default_value = depthflow::DEFAULT_INPAINT_MODEL_URL)]
    inpaint_url: String,
}

#[derive(Subcommand, Debug)]
enum ModelsAction {
    /// Show which models are cached.
    Status,
    /// Copy missing models into the cache from a directory of weight files.
    Import {
        /// Directory holding files named after each URL's last path segment.
        #[arg(long)]
        from: PathBuf,
    },
    /// Download missing models from their URLs (needs the `http` feature).
    Download,
    /// Remove the model weights from the cache.
    Remove,
    /// Remove every cache entry.
    Clear,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Inspect(args) => cmd_inspect(args),
        Command::Extract(args) => cmd_extract(args),
        Command::Divisions(args) => cmd_divisions(args),
        Command::Models(args) => cmd_models(args),
    }
}

fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("read '{}'", path.display()))
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let bytes = read_file(&args.in_path)?;
    let flow = depthflow::decode_flow(&bytes)?;
    let base = flow.base();

    println!("kind:           {}", flow.kind_name());
    println!("size:           {}x{}", base.width, base.height);
    println!("original image: {}", base.original_image_name);
    println!("processed by:   {}", base.processed_by);
    if let depthflow::Flow::Multilayer(ml) = &flow {
        println!("layers:         {}", ml.layers.len());
        println!("divisions:      {:?}", ml.division_points);
    }
    let args_json = serde_json::to_string(&base.process_args).context("format process args")?;
    println!("process args:   {args_json}");
    Ok(())
}

fn cmd_extract(args: ExtractArgs) -> anyhow::Result<()> {
    let bytes = read_file(&args.in_path)?;
    // Decode first so only well-formed archives are unpacked.
    depthflow::decode_flow(&bytes)?;

    for (name, data) in depthflow::read_entries(&bytes)? {
        let path = args.out.join(&name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        std::fs::write(&path, data).with_context(|| format!("write '{}'", path.display()))?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_divisions(args: DivisionsArgs) -> anyhow::Result<()> {
    let depth = depthflow::decode_image(&read_file(&args.depth)?)?;
    let divisions = depthflow::combined_divisions(&depth);
    println!("points: {:?}", divisions.points);

    if divisions.points.is_empty() {
        println!("bounds: single layer (0, 255)");
        return Ok(());
    }
    let overlap = args.overlap.min(depthflow::MAX_BOUND_OVERLAP);
    let bounds = depthflow::bounds_from_divisions(&divisions.points)?
        .into_iter()
        .map(|b| b.widen(overlap))
        .map(|b| format!("({}, {})", b.lower, b.upper))
        .collect::<Vec<_>>();
    println!("bounds: {}", bounds.join(" "));
    Ok(())
}

fn cmd_models(args: ModelsArgs) -> anyhow::Result<()> {
    let Some(cache_dir) = args.cache_dir else {
        anyhow::bail!("no cache directory: pass --cache-dir or set DEPTHFLOW_CACHE_DIR");
    };
    let cache = Arc::new(depthflow::DirCache::open(cache_dir)?);
    let urls = depthflow::ModelUrls {
        depth: args.depth_url,
        inpaint: args.inpaint_url,
    };
    let store = depthflow::ModelStore::new(cache.clone(), urls);

    match args.action {
        ModelsAction::Status => {
            for status in store.status()? {
                let state = if status.cached { "cached" } else { "missing" };
                println!(
                    "{}\t{state}\t{}",
                    depthflow::model_file_name(&status.url),
                    status.url
                );
            }
            let all = if store.all_models_cached()? { "yes" } else { "no" };
            println!("all models cached: {all}");
        }
        ModelsAction::Import { from } => {
            let fetcher = depthflow::DirFetcher::new(from);
            store.download_missing(&fetcher, &depthflow::LogProgress)?;
        }
        ModelsAction::Download => download_models(&store)?,
        ModelsAction::Remove => {
            store.clear_models()?;
            eprintln!("removed model weights from {}", cache.root().display());
        }
        ModelsAction::Clear => {
            depthflow::WeightCache::clear(cache.as_ref())?;
            eprintln!("cleared {}", cache.root().display());
        }
    }
    Ok(())
}

#[cfg(feature = "http")]
fn download_models(store: &depthflow::ModelStore) -> anyhow::Result<()> {
    let fetcher = depthflow::HttpFetcher::new()?;
    store.download_missing(&fetcher, &depthflow::LogProgress)?;
    Ok(())
}

#[cfg(not(feature = "http"))]
fn download_models(_store: &depthflow::ModelStore) -> anyhow::Result<()> {
    anyhow::bail!(
        "this build has no HTTP support: rebuild with `--features http` or use `models import --from <dir>`"
    )
}
