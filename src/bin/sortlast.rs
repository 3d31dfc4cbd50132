use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sortlast", version)]
struct Cli {
    /// Log per-stage diagnostics to stderr.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite a scene file into a PNG.
    Render(RenderArgs),
    /// Print the screen-region plan for a rank count.
    Regions(RegionsArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Number of in-process ranks.
    #[arg(long, default_value_t = 1)]
    ranks: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RegionsArgs {
    /// Image height in pixels.
    #[arg(long)]
    height: u32,

    /// Number of ranks.
    #[arg(long)]
    ranks: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Regions(args) => cmd_regions(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let scene = sortlast::SceneFile::from_path(&args.in_path)?;
    scene
        .validate()
        .with_context(|| format!("validate scene '{}'", args.in_path.display()))?;
    let scene = Arc::new(scene);
    let background = scene.background_image();

    let outputs = sortlast::LocalCluster::run(
        args.ranks,
        sortlast::LocalClusterOpts::default(),
        |ctx| {
            let mut pass = sortlast::RenderPass::new(scene.pass_settings())?;
            pass.bind_sampler(Box::new(sortlast::ScenePatchSampler::new(scene.clone())));
            pass.render_frame(ctx, &scene.camera, &background)
        },
    )
    .with_context(|| format!("composite on {} rank(s)", args.ranks))?;

    let root = outputs
        .into_iter()
        .next()
        .and_then(|o| o.image.map(|img| (img, o.stats)));
    let Some((final_image, stats)) = root else {
        anyhow::bail!("rank 0 produced no image");
    };

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    final_image
        .to_rgb_image()?
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    tracing::info!(?stats, "root rank stats");
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_regions(args: RegionsArgs) -> anyhow::Result<()> {
    let regions = sortlast::plan_regions(args.ranks, args.height)?;
    for (rank, r) in regions.iter().enumerate() {
        println!("rank {rank}: rows [{}, {}) ({} rows)", r.min_y, r.max_y, r.rows());
    }
    Ok(())
}
