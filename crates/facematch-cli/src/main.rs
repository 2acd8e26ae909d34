use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facematch_core::Capability;
use facematch_engine::{spawn_onnx_engine, Comparator, Config, GalleryView, ModelState, RunOutcome};
use facematch_io::Manifest;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "facematch", about = "Find gallery photos showing the face in a main photo")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a main photo against a gallery
    Compare {
        /// Gallery manifest (TOML); defaults to $FACEMATCH_MANIFEST, then the bundled demo
        #[arg(short, long, conflicts_with_all = ["main", "gallery"])]
        manifest: Option<PathBuf>,
        /// Main photo (path or URL)
        #[arg(long, requires = "gallery")]
        main: Option<String>,
        /// Gallery photos (paths or URLs)
        #[arg(long, num_args = 1.., requires = "main")]
        gallery: Vec<String>,
        /// Write an HTML results page to this file
        #[arg(long)]
        html: Option<PathBuf>,
        /// Print the matched set as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Count the faces found in one photo
    Describe {
        /// Photo (path or URL)
        image: String,
    },
    /// Load the models and report each capability
    Status,
    /// Print the bundled demo manifest
    Manifest,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Compare {
            manifest,
            main,
            gallery,
            html,
            json,
        } => {
            let (main, gallery, root) = match main {
                Some(main) => (main, gallery, None),
                None => {
                    let path = manifest.or_else(|| config.manifest_path.clone());
                    let manifest = load_manifest(path)?;
                    (manifest.main, manifest.gallery, manifest.root)
                }
            };

            let mut loader = config.image_loader();
            if let Some(root) = root {
                loader = loader.with_root(root);
            }

            let engine = spawn_onnx_engine(config.model_dir.clone())?;
            let comparator = Comparator::new(engine, loader, config.match_settings());
            ensure_ready(comparator.wait_ready().await)?;

            let matched = match comparator.compare(&main, &gallery).await {
                RunOutcome::Completed(set) => set,
                RunOutcome::Skipped => bail!("comparison skipped: models not ready"),
                RunOutcome::Superseded => bail!("comparison superseded"),
            };

            let view = GalleryView::new(&main, &gallery, &matched);
            if json {
                println!("{}", serde_json::to_string_pretty(&matched)?);
            } else {
                print!("{}", view.render_text());
            }
            if let Some(path) = html {
                std::fs::write(&path, view.render_html())
                    .with_context(|| format!("writing {}", path.display()))?;
                tracing::info!(path = %path.display(), "HTML results written");
            }
        }
        Commands::Describe { image } => {
            let engine = spawn_onnx_engine(config.model_dir.clone())?;
            ensure_ready(engine.gate().wait().await)?;

            let bitmap = config
                .image_loader()
                .load(&image)
                .await
                .with_context(|| format!("loading {image}"))?;
            let descriptors = engine.try_describe(bitmap).await?;
            println!("{image}: {} face(s)", descriptors.len());
            for (i, d) in descriptors.iter().enumerate() {
                println!("  face {i}: {}-dim descriptor", d.values.len());
            }
        }
        Commands::Status => {
            println!("models: {}", config.model_dir.display());
            println!("policy: {} (threshold {})", config.policy, config.match_settings().threshold);
            let engine = spawn_onnx_engine(config.model_dir.clone())?;
            match engine.gate().wait().await {
                ModelState::Ready(report) => {
                    for capability in Capability::ALL {
                        let state = if report.is_ready(capability) { "ready" } else { "missing" };
                        println!("  {capability}: {state}");
                    }
                }
                ModelState::Failed(reason) => println!("  models failed to load: {reason}"),
                ModelState::Loading => println!("  models still loading"),
            }
        }
        Commands::Manifest => {
            print!("{}", Manifest::embedded_source());
        }
    }

    Ok(())
}

fn load_manifest(path: Option<PathBuf>) -> Result<Manifest> {
    match path {
        Some(path) => Manifest::from_file(&path)
            .with_context(|| format!("reading manifest {}", path.display())),
        None => {
            tracing::info!("using the bundled demo manifest; photos are read from ./public/imgs");
            Manifest::embedded().context("bundled manifest")
        }
    }
}

fn ensure_ready(state: ModelState) -> Result<()> {
    match state {
        ModelState::Ready(_) => Ok(()),
        ModelState::Failed(reason) => bail!("models failed to load: {reason}"),
        ModelState::Loading => bail!("models still loading"),
    }
}
