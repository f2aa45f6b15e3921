mod provenance;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shp2ply::{filter, load, ply, ComponentSet, ConvertError, ConvertOptions, Summary};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::SubscriberBuilder;

#[derive(Parser, Debug)]
#[command(name = "shp2ply", version)]
#[command(about = "Convert shapefile polygons to Geosoft PLY text")]
struct Cmd {
    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log warnings and errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Convert a .shp, a directory, or a .zip of shapefile components to PLY
    Convert {
        input: PathBuf,
        /// Output PLY file
        #[arg(long, default_value = "output.ply")]
        out: PathBuf,
        /// Output EPSG code (default: source EPSG, else 4326)
        #[arg(long)]
        epsg: Option<u32>,
        /// Write source coordinates without reprojecting
        #[arg(long)]
        keep_source: bool,
        /// Lines of output to print after converting
        #[arg(long, default_value_t = 50)]
        preview: usize,
        /// Print the input summary as JSON
        #[arg(long)]
        report: bool,
    },
    /// Print the summary of the polygon features as JSON
    Inspect { input: PathBuf },
}

fn main() -> Result<()> {
    let cmd = Cmd::parse();
    let level = if cmd.verbose {
        Level::DEBUG
    } else if cmd.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    SubscriberBuilder::default()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    match cmd.action {
        Action::Convert {
            input,
            out,
            epsg,
            keep_source,
            preview,
            report,
        } => {
            let options = ConvertOptions {
                target_epsg: epsg,
                keep_source,
            };
            convert(&input, &out, &options, preview, report)
        }
        Action::Inspect { input } => inspect(&input),
    }
}

fn read_input(input: &Path) -> Result<ComponentSet> {
    ComponentSet::from_path(input).with_context(|| format!("reading {}", input.display()))
}

fn convert(
    input: &Path,
    out: &Path,
    options: &ConvertOptions,
    preview: usize,
    report: bool,
) -> Result<()> {
    tracing::info!(input = %input.display(), out = %out.display(), "convert");
    let components = read_input(input)?;
    let conversion = shp2ply::convert(&components, options).map_err(|e| {
        let context = convert_context(input, &e);
        anyhow::Error::new(e).context(context)
    })?;
    if report {
        println!("{}", serde_json::to_string_pretty(&conversion.summary)?);
    }

    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating output dir {}", parent.display()))?;
        }
    }
    std::fs::write(out, conversion.text.as_bytes())
        .with_context(|| format!("writing {}", out.display()))?;

    let record = provenance::Provenance::new(input, &components, options, &conversion, out);
    let sidecar = provenance::write_sidecar(out, &record)?;
    tracing::info!(
        polygons = conversion.polygons,
        out = %out.display(),
        sidecar = %sidecar.display(),
        "wrote PLY"
    );

    if preview > 0 {
        println!("{}", ply::preview(&conversion.text, preview));
    }
    Ok(())
}

/// Context line for a failed conversion, with the flag that gets past it.
fn convert_context(input: &Path, err: &ConvertError) -> String {
    match err {
        ConvertError::UnknownSourceReference { .. } => format!(
            "converting {}: rerun with --keep-source to write the stored coordinates",
            input.display()
        ),
        _ => format!("converting {}", input.display()),
    }
}

fn inspect(input: &Path) -> Result<()> {
    let components = read_input(input)?;
    let collection = load(&components).with_context(|| format!("loading {}", input.display()))?;
    let polygons = filter(collection);
    if polygons.is_empty() {
        tracing::warn!(input = %input.display(), "no polygon geometries found");
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&Summary::of_polygons(&polygons))?
    );
    Ok(())
}
