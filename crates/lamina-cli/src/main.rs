//! lamina CLI - slice STL models for additive manufacturing
//!
//! Slices meshes into G-code or SLC contour files, hollows them and
//! searches build orientations.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lamina_mesh::{read_stl, write_stl, Mesh};
use lamina_slicer::{
    hollow_mesh, layer_heights, optimize_orientation, slice, write_slc, LinkStrategy,
    OrientSettings, PrintSettings, SlicingStrategy,
};
use lamina_slicer_gcode::{write_gcode, GcodeFlavor, GcodeSettings, PrinterProfile};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lamina")]
#[command(about = "STL slicer for additive manufacturing", long_about = None)]
struct Cli {
    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Sweep,
    Match,
    Topological,
}

impl From<StrategyArg> for SlicingStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Sweep => SlicingStrategy::Sweep,
            StrategyArg::Match => SlicingStrategy::Match,
            StrategyArg::Topological => SlicingStrategy::Topological,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LinkArg {
    Lookup,
    Sort,
    Brute,
}

impl From<LinkArg> for LinkStrategy {
    fn from(arg: LinkArg) -> Self {
        match arg {
            LinkArg::Lookup => LinkStrategy::DictionaryLookup,
            LinkArg::Sort => LinkStrategy::DictionarySort,
            LinkArg::Brute => LinkStrategy::BruteForce,
        }
    }
}

/// Settings shared by the commands that slice.
#[derive(clap::Args, Default)]
struct SettingsArgs {
    /// TOML file with print settings
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Layer thickness (mm)
    #[arg(long)]
    layer: Option<f64>,
    /// Slicing strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,
    /// Segment linking strategy
    #[arg(long, value_enum)]
    link: Option<LinkArg>,
}

#[derive(Subcommand)]
enum Commands {
    /// Slice a model into G-code and/or SLC
    Slice {
        /// Input STL file
        input: PathBuf,
        /// G-code output (default: input with .gcode extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write layer contours as SLC
        #[arg(long)]
        slc: Option<PathBuf>,
        #[command(flatten)]
        settings: SettingsArgs,
        /// Generate support structures
        #[arg(long)]
        support: bool,
        /// Hollow the model with this wall thickness (mm)
        #[arg(long)]
        hollow: Option<f64>,
        /// Printer profile name
        #[arg(long, default_value = "generic")]
        printer: String,
        /// Override the printer's firmware flavor
        #[arg(long)]
        flavor: Option<String>,
    },
    /// Display information about an STL file
    Info {
        /// Input STL file
        input: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search the build orientation needing the least support
    Orient {
        /// Input STL file
        input: PathBuf,
        /// Write the rotated model here
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Swarm iterations
        #[arg(long, default_value_t = 30)]
        iterations: usize,
        /// Swarm size
        #[arg(long, default_value_t = 50)]
        population: usize,
        /// Random seed
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Hollow a model and write its contours as SLC
    Hollow {
        /// Input STL file
        input: PathBuf,
        /// Wall thickness (mm)
        #[arg(long)]
        wall: f64,
        /// SLC output
        #[arg(long)]
        slc: PathBuf,
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Slice {
            input,
            output,
            slc,
            settings,
            support,
            hollow,
            printer,
            flavor,
        } => {
            let mut profile = PrinterProfile::by_name(&printer)
                .with_context(|| format!("unknown printer profile: {printer}"))?;
            if let Some(name) = flavor {
                profile.flavor = GcodeFlavor::from_name(&name)
                    .with_context(|| format!("unknown G-code flavor: {name}"))?;
            }
            let mut print = load_settings(&settings)?;
            profile.apply_to(&mut print);
            print.support_enabled |= support;
            if hollow.is_some() {
                print.hollow_wall = hollow;
            }
            let output = output.unwrap_or_else(|| input.with_extension("gcode"));
            slice_file(&input, &output, slc.as_deref(), print, profile)?;
        }
        Commands::Info { input, json } => {
            show_info(&input, json)?;
        }
        Commands::Orient {
            input,
            output,
            iterations,
            population,
            seed,
        } => {
            let settings = OrientSettings {
                iterations,
                population,
                seed,
                ..Default::default()
            };
            orient_file(&input, output.as_deref(), &settings)?;
        }
        Commands::Hollow {
            input,
            wall,
            slc,
            settings,
        } => {
            let print = load_settings(&settings)?;
            hollow_file(&input, &slc, wall, &print)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Settings from the config file (or defaults) with command-line
/// overrides applied.
fn load_settings(args: &SettingsArgs) -> Result<PrintSettings> {
    let mut settings = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            parse_settings(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => PrintSettings::default(),
    };
    if let Some(layer) = args.layer {
        settings.layer_thickness = layer;
    }
    if let Some(strategy) = args.strategy {
        settings.slicing = strategy.into();
    }
    if let Some(link) = args.link {
        settings.linking = link.into();
    }
    settings.validate()?;
    Ok(settings)
}

fn parse_settings(text: &str) -> Result<PrintSettings> {
    Ok(toml::from_str(text)?)
}

fn load_mesh(path: &Path) -> Result<Mesh> {
    let mesh = read_stl(path).with_context(|| format!("loading {}", path.display()))?;
    if mesh.is_empty() {
        bail!("{} contains no triangles", path.display());
    }
    Ok(mesh)
}

fn slice_file(
    input: &Path,
    output: &Path,
    slc: Option<&Path>,
    print: PrintSettings,
    profile: PrinterProfile,
) -> Result<()> {
    let mesh = load_mesh(input)?.on_plate();
    let layers = slice(&mesh, &print)?;
    if layers.is_empty() {
        bail!("model is thinner than one layer");
    }

    let gcode = GcodeSettings::new(profile, &print);
    write_gcode(&layers, gcode, BufWriter::new(File::create(output)?))?;
    println!("Wrote {} layers to {}", layers.len(), output.display());

    if let Some(path) = slc {
        write_slc(&layers, BufWriter::new(File::create(path)?))?;
        println!("Wrote contours to {}", path.display());
    }
    Ok(())
}

/// Summary printed by `lamina info`.
#[derive(Debug, Serialize)]
struct ModelInfo {
    triangles: usize,
    surface_area: f64,
    min: [f64; 3],
    max: [f64; 3],
    size: [f64; 3],
    layers: usize,
}

impl ModelInfo {
    fn of(mesh: &Mesh) -> Option<Self> {
        let bounds = mesh.bounds()?;
        let size = bounds.extents();
        Some(Self {
            triangles: mesh.len(),
            surface_area: mesh.surface_area(),
            min: [bounds.min.x, bounds.min.y, bounds.min.z],
            max: [bounds.max.x, bounds.max.y, bounds.max.z],
            size: [size.x, size.y, size.z],
            layers: layer_heights(bounds.min.z, bounds.max.z, PrintSettings::default().layer_thickness).len(),
        })
    }
}

fn show_info(input: &Path, json: bool) -> Result<()> {
    let mesh = load_mesh(input)?;
    let Some(info) = ModelInfo::of(&mesh) else {
        bail!("{} has no bounds", input.display());
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let [x0, y0, z0] = info.min;
    let [x1, y1, z1] = info.max;
    let [sx, sy, sz] = info.size;
    println!("STL model: {}", input.display());
    println!("  Triangles: {}", info.triangles);
    println!("  Surface area: {:.2} mm²", info.surface_area);
    println!("  Bounds: ({x0:.3}, {y0:.3}, {z0:.3}) - ({x1:.3}, {y1:.3}, {z1:.3})");
    println!("  Size: {sx:.3} x {sy:.3} x {sz:.3} mm");
    println!("  Layers at default thickness: {}", info.layers);
    Ok(())
}

fn orient_file(input: &Path, output: Option<&Path>, settings: &OrientSettings) -> Result<()> {
    let mesh = load_mesh(input)?;
    let best = optimize_orientation(&mesh, settings, None)?;
    println!(
        "Best orientation: a={:.2}° b={:.2}° (support volume {:.1} mm³, {} iterations)",
        best.a.to_degrees(),
        best.b.to_degrees(),
        best.support_volume,
        best.iterations
    );

    if let Some(path) = output {
        let rotated = mesh.rotated(best.a, best.b, 0.0).on_plate();
        write_stl(&rotated, BufWriter::new(File::create(path)?))?;
        println!("Wrote rotated model to {}", path.display());
    }
    Ok(())
}

fn hollow_file(input: &Path, slc: &Path, wall: f64, print: &PrintSettings) -> Result<()> {
    let mesh = load_mesh(input)?.on_plate();
    let (layers, report) = hollow_mesh(&mesh, print, wall, &print.tolerance)?;
    info!(
        closed = report.closed,
        open = report.open,
        healed = report.healed,
        "Hollowed model"
    );
    write_slc(&layers, BufWriter::new(File::create(slc)?))?;
    println!(
        "Wrote {} hollowed layers to {} ({} contours healed)",
        layers.len(),
        slc.display(),
        report.healed
    );
    Ok(())
}
