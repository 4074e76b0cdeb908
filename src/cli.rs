// ============================================================================
// LayerFE CLI: headless batch processing via command-line arguments
// ============================================================================
//
// Usage examples:
//   layerfe -i photo.ppm --op blur --op greyscale -o result.png
//   layerfe -i *.png --op downscale=0.5 --output-dir small/ --format ppm
//   layerfe -i project.lfe --op sepia --all-layers -o flat.jpg --quality 85
//   layerfe --pattern checkerboard:4:8 --op mosaic=20 --seed 7 -o board.png
//
// Every input is loaded into a LayerStack (project files keep their layers,
// raster files become a single "Background" layer), the operations run in
// order on the current layer (or on every layer with --all-layers), and the
// effective export image or the whole project is written out.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Instant;

use clap::Parser;

use layerfe::canvas::Pixel;
use layerfe::error::{EditError, Result};
use layerfe::io::{DEFAULT_JPEG_QUALITY, SaveFormat, load_project, read_image, save_project, write_image};
use layerfe::layers::LayerStack;
use layerfe::ops::patterns::{Stripes, checkerboard, rainbow};
use layerfe::ops::{
    ColorTransformation, DownscaleOperation, FilterOperation, ImageOperation, MosaicOperation,
};

/// Name of the single layer created for flat raster inputs.
const BACKGROUND_LAYER: &str = "Background";

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// LayerFE headless image processor.
///
/// Apply filters, color transforms, downscaling and mosaics to images or
/// layered projects, and convert between formats.
#[derive(Parser, Debug)]
#[command(
    name = "layerfe",
    about = "LayerFE headless layer and image processor",
    long_about = "Apply image operations to raster files or layered .lfe projects without\n\
                  a GUI. Reads and writes PPM (P3), PNG, JPEG, BMP and LFE.\n\n\
                  Operations (repeat --op, applied in order):\n  \
                  blur, sharpen, greyscale, sepia, downscale=<x>[x<y>], mosaic=<seeds>\n\n\
                  Example:\n  \
                  layerfe -i photo.ppm --op blur --op greyscale -o result.png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.ppm").
    /// LFE project files retain all layers; other formats load as one layer.
    #[arg(short, long, num_args = 1.., required_unless_present = "pattern")]
    pub input: Vec<String>,

    /// Generate a synthetic input instead of reading one:
    /// checkerboard[:TILE[:TILES]] or rainbow[:WxH[:vertical]].
    #[arg(long, value_name = "PATTERN", conflicts_with = "input")]
    pub pattern: Option<PatternArg>,

    /// Operation to apply; repeat to chain.
    #[arg(long = "op", value_name = "OP")]
    pub ops: Vec<OpArg>,

    /// Seed for mosaic randomness. Without it every run differs.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Apply operations to every image-bearing layer instead of the current one.
    #[arg(long)]
    pub all_layers: bool,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: ppm, png, jpeg, bmp, lfe.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100).
    #[arg(short, long, default_value_t = DEFAULT_JPEG_QUALITY, value_name = "1-100",
          value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Log debug output and print per-file timing.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Operation and pattern arguments
// ============================================================================

/// One `--op` argument.
#[derive(Clone, Debug, PartialEq)]
pub enum OpArg {
    Blur,
    Sharpen,
    Greyscale,
    Sepia,
    Downscale { x: f64, y: f64 },
    Mosaic { seeds: usize },
}

impl FromStr for OpArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (name, arg) = match s.split_once('=') {
            Some((n, a)) => (n, Some(a)),
            None => (s, None),
        };
        let op = match (name.to_lowercase().as_str(), arg) {
            ("blur", None) => OpArg::Blur,
            ("sharpen", None) => OpArg::Sharpen,
            ("greyscale" | "grayscale", None) => OpArg::Greyscale,
            ("sepia", None) => OpArg::Sepia,
            ("downscale", Some(a)) => {
                let (x, y) = match a.split_once('x') {
                    Some((x, y)) => (parse_arg(x, s)?, parse_arg(y, s)?),
                    None => {
                        let v = parse_arg(a, s)?;
                        (v, v)
                    }
                };
                OpArg::Downscale { x, y }
            }
            ("mosaic", Some(a)) => OpArg::Mosaic { seeds: parse_arg(a, s)? },
            _ => return Err(format!("unknown operation '{}'", s)),
        };
        Ok(op)
    }
}

impl OpArg {
    /// Build the operation. Mosaics use `seed` when given, OS entropy otherwise.
    pub fn build(&self, seed: Option<u64>) -> Result<Box<dyn ImageOperation>> {
        let op: Box<dyn ImageOperation> = match *self {
            OpArg::Blur => Box::new(FilterOperation::blur()),
            OpArg::Sharpen => Box::new(FilterOperation::sharpen()),
            OpArg::Greyscale => Box::new(ColorTransformation::greyscale()),
            OpArg::Sepia => Box::new(ColorTransformation::sepia()),
            OpArg::Downscale { x, y } => Box::new(DownscaleOperation::new(x, y)?),
            OpArg::Mosaic { seeds } => match seed {
                Some(s) => Box::new(MosaicOperation::seeded(seeds, s)?),
                None => Box::new(MosaicOperation::from_os_rng(seeds)?),
            },
        };
        Ok(op)
    }
}

/// A `--pattern` argument.
#[derive(Clone, Debug, PartialEq)]
pub enum PatternArg {
    Checkerboard { tile: usize, tiles: usize },
    Rainbow { width: usize, height: usize, stripes: Stripes },
}

impl FromStr for PatternArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let kind = parts.next().unwrap_or("").to_lowercase();
        let parsed = match kind.as_str() {
            "checkerboard" => PatternArg::Checkerboard {
                tile: parts.next().map(|p| parse_arg(p, s)).transpose()?.unwrap_or(8),
                tiles: parts.next().map(|p| parse_arg(p, s)).transpose()?.unwrap_or(8),
            },
            "rainbow" => {
                let (width, height) = match parts.next() {
                    Some(dims) => {
                        let (w, h) = dims
                            .split_once('x')
                            .ok_or_else(|| format!("expected WxH in '{}'", s))?;
                        (parse_arg(w, s)?, parse_arg(h, s)?)
                    }
                    None => (140, 70),
                };
                let stripes = match parts.next() {
                    None | Some("horizontal") => Stripes::Horizontal,
                    Some("vertical") => Stripes::Vertical,
                    Some(other) => return Err(format!("unknown stripe direction '{}'", other)),
                };
                PatternArg::Rainbow { width, height, stripes }
            }
            _ => return Err(format!("unknown pattern '{}'", s)),
        };
        if parts.next().is_some() {
            return Err(format!("too many fields in pattern '{}'", s));
        }
        Ok(parsed)
    }
}

impl PatternArg {
    fn stem(&self) -> &'static str {
        match self {
            PatternArg::Checkerboard { .. } => "checkerboard",
            PatternArg::Rainbow { .. } => "rainbow",
        }
    }

    fn render(&self) -> Result<layerfe::canvas::Image> {
        match *self {
            PatternArg::Checkerboard { tile, tiles } => {
                checkerboard(tile, tiles, Pixel::BLACK, Pixel::WHITE)
            }
            PatternArg::Rainbow { width, height, stripes } => rainbow(width, height, stripes),
        }
    }
}

fn parse_arg<T: FromStr>(value: &str, whole: &str) -> std::result::Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid value '{}' in '{}'", value, whole))
}

// ============================================================================
// Public entry point
// ============================================================================

/// Where one job's layers come from.
enum Source {
    File(PathBuf),
    Pattern(PatternArg),
}

impl Source {
    fn label(&self) -> String {
        match self {
            Source::File(p) => p.display().to_string(),
            Source::Pattern(p) => format!("<{}>", p.stem()),
        }
    }

    fn stem(&self) -> Option<String> {
        match self {
            Source::File(p) => p.file_stem().map(|s| s.to_string_lossy().into_owned()),
            Source::Pattern(p) => Some(p.stem().to_string()),
        }
    }
}

/// Run all CLI processing and return an OS exit code.
/// `0` = all inputs succeeded, `1` = one or more failed.
pub fn run(args: CliArgs) -> ExitCode {
    let sources: Vec<Source> = match &args.pattern {
        Some(p) => vec![Source::Pattern(p.clone())],
        None => resolve_inputs(&args.input).into_iter().map(Source::File).collect(),
    };
    if sources.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if sources.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            sources.len()
        );
        return ExitCode::FAILURE;
    }

    let save_format = match parse_format(args.format.as_deref(), args.output.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let total = sources.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, source) in sources.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, source.label());
        }
        let file_start = Instant::now();

        let Some(output_path) = build_output_path(source, &args, save_format) else {
            eprintln!("  error: cannot determine output path for '{}'.", source.label());
            any_failure = true;
            continue;
        };

        match run_one(source, &output_path, &args, save_format) {
            Ok(()) => {
                log::info!("wrote {}", output_path.display());
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log::error!("{}: {}", source.label(), e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-input processing pipeline
// ============================================================================

fn run_one(source: &Source, output: &Path, args: &CliArgs, format: SaveFormat) -> Result<()> {
    // -- Step 1: Load ----------------------------------------------------
    let mut stack = load_stack(source)?;

    // -- Step 2: Apply operations ----------------------------------------
    for arg in &args.ops {
        let op = arg.build(args.seed)?;
        if args.all_layers {
            stack.apply_to_all(op.as_ref())?;
        } else {
            let target = stack
                .current_name()
                .ok_or_else(|| EditError::IllegalState("no current layer to apply to".into()))?
                .to_string();
            stack.apply_operation(&target, op.as_ref())?;
        }
    }

    // -- Step 3: Save ----------------------------------------------------
    match format {
        SaveFormat::Lfe => save_project(&stack, File::create(output)?),
        _ => {
            let image = stack.effective_image()?;
            write_image(&image, File::create(output)?, format, args.quality)
        }
    }
}

/// Load a project as-is, or a single image into a fresh one-layer stack.
fn load_stack(source: &Source) -> Result<LayerStack> {
    let image = match source {
        Source::Pattern(p) => p.render()?,
        Source::File(path) => {
            let format = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(SaveFormat::from_extension)
                .ok_or_else(|| {
                    EditError::Unsupported(format!("unrecognised file type '{}'", path.display()))
                })?;
            let reader = BufReader::new(File::open(path)?);
            if format == SaveFormat::Lfe {
                return load_project(reader);
            }
            read_image(reader, format)?
        }
    };

    let mut stack = LayerStack::new();
    stack.add_layer(BACKGROUND_LAYER)?;
    stack.set_layer_image(BACKGROUND_LAYER, image)?;
    Ok(stack)
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    log::warn!("pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                log::warn!("invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the [`SaveFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to PNG when neither is given; an explicit
/// but unknown format is an error.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<SaveFormat> {
    if let Some(f) = format_arg {
        return SaveFormat::from_extension(f)
            .ok_or_else(|| EditError::Unsupported(format!("unknown output format '{}'", f)));
    }

    let inferred = output
        .and_then(|out| out.extension())
        .and_then(|e| e.to_str())
        .and_then(SaveFormat::from_extension);
    Ok(inferred.unwrap_or_default())
}

/// Compute the output path for a single input.
///
/// Priority:
/// 1. `--output` (explicit path, used for single input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: next to the input (or the working directory for patterns),
///    same stem, new extension; `_out` is appended if that would overwrite
///    the input
fn build_output_path(source: &Source, args: &CliArgs, format: SaveFormat) -> Option<PathBuf> {
    if let Some(out) = &args.output {
        return Some(out.clone());
    }

    let ext = format.extension();
    let stem = source.stem()?;

    if let Some(dir) = &args.output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let (parent, input) = match source {
        Source::File(p) => (p.parent().unwrap_or(Path::new(".")), Some(p.as_path())),
        Source::Pattern(_) => (Path::new("."), None),
    };
    let candidate = parent.join(format!("{}.{}", stem, ext));

    if Some(candidate.as_path()) == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}
