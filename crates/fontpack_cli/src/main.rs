//! Font atlas packer CLI
//!
//! Rasterizes a font's glyphs into one square RGBA texture and prints the
//! per-glyph UV and pen metrics.

use anyhow::{Context, Result};
use clap::Parser;
use fontpack::{
    build_atlas, code_point_label, AtlasParams, CharSet, FontFace, MissingGlyph, PackedAtlas,
    SwashRasterizer,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::PackConfig;

#[derive(Parser, Debug)]
#[command(name = "pack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pack a font's glyphs into a texture atlas", long_about = None)]
struct Cli {
    /// TrueType/OpenType font file
    font: PathBuf,

    /// Glyph cell width in pixels
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    cell_width: u32,

    /// Glyph cell height in pixels (defaults to the width)
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    cell_height: Option<u32>,

    /// Padding after each column in pixels
    #[arg(short, long)]
    padding: Option<u32>,

    /// Literal characters to pack (replaces the default Latin-1 set)
    #[arg(long)]
    chars: Option<String>,

    /// Code point ranges to pack, e.g. 0x20-0x7E (repeatable)
    #[arg(long = "range")]
    ranges: Vec<String>,

    /// Fail on code points the font has no glyph for
    #[arg(long)]
    strict: bool,

    /// Directory for the PNG and JSON outputs
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write the metric table as JSON
    #[arg(long)]
    json: bool,

    /// Do not print the metric table
    #[arg(short, long)]
    quiet: bool,

    /// Config file (defaults to ./fontpack.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Fully resolved settings for one run
#[derive(Debug)]
struct PackJob {
    font: PathBuf,
    params: AtlasParams,
    charset: CharSet,
    missing: MissingGlyph,
    output_dir: PathBuf,
    json: bool,
}

impl PackJob {
    fn resolve(cli: &Cli, config: &PackConfig) -> Result<Self> {
        let cell_height = cli.cell_height.unwrap_or(cli.cell_width);
        let padding = cli.padding.unwrap_or(config.atlas.padding);

        let charset = if cli.chars.is_some() || !cli.ranges.is_empty() {
            charset_from(cli.chars.as_deref(), &cli.ranges)?
        } else if config.atlas.chars.is_some() || !config.atlas.ranges.is_empty() {
            charset_from(config.atlas.chars.as_deref(), &config.atlas.ranges)?
        } else {
            CharSet::latin1()
        };

        let missing = if cli.strict || config.atlas.strict {
            MissingGlyph::Error
        } else {
            MissingGlyph::Notdef
        };

        let output_dir = cli
            .output_dir
            .clone()
            .or_else(|| config.output.dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            font: cli.font.clone(),
            params: AtlasParams::new(cli.cell_width, cell_height).with_padding(padding),
            charset,
            missing,
            output_dir,
            json: cli.json || config.output.json,
        })
    }

    /// `<font-basename>_<W>x<H>`
    fn output_stem(&self) -> String {
        let base = self
            .font
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "font".to_string());
        format!("{}_{}x{}", base, self.params.cell_width, self.params.cell_height)
    }

    fn png_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.png", self.output_stem()))
    }

    fn json_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.json", self.output_stem()))
    }
}

fn charset_from(chars: Option<&str>, ranges: &[String]) -> Result<CharSet> {
    let mut set = chars.map(CharSet::from_text).unwrap_or_default();
    for spec in ranges {
        let parsed = CharSet::parse_ranges(spec)
            .with_context(|| format!("Invalid code point range '{}'", spec))?;
        set.extend(parsed.iter());
    }
    Ok(set)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for the metric listing
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = match &cli.config {
        Some(path) => PackConfig::load(path)?,
        None => PackConfig::load_from_dir(Path::new("."))?,
    };
    let job = PackJob::resolve(&cli, &config)?;

    let atlas = pack(&job)?;
    let png_path = write_outputs(&job, &atlas)?;

    println!("\nFont atlas saved to '{}'", png_path.display());
    if !cli.quiet {
        println!("\nCharacter Metrics (UVs, dimensions, advance, bearing):");
        for (code_point, metric) in atlas.glyphs() {
            println!("  {}: {}", code_point_label(*code_point), metric);
        }
    }
    Ok(())
}

fn pack(job: &PackJob) -> Result<PackedAtlas> {
    info!(
        "Packing {} code points from {} at {}x{}",
        job.charset.len(),
        job.font.display(),
        job.params.cell_width,
        job.params.cell_height
    );

    let font = FontFace::from_file(&job.font)?;
    let mut rasterizer = SwashRasterizer::new(&font)?.with_missing_glyph(job.missing);
    rasterizer.set_pixel_size(job.params.cell_width, job.params.cell_height)?;

    build_atlas(&mut rasterizer, &job.params, &job.charset)
        .with_context(|| format!("Failed to build atlas for {}", job.font.display()))
}

/// Write the PNG (and JSON when requested); returns the PNG path
///
/// The JSON is serialized before anything touches the disk, and the PNG is
/// removed again if the JSON cannot be written.
fn write_outputs(job: &PackJob, atlas: &PackedAtlas) -> Result<PathBuf> {
    let png_path = job.png_path();
    let json = if job.json {
        let image_name = png_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        Some(atlas.metadata(image_name).to_json_pretty()?)
    } else {
        None
    };

    std::fs::create_dir_all(&job.output_dir)
        .with_context(|| format!("Failed to create {}", job.output_dir.display()))?;

    atlas.save_png(&png_path)?;

    if let Some(json) = json {
        let json_path = job.json_path();
        if let Err(e) = std::fs::write(&json_path, json) {
            if let Err(cleanup) = std::fs::remove_file(&png_path) {
                warn!("Failed to remove {}: {}", png_path.display(), cleanup);
            }
            return Err(e).with_context(|| format!("Failed to write {}", json_path.display()));
        }
        info!("Metrics written to {}", json_path.display());
    }
    Ok(png_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pack").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_requires_font_and_width() {
        assert!(Cli::try_parse_from(["pack"]).is_err());
        assert!(Cli::try_parse_from(["pack", "arial.ttf"]).is_err());
        assert!(Cli::try_parse_from(["pack", "arial.ttf", "0"]).is_err());
        assert!(Cli::try_parse_from(["pack", "arial.ttf", "eight"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let job = PackJob::resolve(&cli(&["fonts/arial.ttf", "8"]), &PackConfig::default()).unwrap();
        assert_eq!(job.params, AtlasParams::new(8, 8));
        assert_eq!(job.charset, CharSet::latin1());
        assert_eq!(job.missing, MissingGlyph::Notdef);
        assert!(!job.json);
        assert_eq!(job.png_path(), PathBuf::from("./arial.ttf_8x8.png"));
    }

    #[test]
    fn test_explicit_height_and_output() {
        let job = PackJob::resolve(
            &cli(&["arial.ttf", "8", "12", "-o", "out", "--json", "-p", "2"]),
            &PackConfig::default(),
        )
        .unwrap();
        assert_eq!(job.params, AtlasParams::new(8, 12).with_padding(2));
        assert_eq!(job.png_path(), PathBuf::from("out/arial.ttf_8x12.png"));
        assert_eq!(job.json_path(), PathBuf::from("out/arial.ttf_8x12.json"));
        assert!(job.json);
    }

    #[test]
    fn test_cli_charset_overrides_config() {
        let config = PackConfig::parse("[atlas]\nchars = \"xyz\"\npadding = 3").unwrap();
        let job = PackJob::resolve(
            &cli(&["a.ttf", "16", "--chars", "AB", "--range", "0x20"]),
            &config,
        )
        .unwrap();
        assert_eq!(job.charset.iter().collect::<Vec<_>>(), vec![0x41, 0x42, 0x20]);
        assert_eq!(job.params.padding, 3);

        let job = PackJob::resolve(&cli(&["a.ttf", "16"]), &config).unwrap();
        assert_eq!(job.charset, CharSet::from_text("xyz"));
    }

    #[test]
    fn test_config_strict_and_output() {
        let config =
            PackConfig::parse("[atlas]\nstrict = true\n[output]\ndir = \"atlas\"\njson = true")
                .unwrap();
        let job = PackJob::resolve(&cli(&["a.ttf", "16"]), &config).unwrap();
        assert_eq!(job.missing, MissingGlyph::Error);
        assert_eq!(job.output_dir, PathBuf::from("atlas"));
        assert!(job.json);
    }

    #[test]
    fn test_bad_range_is_error() {
        let result = PackJob::resolve(&cli(&["a.ttf", "16", "--range", "0x7E-0x20"]), &PackConfig::default());
        assert!(result.is_err());
    }

    struct SquareSource;

    impl fontpack::GlyphSource for SquareSource {
        fn rasterize(&mut self, _code_point: u32) -> fontpack::Result<fontpack::RasterGlyph> {
            Ok(fontpack::RasterGlyph {
                width: 4,
                height: 4,
                coverage: vec![255; 16],
                bearing_x: 0,
                bearing_y: 4,
                advance_x: 5 * 64,
                advance_y: 0,
            })
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fontpack_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn job_in(dir: &Path, json: bool) -> PackJob {
        let mut args = vec!["font.ttf", "8", "-o", dir.to_str().unwrap(), "--chars", "ab"];
        if json {
            args.push("--json");
        }
        PackJob::resolve(&cli(&args), &PackConfig::default()).unwrap()
    }

    #[test]
    fn test_write_outputs() {
        let dir = scratch_dir("outputs");
        let job = job_in(&dir, true);
        let atlas = build_atlas(&mut SquareSource, &job.params, &job.charset).unwrap();

        let png = write_outputs(&job, &atlas).unwrap();
        assert_eq!(png, dir.join("font.ttf_8x8.png"));
        assert!(png.exists());
        let json = std::fs::read_to_string(job.json_path()).unwrap();
        assert!(json.contains("font.ttf_8x8.png"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_failed_json_write_leaves_no_png() {
        let dir = scratch_dir("json_fail");
        let job = job_in(&dir, true);
        // A directory where the JSON file should go makes the write fail
        std::fs::create_dir_all(job.json_path()).unwrap();
        let atlas = build_atlas(&mut SquareSource, &job.params, &job.charset).unwrap();

        assert!(write_outputs(&job, &atlas).is_err());
        assert!(!job.png_path().exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_font_fails() {
        let job = PackJob::resolve(&cli(&["/nonexistent/fontpack.ttf", "8"]), &PackConfig::default())
            .unwrap();
        assert!(pack(&job).is_err());
    }
}
