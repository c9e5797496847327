//! TemplateTx CLI - Bridge interface for tooling
//!
//! Commands: digest, apply
//! Reads a JSON template document, outputs JSON to stdout
//! Returns 2 when the transaction fails

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use templatetx_core::{
    begin,
    operators::{Axis, Fill, Mirror, RecomputeHeader, Remove, Rename, Replace, Rotate, Translate},
    template_digest, BlockData, Position, Region, Template, TransactionConfig, TransactionError,
};

#[derive(Parser)]
#[command(name = "templatetx-cli")]
#[command(about = "TemplateTx CLI - apply operator pipelines to voxel templates")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the content digest of a template
    Digest {
        /// Template document (JSON), `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
    },

    /// Apply built-in operators and print the resulting template
    ///
    /// Within a phase, operators run in this order: fill, replace, remove,
    /// rotate, mirror, translate, rename, recompute-header.
    Apply {
        /// Template document (JSON), `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Fill a box with one block kind, as `x,y,z;x,y,z=kind`
        #[arg(long, value_parser = parse_fill, allow_hyphen_values = true)]
        fill: Vec<(Region, String)>,

        /// Replace one block kind with another, as `from=to`
        #[arg(long, value_parser = parse_replacement)]
        replace: Vec<(String, String)>,

        /// Drop every block of this kind
        #[arg(long)]
        remove: Vec<String>,

        /// Clockwise quarter turns about the Y axis through --origin
        #[arg(long, allow_hyphen_values = true)]
        rotate: Option<i32>,

        /// Mirror across the plane through --origin perpendicular to this axis
        #[arg(long, value_parser = parse_axis)]
        mirror: Option<Axis>,

        /// Translate every block, as `x,y,z`
        #[arg(long, value_parser = parse_position, allow_hyphen_values = true)]
        translate: Option<Position>,

        /// Pivot for rotate and mirror, as `x,y,z`
        #[arg(
            long,
            value_parser = parse_position,
            allow_hyphen_values = true,
            default_value = "0,0,0"
        )]
        origin: Position,

        /// New template name
        #[arg(long)]
        rename: Option<String>,

        /// Recompute bounds and material requirements
        #[arg(long)]
        recompute_header: bool,

        /// Maximum positions a single --fill may create
        #[arg(long)]
        position_limit: Option<usize>,
    },
}

fn parse_position(s: &str) -> Result<Position, String> {
    let parts: Vec<_> = s.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [x, y, z] => {
            let coord = |v: &str| {
                v.parse::<i32>()
                    .map_err(|e| format!("invalid coordinate '{}': {}", v, e))
            };
            Ok(Position::new(coord(x)?, coord(y)?, coord(z)?))
        }
        _ => Err(format!("expected x,y,z but got '{}'", s)),
    }
}

fn parse_axis(s: &str) -> Result<Axis, String> {
    match s.to_ascii_lowercase().as_str() {
        "x" => Ok(Axis::X),
        "y" => Ok(Axis::Y),
        "z" => Ok(Axis::Z),
        _ => Err(format!("expected x, y or z but got '{}'", s)),
    }
}

fn parse_replacement(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(from, to)| (from.trim().to_string(), to.trim().to_string()))
        .filter(|(from, to)| !from.is_empty() && !to.is_empty())
        .ok_or_else(|| format!("expected from=to but got '{}'", s))
}

fn parse_fill(s: &str) -> Result<(Region, String), String> {
    let (corners, kind) = s
        .split_once('=')
        .ok_or_else(|| format!("expected x,y,z;x,y,z=kind but got '{}'", s))?;
    let (a, b) = corners
        .split_once(';')
        .ok_or_else(|| format!("expected two corners separated by ';' but got '{}'", corners))?;
    let kind = kind.trim();
    if kind.is_empty() {
        return Err(format!("missing block kind in '{}'", s));
    }
    Ok((Region::new(parse_position(a)?, parse_position(b)?), kind.to_string()))
}

fn read_template(path: &Path) -> Result<Template, String> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        buf
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?
    };
    Template::from_json(&content).map_err(|e| format!("Invalid template: {}", e))
}

fn print_error(error: &str) {
    let output = serde_json::json!({
        "success": false,
        "error": error,
    });
    println!("{}", output);
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Digest { input } => {
            let template = match read_template(&input) {
                Ok(t) => t,
                Err(e) => {
                    print_error(&e);
                    return ExitCode::FAILURE;
                }
            };

            match template_digest(&template) {
                Ok(digest) => {
                    let output = serde_json::json!({
                        "name": template.header().name,
                        "blocks": template.len(),
                        "digest": digest,
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    print_error(&e.to_string());
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Apply {
            input,
            fill,
            replace,
            remove,
            rotate,
            mirror,
            translate,
            origin,
            rename,
            recompute_header,
            position_limit,
        } => {
            let base = match read_template(&input) {
                Ok(t) => t,
                Err(e) => {
                    print_error(&e);
                    return ExitCode::FAILURE;
                }
            };

            let mut config = TransactionConfig::new();
            if let Some(limit) = position_limit {
                config = config.with_position_limit(limit);
            }

            let result = (|| -> Result<Template, TransactionError> {
                let mut tx = begin(&base).with_config(config);
                for (region, kind) in fill {
                    tx.operate(Fill::new(region, BlockData::new(kind)))?;
                }
                for (from, to) in replace {
                    tx.operate(Replace::new(from, BlockData::new(to)))?;
                }
                for kind in remove {
                    tx.operate(Remove::new(kind))?;
                }
                if let Some(turns) = rotate {
                    tx.operate(Rotate::new(origin, turns))?;
                }
                if let Some(axis) = mirror {
                    tx.operate(Mirror::new(axis, origin))?;
                }
                if let Some(offset) = translate {
                    tx.operate(Translate::new(offset))?;
                }
                if let Some(name) = rename {
                    tx.operate(Rename::new(name))?;
                }
                if recompute_header {
                    tx.operate(RecomputeHeader)?;
                }
                tx.execute(None)
            })();

            match result {
                Ok(template) => {
                    let digest = match template_digest(&template) {
                        Ok(d) => d,
                        Err(e) => {
                            print_error(&e.to_string());
                            return ExitCode::FAILURE;
                        }
                    };
                    let output = serde_json::json!({
                        "success": true,
                        "digest": digest,
                        "template": template.to_document(),
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    print_error(&e.to_string());
                    ExitCode::from(2)
                }
            }
        }
    }
}
