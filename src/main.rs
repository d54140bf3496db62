use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use svgsafe::collection::{AssetPayload, export_filename};
use svgsafe::raster::{RasterSurface, svg_to_pdf};
use svgsafe::{
    EngineConfig, FsSink, RenderCascade, classify, drive, normalize_content, to_data_uri,
    try_export_as_file,
};

/// Normalize untrusted SVG strings and render them through a fallback cascade
#[derive(Parser, Debug)]
#[command(name = "svgsafe")]
#[command(version)]
#[command(about = "Make untrusted SVG content safe and visible", long_about = None)]
struct Args {
    /// Engine config file (TOML or YAML)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the detected form of the input
    Classify {
        /// Input file (use "-" for stdin)
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
    /// Write canonical markup (extension picks .svg, .png or .pdf)
    Normalize {
        /// Input file (use "-" for stdin)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file path; prints SVG to stdout when omitted
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Raster scale multiplier for PNG output
        #[arg(long, default_value_t = 1.0)]
        png_scale: f32,
    },
    /// Print the canonical markup as a base64 data URI
    DataUri {
        /// Input file (use "-" for stdin)
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
    /// Run the render cascade against the built-in rasterizer
    Render {
        /// Input file (use "-" for stdin)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Skip system font discovery
        #[arg(long)]
        no_fonts: bool,
    },
    /// Export every SVG in an extraction result as canonical files
    Batch {
        /// JSON result (or bare assets object) to read
        #[arg(value_name = "PAYLOAD")]
        payload: PathBuf,

        /// Directory to write into
        #[arg(short, long, value_name = "DIR")]
        dir: PathBuf,
    },
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<(), String> {
    let args = Args::parse();

    let config = match args.config {
        Some(ref path) if path.is_file() => EngineConfig::from_file(path)
            .map_err(|e| format!("Failed to load config {}: {}", path.display(), e))?,
        Some(ref path) => return Err(format!("Config file not found: {}", path.display())),
        None => EngineConfig::default(),
    };

    match args.command {
        Command::Classify { input } => {
            let content = read_input(&input)?;
            println!("{}", classify(&content));
        }
        Command::Normalize {
            input,
            output,
            png_scale,
        } => {
            let content = read_input(&input)?;
            let markup = normalize_content(&content, &config);
            match output {
                Some(output) => write_output(&output, markup.as_str(), png_scale)?,
                None => println!("{markup}"),
            }
        }
        Command::DataUri { input } => {
            let content = read_input(&input)?;
            println!("{}", to_data_uri(&normalize_content(&content, &config)));
        }
        Command::Render { input, no_fonts } => {
            let content = read_input(&input)?;
            let mut surface = if no_fonts {
                RasterSurface::without_fonts()
            } else {
                RasterSurface::new()
            };
            let mut cascade = RenderCascade::new(content, config);
            let outcome = drive(&mut cascade, &mut surface);

            eprintln!("Form: {}", cascade.form());
            for (step, strategy) in cascade.transitions().iter().enumerate() {
                eprintln!("  {}. {}", step + 1, strategy);
            }
            if outcome.is_terminal() {
                return Err(svgsafe::cascade::RENDER_FAILED_MESSAGE.to_string());
            }
            println!("{outcome}");
        }
        Command::Batch { payload, dir } => {
            let json = std::fs::read_to_string(&payload)
                .map_err(|e| format!("Failed to read payload: {}", e))?;
            let assets = AssetPayload::from_json(&json)
                .map_err(|e| format!("Failed to parse payload: {}", e))?;
            std::fs::create_dir_all(&dir)
                .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;

            let mut sink = FsSink::new(&dir);
            let mut written = 0;
            for (kind, index, content) in assets.entries() {
                let filename = export_filename(kind, index);
                match try_export_as_file(content, Some(filename.as_str()), &mut sink, &config) {
                    Ok(_) => written += 1,
                    Err(e) => eprintln!("Skipped {}: {}", filename, e),
                }
            }
            eprintln!(
                "Exported {} of {} assets to: {}",
                written,
                assets.len(),
                dir.display()
            );
        }
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Args::command(), "svgsafe", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn read_input(input: &Path) -> Result<String, String> {
    if input.to_str() == Some("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input).map_err(|e| format!("Failed to read input file: {}", e))
    }
}

fn write_output(output: &Path, svg: &str, png_scale: f32) -> Result<(), String> {
    let output_ext = output
        .extension()
        .and_then(|e| e.to_str())
        .ok_or("Output file has no extension")?
        .to_ascii_lowercase();

    match output_ext.as_str() {
        "svg" => {
            std::fs::write(output, svg).map_err(|e| format!("Failed to write SVG: {}", e))?;
            eprintln!("SVG saved to: {}", output.display());
        }
        "png" => {
            let png_data = RasterSurface::new()
                .svg_to_png(svg, png_scale)
                .map_err(|e| e.to_string())?;
            std::fs::write(output, png_data).map_err(|e| format!("Failed to write PNG: {}", e))?;
            eprintln!("PNG saved to: {}", output.display());
        }
        "pdf" => {
            let pdf_data = svg_to_pdf(svg).map_err(|e| e.to_string())?;
            std::fs::write(output, pdf_data).map_err(|e| format!("Failed to write PDF: {}", e))?;
            eprintln!("PDF saved to: {}", output.display());
        }
        _ => {
            return Err(format!(
                "Unsupported output format: .{} (use .svg, .png or .pdf)",
                output_ext
            ));
        }
    }

    Ok(())
}
