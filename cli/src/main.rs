//! docmark CLI - office document to Markdown conversion with images

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docmark::{
    CleanupOptions, CleanupPreset, Config, DocumentFormat, ExtractOptions, ExtractionResult,
    ExtractionStatus, Extractor, MarkdownMode,
};

#[derive(Parser)]
#[command(name = "docmark")]
#[command(version)]
#[command(about = "Convert PDF, DOCX, PPTX and XLSX to Markdown with images in reading order", long_about = None)]
struct Cli {
    /// JSON configuration file; command-line flags override its values
    #[arg(long, global = true, env = "DOCMARK_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert documents to Markdown, writing images alongside
    #[command(alias = "md")]
    Convert {
        /// Input documents
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,

        /// Markdown mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Text cleanup preset
        #[arg(long, value_enum)]
        cleanup: Option<CleanupLevel>,

        /// Skip image extraction
        #[arg(long)]
        no_images: bool,

        /// Omit page, slide and sheet headings
        #[arg(long)]
        no_container_headings: bool,

        /// Print the result record as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Extract images and print their Markdown references
    Images {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        extract: ExtractArgs,

        /// How the references are listed
        #[arg(long, value_enum, default_value = "simple")]
        mode: ImageListArg,

        /// Write the references to this file instead of stdout
        #[arg(long, value_name = "FILE")]
        list: Option<PathBuf>,
    },

    /// Show document format, capability and content statistics
    Info {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct ExtractArgs {
    /// Directory the Markdown is written to (default: next to the document)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Directory images are written to (default: <OUTPUT>/images/<stem>)
    #[arg(long, value_name = "DIR")]
    images_dir: Option<PathBuf>,

    /// Drop PDF images smaller than this many pixels on either side
    #[arg(long, value_name = "PIXELS")]
    min_image_size: Option<u32>,

    /// Write identical images only once
    #[arg(long)]
    dedup: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Text, tables and images in reading order
    Full,
    /// Image references as a flat list
    Simple,
    /// Image references under one heading per page, slide or sheet
    Grouped,
    /// Image references separated by blank lines
    Inline,
}

impl From<ModeArg> for MarkdownMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Full => MarkdownMode::FullContent,
            ModeArg::Simple => MarkdownMode::Simple,
            ModeArg::Grouped => MarkdownMode::Grouped,
            ModeArg::Inline => MarkdownMode::Inline,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ImageListArg {
    Simple,
    Grouped,
    Inline,
}

impl From<ImageListArg> for MarkdownMode {
    fn from(mode: ImageListArg) -> Self {
        match mode {
            ImageListArg::Simple => MarkdownMode::Simple,
            ImageListArg::Grouped => MarkdownMode::Grouped,
            ImageListArg::Inline => MarkdownMode::Inline,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CleanupLevel {
    /// No cleanup
    None,
    /// Unicode normalization only
    Minimal,
    /// Standard cleanup (default)
    Standard,
    /// Standard plus bullet and symbol-font cleanup
    Aggressive,
}

impl From<CleanupLevel> for Option<CleanupOptions> {
    fn from(level: CleanupLevel) -> Self {
        let preset = match level {
            CleanupLevel::None => return None,
            CleanupLevel::Minimal => CleanupPreset::Minimal,
            CleanupLevel::Standard => CleanupPreset::Standard,
            CleanupLevel::Aggressive => CleanupPreset::Aggressive,
        };
        Some(CleanupOptions::from_preset(preset))
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = load_options(cli.config.as_deref()).and_then(|base| match cli.command {
        Commands::Convert {
            inputs,
            extract,
            mode,
            cleanup,
            no_images,
            no_container_headings,
            json,
        } => {
            let mut options = extract.apply(base);
            if let Some(mode) = mode {
                options.render.mode = mode.into();
            }
            if let Some(level) = cleanup {
                options.render.cleanup = level.into();
            }
            if no_images {
                options.images_enabled = false;
            }
            if no_container_headings {
                options.render.container_headings = false;
            }
            cmd_convert(&inputs, options, json)
        }
        Commands::Images {
            input,
            extract,
            mode,
            list,
        } => {
            let mut options = extract.apply(base);
            options.render.mode = mode.into();
            options.images_enabled = true;
            cmd_images(&input, options, list.as_deref())
        }
        Commands::Info { input } => cmd_info(&input, base),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    });

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_options(config: Option<&Path>) -> Result<ExtractOptions, Box<dyn std::error::Error>> {
    match config {
        Some(path) => Ok(Config::load(path)?.to_options()),
        None => Ok(Config::default().to_options()),
    }
}

impl ExtractArgs {
    fn apply(self, mut options: ExtractOptions) -> ExtractOptions {
        if let Some(dir) = self.output {
            options.markdown_dir = Some(dir);
        }
        if let Some(dir) = self.images_dir {
            options.output_dir = Some(dir);
        }
        if let Some(pixels) = self.min_image_size {
            options.parse.min_image_size = pixels;
        }
        if self.dedup {
            options.deduplicate_images = true;
        }
        options
    }
}

fn cmd_convert(inputs: &[PathBuf], options: ExtractOptions, json: bool) -> CliResult {
    let pb = if inputs.len() > 1 && !json {
        let pb = ProgressBar::new(inputs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut failures = 0usize;
    for input in inputs {
        if let Some(pb) = &pb {
            pb.set_message(file_name(input));
        }

        // A shared output directory would mix the images of several documents.
        let mut doc_options = options.clone();
        if inputs.len() > 1 {
            if let Some(dir) = &options.output_dir {
                doc_options.output_dir = Some(dir.join(stem(input)));
            }
        }

        let result = Extractor::with_options(doc_options.clone()).extract(input);
        if result.success() {
            let md_path = markdown_path(input, &doc_options);
            result.write_markdown(&md_path)?;
            if json {
                println!("{}", result.to_json()?);
            } else {
                let line = summary_line(&result, &md_path);
                match &pb {
                    Some(pb) => pb.println(line),
                    None => println!("{}", line),
                }
            }
        } else {
            failures += 1;
            if json {
                println!("{}", result.to_json()?);
            } else {
                let line = format!(
                    "{} {}: {}",
                    "Failed".red().bold(),
                    input.display(),
                    result.error.as_deref().unwrap_or("unknown error")
                );
                match &pb {
                    Some(pb) => pb.println(line),
                    None => eprintln!("{}", line),
                }
            }
        }

        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("Done!");
    }

    if failures > 0 {
        return Err(format!("{} of {} documents failed", failures, inputs.len()).into());
    }
    Ok(())
}

fn cmd_images(input: &Path, options: ExtractOptions, list: Option<&Path>) -> CliResult {
    let result = Extractor::with_options(options).try_extract(input)?;

    for diagnostic in &result.diagnostics {
        eprintln!("{} {}", "Note:".yellow(), diagnostic);
    }

    if let Some(path) = list {
        result.write_markdown(path)?;
        println!(
            "{} {} image references to {}",
            "Saved".green(),
            result.image_count(),
            path.display()
        );
    } else {
        print!("{}", result.markdown);
    }

    if let Some(dir) = &result.output_dir {
        eprintln!(
            "\n{} {} images in {}",
            "Done!".green().bold(),
            result.image_count(),
            dir.display()
        );
    }
    Ok(())
}

fn cmd_info(input: &Path, mut options: ExtractOptions) -> CliResult {
    let format = DocumentFormat::from_path(input)?;
    let size = fs::metadata(input)?.len();
    let extractor = Extractor::with_options(options.clone());
    let capability = extractor.capability(format);

    // Text-only pass; nothing is written.
    options.images_enabled = false;
    let result = Extractor::with_options(options).try_extract(input)?;
    let stats = &result.stats;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), format);
    println!("{}: {} bytes", "Size".bold(), size);
    println!("{}: {}", "Capability".bold(), capability);

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let container = match format {
        DocumentFormat::Pdf => "Pages",
        DocumentFormat::Pptx => "Slides",
        DocumentFormat::Xlsx => "Sheets",
        DocumentFormat::Docx => "Sections",
    };
    println!("{}: {}", container.bold(), stats.container_count);
    println!("{}: {}", "Headings".bold(), stats.heading_count);
    println!("{}: {}", "Paragraphs".bold(), stats.paragraph_count);
    println!("{}: {}", "Tables".bold(), stats.table_count);
    println!("{}: {}", "Words".bold(), stats.word_count);
    println!("{}: {}", "Characters".bold(), stats.char_count);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "docmark".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Office document to Markdown conversion");
    println!();
    println!(
        "Formats: {}",
        DocumentFormat::ALL
            .iter()
            .map(|f| f.extension())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("License: MIT");
}

fn summary_line(result: &ExtractionResult, md_path: &Path) -> String {
    let status = match result.status {
        ExtractionStatus::Complete => "Converted".green().bold(),
        ExtractionStatus::Degraded => "Degraded".yellow().bold(),
        ExtractionStatus::Failed => "Failed".red().bold(),
    };
    let mut line = format!(
        "{} {} -> {} ({} images)",
        status,
        result.document.display(),
        md_path.display(),
        result.image_count()
    );
    for diagnostic in &result.diagnostics {
        line.push_str(&format!("\n  {} {}", "└─".dimmed(), diagnostic));
    }
    line
}

/// `<markdown_dir>/<stem>.md`, defaulting to the document's directory.
fn markdown_path(input: &Path, options: &ExtractOptions) -> PathBuf {
    let dir = options
        .markdown_dir
        .clone()
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{}.md", stem(input)))
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definition() {
        use clap::CommandFactory;

        let command = Cli::command();
        command.clone().debug_assert();
        assert_eq!(command.get_name(), "docmark");
        assert!(command.get_author().is_none());
    }

    #[test]
    fn test_markdown_path() {
        let options = ExtractOptions::default();
        assert_eq!(
            markdown_path(Path::new("docs/report.pdf"), &options),
            PathBuf::from("docs/report.md")
        );

        let options = ExtractOptions {
            markdown_dir: Some(PathBuf::from("out")),
            ..ExtractOptions::default()
        };
        assert_eq!(
            markdown_path(Path::new("docs/report.pdf"), &options),
            PathBuf::from("out/report.md")
        );
    }

    #[test]
    fn test_flags_override_config() {
        let args = ExtractArgs {
            output: Some(PathBuf::from("md")),
            images_dir: None,
            min_image_size: Some(8),
            dedup: true,
        };
        let options = args.apply(Config::default().to_options());
        assert_eq!(options.markdown_dir, Some(PathBuf::from("md")));
        assert_eq!(options.parse.min_image_size, 8);
        assert!(options.deduplicate_images);
    }

    #[test]
    fn test_cleanup_none() {
        let cleanup: Option<CleanupOptions> = CleanupLevel::None.into();
        assert!(cleanup.is_none());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["docmark", "convert", "a.pdf", "--mode", "grouped", "--dedup"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Convert { .. }));
    }
}
