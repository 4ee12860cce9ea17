//! Image Handouts CLI tool
//!
//! A command-line tool for laying out image files into a single PDF, two per page.

use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use img_handouts::collect::{collect_images, InputSelection};
use img_handouts::config::{Config, PageSize};
use img_handouts::convert::{convert, ConvertOptions};
use img_handouts::layout::{Scale, ScalePreset};
use img_handouts::print::open_file;

/// Image Handouts - Put images into a printable PDF
#[derive(Parser)]
#[command(name = "img-handouts")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # All images under two folders, two per A4 page, into ~/workout.pdf
    img-handouts build -d ~/Pictures/week1 ~/Pictures/week2

    # Explicit files and a glob pattern, printed when done
    img-handouts build -f cover.png \"shots/*.jpg\" -o shots.pdf --print

    # Leave white space around images and skip captions
    img-handouts build -d photos --spaced --no-captions

    # See what would be included
    img-handouts scan -d photos")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a PDF from the selected images
    Build {
        #[command(flatten)]
        inputs: InputArgs,

        /// Output PDF file path (default: ~/workout.pdf)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print the PDF on the default printer after creating it
        #[arg(long)]
        print: bool,

        /// Leave white space around images instead of filling the page width
        #[arg(long)]
        spaced: bool,

        /// Number of images per page
        #[arg(long, value_name = "N")]
        per_page: Option<usize>,

        /// Page size
        #[arg(long, value_enum)]
        page_size: Option<PageSizeArg>,

        /// Do not emit folder captions
        #[arg(long)]
        no_captions: bool,

        /// Document title stored in the PDF metadata
        #[arg(long)]
        title: Option<String>,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// List the images and captions that would be used
    Scan {
        #[command(flatten)]
        inputs: InputArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Search image files in these directories (recursive)
    #[arg(short, long, num_args = 1..)]
    directories: Vec<PathBuf>,

    /// Image file names. Supports glob patterns like "*.jpg"
    #[arg(short, long, num_args = 1..)]
    files: Vec<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Caption file looked up in each image folder
    #[arg(long, value_name = "NAME")]
    caption_file: Option<String>,

    /// Match image extensions case-insensitively
    #[arg(long)]
    ignore_case: bool,
}

impl InputArgs {
    fn selection(&self) -> anyhow::Result<InputSelection> {
        if self.directories.is_empty() && self.files.is_empty() {
            bail!("No input images specified; use --directories and/or --files");
        }
        Ok(InputSelection {
            directories: self.directories.clone(),
            files: self.files.clone(),
        })
    }

    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(name) = &self.caption_file {
            config.captions.file_name = name.clone();
        }
        if self.ignore_case {
            config.collect.ignore_extension_case = true;
        }
        Ok(config)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PageSizeArg {
    A4,
    Letter,
}

impl From<PageSizeArg> for PageSize {
    fn from(arg: PageSizeArg) -> Self {
        match arg {
            PageSizeArg::A4 => PageSize::A4,
            PageSizeArg::Letter => PageSize::Letter,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            inputs, out, print, spaced, per_page, page_size, no_captions, title, open,
        } => {
            cmd_build(
                inputs, out, print, spaced, per_page, page_size, no_captions, title, open,
            )
        }
        Commands::Scan { inputs } => cmd_scan(inputs),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Create the PDF
#[allow(clippy::too_many_arguments)]
fn cmd_build(
    inputs: InputArgs,
    out: Option<PathBuf>,
    print: bool,
    spaced: bool,
    per_page: Option<usize>,
    page_size: Option<PageSizeArg>,
    no_captions: bool,
    title: Option<String>,
    open: bool,
) -> anyhow::Result<()> {
    let selection = inputs.selection()?;
    let mut config = inputs.load_config()?;

    if spaced {
        config.page.scale = Scale::Preset(ScalePreset::Spaced);
    }
    if let Some(n) = per_page {
        config.page.images_per_page = n;
    }
    if let Some(size) = page_size {
        config.page.size = size.into();
        config.page.width_mm = None;
        config.page.height_mm = None;
    }
    if no_captions {
        config.captions.enabled = false;
    }
    if title.is_some() {
        config.output.title = title;
    }

    let options = ConvertOptions {
        inputs: selection,
        output_path: out,
        config,
        print,
    };

    let report = convert(&options)?;

    for skipped in &report.skipped {
        eprintln!("Skipped: {} ({})", skipped.path.display(), skipped.reason);
    }
    eprintln!(
        "Pdf file was created successfully: {} ({} images on {} pages)",
        report.output_path.display(),
        report.images_placed,
        report.pages
    );
    if let Some(error) = &report.print_error {
        eprintln!("Warning: could not print: {}", error);
    }

    if open {
        open_file(&report.output_path)?;
    }

    Ok(())
}

/// Show what would be collected
fn cmd_scan(inputs: InputArgs) -> anyhow::Result<()> {
    let selection = inputs.selection()?;
    let config = inputs.load_config()?;

    let collection = collect_images(&selection, &config.collect_options())?;

    for entry in &collection.entries {
        println!("{}", entry.path.display());
    }
    for (folder, caption) in collection.captions.iter_sorted() {
        println!("Caption [{}]: {}", folder.display(), caption.replace('\n', " | "));
    }
    eprintln!(
        "{} image files, {} captions",
        collection.entries.len(),
        collection.captions.len()
    );

    Ok(())
}
