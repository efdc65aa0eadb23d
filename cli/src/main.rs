//! pdf2epub CLI - PDF to reflowable EPUB converter

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdf2epub::{
    inspect_file, ConversionReport, ConvertOptions, Converter, PageSelection, Stage,
    ZipContainerWriter,
};

#[derive(Parser)]
#[command(name = "pdf2epub")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Convert PDF documents to reflowable EPUB", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(flatten)]
    convert: ConvertArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a PDF to EPUB
    Convert(ConvertArgs),

    /// Show document information and layout statistics
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,
    },

    /// Show version information
    Version,
}

#[derive(Args, Default)]
struct ConvertArgs {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output EPUB file (input with .epub extension if not specified)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// JSON config file with layout thresholds
    #[arg(long, value_name = "FILE", env = "PDF2EPUB_CONFIG")]
    config: Option<PathBuf>,

    /// Book title
    #[arg(long)]
    title: Option<String>,

    /// Book author
    #[arg(long)]
    author: Option<String>,

    /// BCP 47 language tag
    #[arg(long)]
    language: Option<String>,

    /// Heading level that starts a new chapter (1-6)
    #[arg(long, value_name = "LEVEL")]
    chapter_level: Option<u8>,

    /// Minimum column gutter as a fraction of page width
    #[arg(long, value_name = "FRACTION")]
    column_gap: Option<f32>,

    /// Maximum table of contents depth
    #[arg(long, value_name = "DEPTH")]
    max_toc_depth: Option<u8>,

    /// Font size ratio over body text that marks a heading
    #[arg(long, value_name = "RATIO")]
    heading_ratio: Option<f32>,

    /// Vertical gap, in body line heights, that ends a paragraph
    #[arg(long, value_name = "LINES")]
    paragraph_gap: Option<f32>,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Stylesheet replacing the default one
    #[arg(long, value_name = "FILE")]
    css: Option<PathBuf>,

    /// Emit page-break markers for source pages
    #[arg(long)]
    page_markers: bool,

    /// Page holding a printed table of contents to split chapters by
    #[arg(long, value_name = "PAGE")]
    toc_page: Option<u32>,

    /// Disable parallel processing
    #[arg(long)]
    sequential: bool,

    /// Report format printed after conversion
    #[arg(long, value_enum, default_value = "text")]
    report: ReportFormat,
}

#[derive(Copy, Clone, Default, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    /// Coloured summary
    #[default]
    Text,
    /// Full report as JSON on stdout
    Json,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Convert(args)) => cmd_convert(args),
        Some(Commands::Info { input, pages }) => cmd_info(&input, pages.as_deref()),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if cli.convert.input.is_some() {
                cmd_convert(cli.convert)
            } else {
                println!("{}", "Usage: pdf2epub <FILE> [-o OUTPUT]".yellow());
                println!("       pdf2epub --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn parse_pages(pages: Option<&str>) -> Result<PageSelection, Box<dyn std::error::Error>> {
    match pages {
        Some(p) => Ok(PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?),
        None => Ok(PageSelection::All),
    }
}

fn build_options(args: &ConvertArgs) -> Result<ConvertOptions, Box<dyn std::error::Error>> {
    let mut options = match args.config {
        Some(ref path) => ConvertOptions::from_json_file(path)?,
        None => ConvertOptions::new(),
    };

    let layout = &mut options.layout;
    if let Some(level) = args.chapter_level {
        layout.chapter_heading_level = Some(level);
    }
    if let Some(gap) = args.column_gap {
        layout.column_gap_fraction = gap;
    }
    if let Some(depth) = args.max_toc_depth {
        layout.max_toc_depth = depth;
    }
    if let Some(ratio) = args.heading_ratio {
        layout.heading_size_ratio = ratio;
    }
    if let Some(gap) = args.paragraph_gap {
        layout.paragraph_gap_threshold = gap;
    }

    if let Some(ref title) = args.title {
        options.title = Some(title.clone());
    }
    if let Some(ref author) = args.author {
        options.author = Some(author.clone());
    }
    if let Some(ref language) = args.language {
        options.language = Some(language.clone());
    }
    if let Some(ref css) = args.css {
        options.stylesheet = Some(fs::read_to_string(css)?);
    }
    if args.pages.is_some() {
        options.parse.pages = parse_pages(args.pages.as_deref())?;
    }
    if args.page_markers {
        options.page_markers = true;
    }
    if let Some(page) = args.toc_page {
        options.toc_page = Some(page);
    }
    if args.sequential {
        options.parse.parallel = false;
    }

    options.validate()?;
    Ok(options)
}

fn cmd_convert(args: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let input = args.input.clone().ok_or("No input file given")?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| input.with_extension("epub"));
    let options = build_options(&args)?;

    let pb = ProgressBar::new(Stage::ALL.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let stage_pb = pb.clone();
    let converter = Converter::new(options)?.on_stage(move |stage| {
        stage_pb.set_position(stage as u64);
        stage_pb.set_message(format!("{}...", capitalize(stage.name())));
    });

    let mut writer = ZipContainerWriter::new(&output);
    let report = match converter.convert_file(&input, &mut writer) {
        Ok(report) => report,
        Err(e) => {
            pb.abandon_with_message("Failed");
            return Err(e.into());
        }
    };
    pb.set_position(Stage::ALL.len() as u64);
    pb.finish_with_message("Done!");

    match args.report {
        ReportFormat::Json => println!("{}", report.to_json()?),
        ReportFormat::Text => print_report(&report, &output),
    }

    Ok(())
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn print_report(report: &ConversionReport, output: &Path) {
    let stats = &report.stats;

    println!("\n{} {}", "Saved to".green().bold(), output.display());
    if let Some(ref title) = report.title {
        println!("  {} {}", "Title:".bold(), title);
    }
    println!(
        "  {} {} pages, {} chapters, {} TOC entries, {} images",
        "Content:".bold(),
        stats.page_count,
        stats.chapter_count,
        stats.toc_entries,
        stats.resource_count
    );

    let last = report.chapters.len().saturating_sub(1);
    for (i, chapter) in report.chapters.iter().enumerate() {
        let branch = if i == last { "└─" } else { "├─" };
        println!(
            "  {} {} {}",
            branch.dimmed(),
            chapter.file,
            chapter.title.dimmed()
        );
    }

    if report.is_partial() {
        println!(
            "\n{} {} warnings",
            "Partial:".yellow().bold(),
            report.warnings.len()
        );
        for warning in &report.warnings {
            println!("  {} {}", "-".yellow(), warning);
        }
    }
}

fn cmd_info(input: &Path, pages: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let (format, metadata) = inspect_file(input)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), format);
    println!("{}: {}", "Pages".bold(), metadata.page_count);

    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref language) = metadata.language {
        println!("{}: {}", "Language".bold(), language);
    }
    if let Some(ref creator) = metadata.creator {
        println!("{}: {}", "Creator".bold(), creator);
    }
    if let Some(ref producer) = metadata.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = metadata.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    // Layout statistics come from a full in-memory run
    let options = ConvertOptions::new().with_pages(parse_pages(pages)?);
    let backend = pdf2epub::LopdfBackend::load_file(input)?;
    let conversion = Converter::new(options)?.assemble(&backend)?;
    let stats = &conversion.report.stats;

    println!();
    println!("{}", "Layout Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {:.1}pt", "Body font size".bold(), stats.body_font_size);
    println!("{}: {}", "Words".bold(), stats.word_count);
    println!("{}: {}", "Paragraphs".bold(), stats.paragraph_count);
    println!("{}: {}", "Headings".bold(), stats.heading_count);
    println!("{}: {}", "List items".bold(), stats.list_item_count);
    println!("{}: {}", "Images".bold(), stats.image_count);
    println!("{}: {}", "Chapters".bold(), stats.chapter_count);
    println!("{}: {}", "TOC entries".bold(), stats.toc_entries);
    if stats.dropped_fragments > 0 || stats.degraded_pages > 0 {
        println!(
            "{}: {} dropped fragments, {} degraded pages",
            "Recovered".yellow().bold(),
            stats.dropped_fragments,
            stats.degraded_pages
        );
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdf2epub".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF to reflowable EPUB converter");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/pdf2epub".dimmed());
    println!("License: MIT");
}
