//! usfmconv CLI - USFM to HTML/DOCX publishing tool
//!
//! A command-line front end for merging USFM sources into one HTML or DOCX
//! document.

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use usfmconv::session::suggested_file_name;
use usfmconv::{
    discover_selection, resolve, AssetOptions, ColumnCount, ConversionSession, FontSize,
    LineSpacing, Outcome, OutputKind, ParseOptions, Pipeline, RenderDispatcher, SessionEvent,
    TextAlignment, TextDirection, Toggle, ToggleSet,
};

/// Merge USFM sources and publish them as HTML or DOCX
#[derive(Parser)]
#[command(
    name = "usfmconv",
    version,
    about = "Convert USFM scripture sources to HTML or DOCX",
    long_about = "usfmconv - Merge USFM sources into one styled document.\n\n\
                  Sources are .usfm, .sfm and .txt files; directories are searched recursively.\n\n\
                  Usage:\n  \
                  usfmconv <input>... -o out.html   Convert to HTML (style.css is added next to it)\n  \
                  usfmconv <input>... -o out.docx   Convert to a Word document\n  \
                  usfmconv list <input>...          Show the files that would be converted"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input files or directories (for default conversion)
    inputs: Vec<PathBuf>,

    /// Output file, .html or .docx (default: out.html)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    format: FormatArgs,

    #[command(flatten)]
    parse: ParseArgs,

    #[command(flatten)]
    assets: AssetArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert sources to HTML or DOCX (default command)
    Convert {
        /// Input files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file, .html or .docx (default: out.html)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,

        #[command(flatten)]
        parse: ParseArgs,

        #[command(flatten)]
        assets: AssetArgs,
    },

    /// List the source files that would be converted, in order
    List {
        /// Input files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Print the resolved HTML and DOCX configurations as JSON
    Config {
        #[command(flatten)]
        format: FormatArgs,

        /// Output compact JSON (no indentation)
        #[arg(long)]
        compact: bool,
    },

    /// Show version information
    Version,
}

/// Formatting toggles
#[derive(Args, Clone, Default)]
struct FormatArgs {
    /// Load toggles from a JSON file; flags below override it
    #[arg(long, value_name = "FILE")]
    toggles: Option<PathBuf>,

    /// Double line spacing
    #[arg(long)]
    double_space: bool,

    /// Two text columns
    #[arg(long)]
    two_column: bool,

    /// Right-to-left text direction
    #[arg(long)]
    rtl: bool,

    /// Justified text
    #[arg(long)]
    justify: bool,

    /// Font size override
    #[arg(long)]
    font_size: Option<FontSizeArg>,

    /// Run chapters together instead of starting each on a new page
    #[arg(long)]
    combine_chapters: bool,

    /// Put every verse in its own paragraph
    #[arg(long)]
    separate_verses: bool,
}

impl FormatArgs {
    fn toggle_set(&self) -> usfmconv::Result<ToggleSet> {
        let mut toggles = match &self.toggles {
            Some(path) => ToggleSet::from_json_file(path)?,
            None => ToggleSet::default(),
        };

        if self.double_space {
            toggles.set(Toggle::LineSpacing(LineSpacing::Double));
        }
        if self.two_column {
            toggles.set(Toggle::ColumnCount(ColumnCount::Two));
        }
        if self.rtl {
            toggles.set(Toggle::Direction(TextDirection::RightToLeft));
        }
        if self.justify {
            toggles.set(Toggle::Alignment(TextAlignment::Justified));
        }
        if let Some(size) = self.font_size {
            toggles.set(Toggle::FontSize(Some(size.into())));
        }
        if self.combine_chapters {
            toggles.set(Toggle::SeparateChapters(false));
        }
        if self.separate_verses {
            toggles.set(Toggle::SeparateVerses(true));
        }
        Ok(toggles)
    }
}

/// Parsing options
#[derive(Args, Clone, Default)]
struct ParseArgs {
    /// Recover from malformed markers instead of failing
    #[arg(long)]
    lenient: bool,

    /// Parse files concurrently
    #[arg(long)]
    parallel: bool,

    /// Drop a marker and its text (repeatable; s5 and ts are dropped by default)
    #[arg(long, value_name = "MARKER")]
    ignore_marker: Vec<String>,
}

impl ParseArgs {
    fn options(&self) -> ParseOptions {
        let mut options = ParseOptions::new();
        if self.lenient {
            options = options.lenient();
        }
        if self.parallel {
            options = options.parallel();
        }
        for marker in &self.ignore_marker {
            options = options.with_ignored_marker(marker.as_str());
        }
        options
    }
}

/// HTML asset locations
#[derive(Args, Clone, Default)]
struct AssetArgs {
    /// Directory holding insert_ULB_License.html and style.css
    #[arg(long, value_name = "DIR")]
    asset_dir: Option<PathBuf>,

    /// Stylesheet to copy next to HTML output when none exists there
    #[arg(long, value_name = "FILE")]
    stylesheet: Option<PathBuf>,
}

impl AssetArgs {
    fn options(&self) -> AssetOptions {
        let mut options = AssetOptions::new();
        if let Some(dir) = &self.asset_dir {
            options = options.with_asset_dir(dir);
        }
        if let Some(path) = &self.stylesheet {
            options = options.with_stylesheet_source(path);
        }
        options
    }
}

/// Font size override
#[derive(Clone, Copy, ValueEnum)]
enum FontSizeArg {
    Small,
    Medium,
    Large,
}

impl From<FontSizeArg> for FontSize {
    fn from(size: FontSizeArg) -> Self {
        match size {
            FontSizeArg::Small => FontSize::Small,
            FontSizeArg::Medium => FontSize::Medium,
            FontSizeArg::Large => FontSize::Large,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let Some(command) = cli.command else {
        if cli.inputs.is_empty() {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            return Ok(());
        }
        return run_convert(&cli.inputs, cli.output, &cli.format, &cli.parse, &cli.assets);
    };

    match command {
        Commands::Convert {
            inputs,
            output,
            format,
            parse,
            assets,
        } => run_convert(&inputs, output, &format, &parse, &assets)?,

        Commands::List { inputs } => {
            let files = discover_selection(&inputs)?;
            if files.is_empty() {
                println!("{} No .usfm, .sfm or .txt files found", "!".yellow().bold());
                return Ok(());
            }
            for (index, file) in files.iter().enumerate() {
                println!(
                    "{:>4}  {}  {}",
                    index + 1,
                    format!("{:<5}", file.kind().to_string()).dimmed(),
                    file.path().display()
                );
            }
            println!("\n{}: {}", "Files".bold(), files.len());
        }

        Commands::Config { format, compact } => {
            let toggles = format.toggle_set()?;
            let (hypertext, document) = resolve(&toggles);
            let value = serde_json::json!({
                "toggles": toggles,
                "hypertext": hypertext,
                "document": document,
            });
            let json = if compact {
                serde_json::to_string(&value)?
            } else {
                serde_json::to_string_pretty(&value)?
            };
            println!("{}", json);
        }

        Commands::Version => print_version(),
    }

    Ok(())
}

/// Runs one conversion through a session, drawing progress as it goes.
fn run_convert(
    inputs: &[PathBuf],
    output: Option<PathBuf>,
    format: &FormatArgs,
    parse: &ParseArgs,
    assets: &AssetArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let toggles = format.toggle_set()?;
    let destination = output.unwrap_or_else(|| PathBuf::from(suggested_file_name("")));
    let kind = OutputKind::from_path(&destination)?;

    let pipeline = Pipeline::new(parse.options())
        .with_dispatcher(RenderDispatcher::new(assets.options()));
    let mut session = ConversionSession::with_pipeline(pipeline);
    session.add_files(inputs)?;
    session.set_toggles(toggles)?;

    if session.files().is_empty() {
        return Err("no .usfm, .sfm or .txt files found in the given inputs".into());
    }
    let file_count = session.files().len();

    let pb = create_progress_bar(&format!("Converting {} files to {}...", file_count, kind));
    let bar = pb.clone();
    session.set_observer(move |event| {
        if let SessionEvent::Progress(percent) = event {
            bar.set_position(u64::from(*percent));
        }
    });

    let outcome = session.start_conversion(Some(destination))?;
    pb.finish_and_clear();

    match outcome {
        Some(Outcome::Succeeded { destination, kind }) => {
            println!("{}", "Conversion Complete".green().bold());
            println!("{}", "─".repeat(40));
            println!("{}: {}", "Output".bold(), destination.display());
            println!("{}: {}", "Format".bold(), kind);
            println!("{}: {}", "Files".bold(), file_count);
            if kind == OutputKind::Hypertext {
                if let Some(dir) = destination.parent() {
                    let css = dir.join(&assets.options().stylesheet_name);
                    println!("  {} {}", "✓".green(), css.display());
                }
            }
            print_toggles(session.toggles());
            Ok(())
        }
        Some(Outcome::Failed { message, kind }) => Err(format!("{} ({})", message, kind).into()),
        None => Ok(()),
    }
}

fn print_toggles(toggles: &ToggleSet) {
    let (hypertext, document) = resolve(toggles);
    println!("\n{}", "Formatting".cyan().bold());
    println!("{}", "─".repeat(40));
    println!("{}: {}", "Line spacing".bold(), document.line_spacing);
    println!("{}: {}", "Columns".bold(), document.column_count);
    println!(
        "{}: {}",
        "Direction".bold(),
        if document.right_to_left { "right to left" } else { "left to right" }
    );
    let alignment = match toggles.alignment {
        TextAlignment::Justified => "Justified",
        TextAlignment::Default => toggles.default_alignment_label(),
    };
    println!("{}: {}", "Alignment".bold(), alignment);
    println!(
        "{}: {}",
        "Chapters".bold(),
        if document.separate_chapters { "separate pages" } else { "combined" }
    );
    println!(
        "{}: {}",
        "Verses".bold(),
        if document.separate_verses { "one per paragraph" } else { "inline" }
    );
    if let Some(classes) = hypertext.class_attribute() {
        println!("{}: {}", "HTML classes".bold(), classes);
    }
}

fn print_version() {
    println!("{} {}", "usfmconv".green().bold(), env!("CARGO_PKG_VERSION"));
    println!("Merge USFM sources and publish them as HTML or DOCX");
    println!();
    println!("Source formats: .usfm, .sfm, .txt");
    println!("Output formats: .html (with style.css), .docx");
}

fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.blue} {msg} [{bar:30.cyan/blue}] {pos:>3}%")
            .unwrap()
            .progress_chars("=> "),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
