use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use zo_core::{
    EditorChoice, PdfToTextGrep, Settings, config_file, grep_repository, launch, make, notes,
    search, status,
};

mod output;

use output::ColorMode;

/// zo - keep a repository of papers and their BibTeX entries in order
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to repository of papers and references
    #[arg(short, long)]
    refrepo: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show which PDFs and citations are available or missing
    Status,

    /// Create a child .bib file containing only the refs a project needs
    Make {
        /// The directory containing the LaTeX project
        #[arg(short = 'j', long, default_value = ".")]
        project: PathBuf,

        /// A parent .bib file (default: the repository bibliography)
        #[arg(short, long)]
        parent: Option<PathBuf>,

        /// The child .bib file to be produced
        #[arg(short, long, default_value = "refs.bib")]
        child: PathBuf,
    },

    /// Find the PDFs whose text contains a grep match
    Grep {
        /// Arguments passed verbatim to the line filter
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Open a PDF
    View {
        /// Citation key of the paper
        key: String,
    },

    /// Create or open the notes for a paper
    Note {
        /// Citation key of the paper
        key: String,
    },

    /// Search for a paper by title, file name or author
    Search {
        /// Case-insensitive regular expression
        pattern: String,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Resolve configuration: CLI flags > env vars > config file > defaults
    let file_config = config_file::load_config();
    let mut settings = Settings::resolve(&file_config, |name| std::env::var(name).ok());
    if let Some(refrepo) = cli.refrepo {
        settings.repo_root = refrepo;
    }
    tracing::debug!(repo = %settings.repo_root.display(), "resolved repository");

    let color = ColorMode(!cli.no_color && std::io::stdout().is_terminal());
    let mut out = std::io::stdout().lock();

    match cli.command {
        Command::Status => run_status(&settings, &mut out, color),
        Command::Make {
            project,
            parent,
            child,
        } => {
            let parent = parent.unwrap_or_else(|| settings.bib_path());
            run_make(&project, &parent, &child, &mut out, color)
        }
        Command::Grep { args } => run_grep(&settings, args, &mut out, color),
        Command::View { key } => {
            let pdf = launch::open_pdf(&settings, &key)
                .with_context(|| format!("cannot open PDF for '{key}'"))?;
            tracing::info!(pdf = %pdf.display(), "opened");
            Ok(())
        }
        Command::Note { key } => {
            let editor = EditorChoice::resolve(&settings);
            tracing::debug!(editor = editor.command_line(), "editing note");
            notes::edit_note(&settings, &key)
                .with_context(|| format!("cannot edit notes for '{key}'"))?;
            Ok(())
        }
        Command::Search { pattern } => {
            let results = search::search(&settings, &pattern)
                .with_context(|| format!("search for '{pattern}' failed"))?;
            output::print_sections(&mut out, &[results.section()], color)?;
            Ok(())
        }
    }
}

fn run_status(settings: &Settings, out: &mut dyn Write, color: ColorMode) -> anyhow::Result<()> {
    let report = status::status(settings).with_context(|| {
        format!(
            "cannot build status for repository {}",
            settings.repo_root.display()
        )
    })?;
    output::print_sections(out, &report.sections(), color)?;
    Ok(())
}

fn run_make(
    project: &std::path::Path,
    parent: &std::path::Path,
    child: &std::path::Path,
    out: &mut dyn Write,
    color: ColorMode,
) -> anyhow::Result<()> {
    let outcome = make(project, parent, child).with_context(|| {
        format!(
            "make failed (project {}, parent {}, child {})",
            project.display(),
            parent.display(),
            child.display()
        )
    })?;

    if outcome.required.is_empty() {
        writeln!(
            out,
            "{} already has all {} cited refs.",
            child.display(),
            outcome.cited.len()
        )?;
        return Ok(());
    }

    output::print_sections(out, &outcome.sections(), color)?;
    Ok(())
}

fn run_grep(
    settings: &Settings,
    args: Vec<String>,
    out: &mut dyn Write,
    color: ColorMode,
) -> anyhow::Result<()> {
    let backend = PdfToTextGrep::new(settings.pdftotext.as_str(), settings.grep.as_str(), args);
    let report = grep_repository(&settings.repo_root, &backend)?;

    for path in &report.matches {
        output::print_grep_match(out, path, color)?;
    }

    // Every file failing means the tools themselves are unusable.
    if report.scanned > 0 && report.failures.len() == report.scanned {
        if let Some((path, err)) = report.failures.first() {
            anyhow::bail!("grep failed on every PDF (first: {}: {})", path.display(), err);
        }
    }
    Ok(())
}
