//! offimg - keep images in markdown documents available offline

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use offimg_core::{markup, placeholder, Config};
use offimg_host::{open_store, Coords, DirStore, DropEvent, DropHandling, DroppedFile, Editor};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long to wait for store and file work before giving up
const WAIT: Duration = Duration::from_secs(30);

/// Offline image nodes for markdown documents
#[derive(Parser, Debug)]
#[command(name = "offimg")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Use this config file instead of the platform default
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store image files and insert them into a document
    Ingest {
        /// Markdown document; created when missing
        #[arg(value_name = "DOC")]
        doc: PathBuf,
        /// Image files to insert
        #[arg(value_name = "IMAGE", required = true)]
        images: Vec<PathBuf>,
        /// Insert position; defaults to the end of the document
        #[arg(long)]
        at: Option<usize>,
        /// Write here instead of updating DOC in place
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Print a document with its stored images resolved
    Render {
        #[arg(value_name = "DOC")]
        doc: PathBuf,
    },
    /// List a document's image nodes and whether their content is stored
    Status {
        #[arg(value_name = "DOC")]
        doc: PathBuf,
    },
    /// Delete stored content no listed document references
    Gc {
        #[arg(value_name = "DOC", required = true)]
        docs: Vec<PathBuf>,
        /// Only print what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a placeholder image URI
    Placeholder {
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().context("Failed to load configuration")?,
    };

    match args.command {
        Command::Ingest {
            doc,
            images,
            at,
            output,
        } => ingest(config, &doc, &images, at, output.as_deref()),
        Command::Render { doc } => render(config, &doc),
        Command::Status { doc } => status(config, &doc),
        Command::Gc { docs, dry_run } => gc(&config, &docs, dry_run),
        Command::Placeholder {
            label,
            width,
            height,
        } => {
            let label = label.unwrap_or(config.placeholder.label);
            let width = width.unwrap_or(config.placeholder.width);
            let height = height.unwrap_or(config.placeholder.height);
            println!("{}", placeholder::render(&label, width, height));
            Ok(())
        }
    }
}

fn open_editor(config: Config, doc: &Path) -> Result<Editor> {
    let store = open_store(&config)?;
    let mut editor = Editor::new(config, store)?;
    editor
        .open_path(doc)
        .with_context(|| format!("Failed to load document: {}", doc.display()))?;
    Ok(editor)
}

/// Drain pending work and print anything the editor reported
fn settle(editor: &mut Editor) -> Result<()> {
    let idle = editor.wait_idle(WAIT);
    for event in editor.take_diagnostics() {
        eprintln!("{:?}: {} ({})", event.level, event.message, event.source);
    }
    if !idle {
        bail!("Timed out with {} operation(s) still pending", editor.pending());
    }
    Ok(())
}

fn declared_mime(path: &Path) -> String {
    match image::ImageFormat::from_path(path) {
        Ok(format) => format.to_mime_type().to_string(),
        Err(_) if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("svg")) => {
            "image/svg+xml".to_string()
        }
        Err(_) => String::new(),
    }
}

fn ingest(
    config: Config,
    doc: &Path,
    images: &[PathBuf],
    at: Option<usize>,
    output: Option<&Path>,
) -> Result<()> {
    let mut editor = if doc.exists() {
        open_editor(config, doc)?
    } else {
        Editor::new(config.clone(), open_store(&config)?)?
    };
    settle(&mut editor)?;

    let files = images
        .iter()
        .map(|path| DroppedFile::from_path(path, declared_mime(path)))
        .collect();
    let mut event = DropEvent::with_files(files, Coords::default());
    let pos = at.unwrap_or_else(|| editor.doc.size());

    match editor.handle_drop(&mut event, &move |_: Coords| Some(pos)) {
        DropHandling::Intercepted { pos, files } => {
            info!("ingesting {} file(s) at position {}", files, pos);
        }
        DropHandling::PassThrough => bail!("None of the given files is an image"),
    }
    if let Some(skipped) = event.files.filter(|rest| !rest.is_empty()) {
        for file in skipped {
            eprintln!("Skipped non-image file: {}", file.name);
        }
    }
    settle(&mut editor)?;

    let target = output.unwrap_or(doc);
    std::fs::write(target, editor.render_markup())
        .with_context(|| format!("Failed to write document: {}", target.display()))?;
    Ok(())
}

fn render(config: Config, doc: &Path) -> Result<()> {
    let mut editor = open_editor(config, doc)?;
    settle(&mut editor)?;
    print!("{}", editor.render_markup());
    Ok(())
}

fn status(config: Config, doc: &Path) -> Result<()> {
    let mut editor = open_editor(config, doc)?;
    settle(&mut editor)?;

    for node in editor.doc.images() {
        let pos = editor.doc.position_of(node.id).unwrap_or_default();
        let hash = node.attrs.content_hash.as_deref().unwrap_or("-");
        let state = if placeholder::is_placeholder(&node.attrs.src) {
            "missing"
        } else {
            "stored"
        };
        println!(
            "{}\t{}\t{}\t{}",
            pos,
            state,
            hash,
            node.attrs.alt.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn gc(config: &Config, docs: &[PathBuf], dry_run: bool) -> Result<()> {
    let ctx = config.parse_context();
    let mut referenced = HashSet::new();
    for path in docs {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let doc = markup::parse_document(&source, &ctx);
        referenced.extend(doc.images().filter_map(|n| n.attrs.content_hash.clone()));
    }

    let dir = config
        .store_dir()
        .context("No store directory configured and no platform data directory found")?;
    let store = DirStore::open(&dir)?;
    let mut removed = 0;
    for key in store.keys()? {
        if referenced.contains(&key) {
            continue;
        }
        if dry_run {
            println!("would delete {}", key);
        } else {
            offimg_core::ContentStore::delete_item(&store, &key)?;
            println!("deleted {}", key);
        }
        removed += 1;
    }
    info!("gc: {} unreferenced record(s) in {}", removed, dir.display());
    Ok(())
}
