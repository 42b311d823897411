//! Editor state: the document, its worker threads and the mutation channel
//!
//! The editor lives on the interaction thread. Store reads and file reads
//! run elsewhere and come back as messages; [`Editor::poll`] applies them
//! through [`Document::apply`] in the order they complete. Results for a
//! document that has since been replaced, or for nodes that were removed,
//! are dropped without error.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use log::debug;
use offimg_core::command;
use offimg_core::diagnostics::{DiagnosticEvent, DiagnosticHook, RenderEvent};
use offimg_core::markup;
use offimg_core::node::RenderedElement;
use offimg_core::{
    Config, Document, DocumentError, ImageAttrs, NodeId, Selection, StoreHandle, Transaction,
};
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::event::{CoordinateMap, DropEvent, DropHandling};
use crate::ingest::{self, IngestContext, IngestResult, MimeFilter};
use crate::store_worker::{ResolveOutcome, StoreRequest, StoreResult, StoreWorker};

/// Main editor state
pub struct Editor {
    pub config: Config,
    pub doc: Document,
    pub selection: Selection,
    store: StoreHandle,
    worker: StoreWorker,
    ingest_tx: Sender<IngestResult>,
    ingest_rx: Receiver<IngestResult>,
    mime_filter: MimeFilter,
    /// Bumped whenever `doc` is replaced
    generation: u64,
    /// Requests and read tasks whose results have not been applied yet
    pending: usize,
    /// Hashes written to the store by drops in this session
    ingested: HashSet<String>,
    diagnostics: Vec<DiagnosticEvent>,
    hook: Option<Box<dyn DiagnosticHook>>,
}

impl Editor {
    /// Create an editor over an empty document
    pub fn new(config: Config, store: StoreHandle) -> Result<Self> {
        let mime_filter = MimeFilter::new(&config.ingest.mime_pattern)
            .with_context(|| format!("Invalid ingest.mime_pattern: {}", config.ingest.mime_pattern))?;
        let (ingest_tx, ingest_rx) = crossbeam_channel::unbounded();
        let worker = StoreWorker::spawn(store.clone(), config.hash.algorithm);

        Ok(Self {
            doc: Document::new(config.hash.algorithm),
            selection: Selection::default(),
            store,
            worker,
            ingest_tx,
            ingest_rx,
            mime_filter,
            generation: 1,
            pending: 0,
            ingested: HashSet::new(),
            diagnostics: Vec::new(),
            hook: None,
            config,
        })
    }

    /// Register a hook that receives every diagnostic event
    pub fn set_diagnostic_hook(&mut self, hook: impl DiagnosticHook + 'static) {
        self.hook = Some(Box::new(hook));
    }

    pub fn diagnostics(&self) -> &[DiagnosticEvent] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<DiagnosticEvent> {
        std::mem::take(&mut self.diagnostics)
    }

    fn report(&mut self, event: DiagnosticEvent) {
        event.log();
        if let Some(hook) = self.hook.as_mut() {
            hook.on_event(&event);
        }
        self.diagnostics.push(event);
    }

    /// Number of outstanding store requests and file reads
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Replace the document with parsed markup and start resolving its images
    pub fn open_markup(&mut self, source: &str) {
        let ctx = self.config.parse_context();
        self.doc = markup::parse_document(source, &ctx);
        self.generation += 1;
        self.selection = Selection::cursor_at(self.doc.size());

        let targets: Vec<(NodeId, String)> = self
            .doc
            .images()
            .filter_map(|node| node.attrs.content_hash.clone().map(|h| (node.id, h)))
            .collect();
        debug!(
            "opened document generation {} with {} stored images",
            self.generation,
            targets.len()
        );
        for (node, hash) in targets {
            self.send(StoreRequest::Resolve {
                generation: self.generation,
                node,
                hash,
            });
        }
    }

    /// Read and open a markup file
    pub fn open_path(&mut self, path: &Path) -> Result<()> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        self.open_markup(&source);
        Ok(())
    }

    /// Serialize the document
    pub fn render_markup(&self) -> String {
        markup::render_document(&self.doc)
    }

    /// Markup element for one node
    pub fn render_element(&self, id: NodeId) -> Option<RenderedElement> {
        self.doc
            .image(id)
            .map(|node| offimg_core::node::render(&node.attrs, self.doc.algorithm))
    }

    /// Load/error callbacks from rendered elements. Reported only.
    pub fn notify_render(&mut self, event: RenderEvent) {
        self.report(DiagnosticEvent::from(&event));
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.clamp(self.doc.size());
    }

    /// Insert an image node at the current selection
    pub fn insert_image(&mut self, attrs: ImageAttrs) -> Result<NodeId, DocumentError> {
        command::insert_image(&mut self.doc, &self.selection, attrs)
    }

    /// Remove a node. Its stored bytes are left alone.
    pub fn remove_image(&mut self, id: NodeId) -> Result<bool, DocumentError> {
        let applied = self.doc.apply(Transaction::new().remove_image(id))?;
        Ok(applied.skipped == 0)
    }

    /// Handle a drop on the document surface.
    ///
    /// Drops without image files are left to the host. Otherwise the image
    /// files are taken out of the event, the drop position is fixed once,
    /// and one read task per file is started.
    pub fn handle_drop(&mut self, event: &mut DropEvent, view: &dyn CoordinateMap) -> DropHandling {
        if !self.config.ingest.enabled {
            return DropHandling::PassThrough;
        }
        let Some(files) = event.files.as_mut().filter(|files| !files.is_empty()) else {
            return DropHandling::PassThrough;
        };
        if !files.iter().any(|file| self.mime_filter.matches(file)) {
            return DropHandling::PassThrough;
        }

        let size = self.doc.size();
        let pos = view
            .pos_at_coords(event.coords)
            .map_or(size, |pos| pos.min(size));

        let (images, rest): (Vec<_>, Vec<_>) = std::mem::take(files)
            .into_iter()
            .partition(|file| self.mime_filter.matches(file));
        *files = rest;

        let count = images.len();
        debug!("drop intercepted at {} with {} image file(s)", pos, count);
        for file in images {
            let ctx = IngestContext {
                generation: self.generation,
                pos,
                store: self.store.clone(),
                algorithm: self.doc.algorithm,
                max_bytes: self.config.ingest.max_bytes,
            };
            ingest::spawn_read(file, ctx, self.ingest_tx.clone());
            self.pending += 1;
        }

        DropHandling::Intercepted { pos, files: count }
    }

    /// Delete stored records ingested in this session that no node uses
    pub fn release_orphans(&mut self) -> usize {
        let orphans: Vec<String> = self
            .ingested
            .iter()
            .filter(|hash| !self.doc.references(hash))
            .cloned()
            .collect();
        for hash in &orphans {
            self.ingested.remove(hash);
            self.send(StoreRequest::Delete { hash: hash.clone() });
        }
        orphans.len()
    }

    /// Remove every record from the store
    pub fn clear_store(&mut self) {
        self.ingested.clear();
        self.send(StoreRequest::Clear);
    }

    fn send(&mut self, req: StoreRequest) {
        if self.worker.request(req) {
            self.pending += 1;
        } else {
            self.report(DiagnosticEvent::error("store worker is not running", "store"));
        }
    }

    /// Apply every completed result without blocking. Returns how many
    /// results were handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Some(result) = self.worker.try_recv_result() {
            self.apply_store_result(result);
            handled += 1;
        }
        while let Ok(result) = self.ingest_rx.try_recv() {
            self.apply_ingest_result(result);
            handled += 1;
        }
        handled
    }

    /// Block until nothing is pending or `timeout` passes. Returns whether
    /// everything completed.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let store_rx = self.worker.results().clone();
        let ingest_rx = self.ingest_rx.clone();

        while self.pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            crossbeam_channel::select! {
                recv(store_rx) -> msg => {
                    if let Ok(result) = msg {
                        self.apply_store_result(result);
                    }
                }
                recv(ingest_rx) -> msg => {
                    if let Ok(result) = msg {
                        self.apply_ingest_result(result);
                    }
                }
                default(remaining) => return false,
            }
        }
        true
    }

    fn apply_store_result(&mut self, result: StoreResult) {
        self.pending = self.pending.saturating_sub(1);

        match result {
            StoreResult::Resolved {
                generation,
                node,
                hash,
                outcome,
            } => {
                if generation != self.generation {
                    debug!("discarding resolution for a replaced document");
                    return;
                }
                match outcome {
                    ResolveOutcome::Resolved(src) => {
                        match self.doc.apply(Transaction::new().set_src(node, src)) {
                            Ok(applied) if applied.skipped > 0 => {
                                debug!("node {} removed before resolution finished", node);
                            }
                            Ok(_) => debug!("resolved node {}", node),
                            Err(e) => self.report(DiagnosticEvent::warning(
                                format!("resolved content for node {} rejected: {}", node, e),
                                "resolve",
                            )),
                        }
                    }
                    ResolveOutcome::Miss => self.report(DiagnosticEvent::info(
                        format!("no stored content for {}, keeping placeholder", short(&hash)),
                        "resolve",
                    )),
                    ResolveOutcome::Failed(e) => self.report(DiagnosticEvent::warning(
                        format!("could not resolve {}: {}", short(&hash), e),
                        "resolve",
                    )),
                }
            }
            StoreResult::Deleted { hash, result } => match result {
                Ok(()) => debug!("deleted stored content {}", short(&hash)),
                Err(e) => self.report(DiagnosticEvent::warning(
                    format!("failed to delete {}: {}", short(&hash), e),
                    "store",
                )),
            },
            StoreResult::Cleared { result } => {
                if let Err(e) = result {
                    self.report(DiagnosticEvent::warning(
                        format!("failed to clear store: {}", e),
                        "store",
                    ));
                }
            }
        }
    }

    fn apply_ingest_result(&mut self, result: IngestResult) {
        self.pending = self.pending.saturating_sub(1);

        // Tracked even if no node ends up using it, so release can find it
        if let Some(hash) = result.stored_hash {
            self.ingested.insert(hash);
        }

        if result.generation != self.generation {
            debug!("discarding dropped file {} for a replaced document", result.name);
            return;
        }

        let ingested = match result.outcome {
            Ok(ingested) => ingested,
            Err(e) => {
                self.report(DiagnosticEvent::warning(e.to_string(), "ingest"));
                return;
            }
        };

        if let Some(e) = &ingested.store_error {
            self.report(DiagnosticEvent::warning(
                format!("{} inserted without offline copy: {}", result.name, e),
                "ingest",
            ));
        }
        // The document may have shrunk since the drop
        let pos = result.pos.min(self.doc.size());
        match self.doc.apply(Transaction::new().insert_image(pos, ingested.attrs)) {
            Ok(_) => debug!("inserted dropped file {} at {}", result.name, pos),
            Err(e) => self.report(DiagnosticEvent::warning(
                format!("dropped file {} rejected: {}", result.name, e),
                "ingest",
            )),
        }
    }
}

fn short(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}
