//! Event loop for one tracked buffer.
//!
//! Single-threaded: commands, debounce expiry and fetch completions are handled
//! one at a time from a `tokio::select!`. Fetches run as boxed local futures;
//! each carries the buffer and generation it was issued for, and a completion
//! that no longer matches the tracked buffer or the latest generation is dropped.

use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use lsp_types::Position;
use serde::Deserialize;
use std::rc::Rc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ProviderError, ProviderResult};
use crate::flatten::flatten;
use crate::navigator::{entry_jump_target, NavigationState};
use crate::profile::registry;
use crate::provider::{FuzzyFinder, PresentationSink, SymbolProvider, SyntaxTreeFallback};
use crate::render::{format_entry, render_frame};
use crate::symbol::{BufferId, HierarchicalSymbol, JumpTarget, Reference, SymbolEntry};

/// User-facing operations, as sent by the outer layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "kebab-case")]
pub enum Command {
    Show,
    Hide,
    Next,
    Prev,
    NextReference,
    PrevReference,
    /// Look up references of the identifier at a 0-based position in the buffer.
    References { line: u32, column: u32 },
    BeginFilter,
    Type { text: String },
    Backspace,
    Accept,
    Cancel,
    Dismiss,
    ClearFilter,
    Jump,
    ToggleNamespace,
    Search,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ContentChanged,
    Saved,
    BufferSwitched(BufferId),
    Refresh,
    Command(Command),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    File,
    Namespace(String),
}

enum Completion {
    Symbols {
        buffer: BufferId,
        generation: u64,
        result: ProviderResult<Vec<HierarchicalSymbol>>,
    },
    Namespace {
        buffer: BufferId,
        generation: u64,
        /// `None` when the buffer declares no namespace.
        result: ProviderResult<Option<(String, Vec<SymbolEntry>)>>,
    },
    References {
        buffer: BufferId,
        generation: u64,
        result: ProviderResult<Vec<Reference>>,
    },
}

pub struct Session {
    buffer: BufferId,
    provider: Rc<dyn SymbolProvider>,
    fallback: Option<Rc<dyn SyntaxTreeFallback>>,
    sink: Rc<dyn PresentationSink>,
    finder: Option<Box<dyn FuzzyFinder>>,
    config: Config,

    nav: NavigationState,
    scope: Scope,
    /// Namespace scope was toggled on and detection has not resolved yet.
    namespace_pending: bool,
    visible: bool,

    /// At most one pending debounce; re-arming replaces it.
    debounce: Option<Instant>,
    generation: u64,
    reference_generation: u64,
    inflight: FuturesUnordered<LocalBoxFuture<'static, Completion>>,
}

impl Session {
    pub fn new(
        buffer: BufferId,
        provider: Rc<dyn SymbolProvider>,
        sink: Rc<dyn PresentationSink>,
        config: Config,
    ) -> Self {
        Self {
            buffer,
            provider,
            fallback: None,
            sink,
            finder: None,
            config,
            nav: NavigationState::new(),
            scope: Scope::File,
            namespace_pending: false,
            visible: false,
            debounce: None,
            generation: 0,
            reference_generation: 0,
            inflight: FuturesUnordered::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: Rc<dyn SyntaxTreeFallback>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_finder(mut self, finder: Box<dyn FuzzyFinder>) -> Self {
        self.finder = Some(finder);
        self
    }

    pub fn buffer(&self) -> &BufferId {
        &self.buffer
    }

    pub fn navigator(&self) -> &NavigationState {
        &self.nav
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Fetch the initial index, then process events until shutdown or channel close.
    pub async fn run(mut self, mut events: UnboundedReceiver<SessionEvent>) -> Self {
        info!(buffer = %self.buffer, "Session started");
        self.refresh_now();

        loop {
            let deadline = self.debounce;
            tokio::select! {
                event = events.recv() => match event {
                    None | Some(SessionEvent::Shutdown) => break,
                    Some(event) => self.handle_event(event),
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    debug!(buffer = %self.buffer, "Debounce fired");
                    self.debounce = None;
                    self.request_index();
                }
                Some(done) = self.inflight.next(), if !self.inflight.is_empty() => {
                    self.apply(done);
                }
            }
        }

        info!(buffer = %self.buffer, "Session stopped");
        self
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ContentChanged => {
                let deadline = Instant::now() + self.config.navigator.debounce();
                debug!(buffer = %self.buffer, "Debounce armed");
                self.debounce = Some(deadline);
            }
            SessionEvent::Saved | SessionEvent::Refresh => self.refresh_now(),
            SessionEvent::BufferSwitched(buffer) => {
                info!(from = %self.buffer, to = %buffer, "Buffer switched");
                self.buffer = buffer;
                self.scope = Scope::File;
                self.namespace_pending = false;
                self.nav.clear_filter();
                // Entries without a source file resolve against the tracked buffer.
                self.nav.replace_index(Vec::new());
                self.nav.set_references(Vec::new());
                self.redraw();
                self.refresh_now();
            }
            SessionEvent::Command(cmd) => self.handle_command(cmd),
            SessionEvent::Shutdown => {}
        }
    }

    fn refresh_now(&mut self) {
        self.debounce = None;
        self.request_index();
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Re-fetch whatever the current scope lists, or is about to list.
    fn request_index(&mut self) {
        match self.scope.clone() {
            Scope::File if self.namespace_pending => self.request_namespace(None),
            Scope::File => self.request_document_symbols(),
            Scope::Namespace(ns) => self.request_namespace(Some(ns)),
        }
    }

    fn request_document_symbols(&mut self) {
        let generation = self.next_generation();
        let provider = Rc::clone(&self.provider);
        let buffer = self.buffer.clone();
        debug!(buffer = %buffer, generation, "Fetching document symbols");

        self.inflight.push(
            async move {
                let result = provider.fetch_document_symbols(&buffer).await;
                Completion::Symbols {
                    buffer,
                    generation,
                    result,
                }
            }
            .boxed_local(),
        );
    }

    /// Aggregate a namespace; `None` detects it from the buffer first.
    fn request_namespace(&mut self, known: Option<String>) {
        let generation = self.next_generation();
        let provider = Rc::clone(&self.provider);
        let fallback = self.fallback.clone();
        let buffer = self.buffer.clone();
        debug!(buffer = %buffer, generation, "Fetching namespace symbols");

        self.inflight.push(
            async move {
                let namespace = match known {
                    Some(ns) => Some(ns),
                    None => match fallback {
                        Some(f) => f.parse_declaration_near(&buffer).await,
                        None => None,
                    },
                };
                let result = match namespace {
                    Some(ns) => provider
                        .fetch_workspace_symbols(&ns)
                        .await
                        .map(|entries| Some((ns, entries))),
                    None => Ok(None),
                };
                Completion::Namespace {
                    buffer,
                    generation,
                    result,
                }
            }
            .boxed_local(),
        );
    }

    fn request_references(&mut self, position: Position) {
        self.reference_generation += 1;
        let generation = self.reference_generation;
        let provider = Rc::clone(&self.provider);
        let buffer = self.buffer.clone();

        self.inflight.push(
            async move {
                let result = provider.fetch_references(&buffer, position).await;
                Completion::References {
                    buffer,
                    generation,
                    result,
                }
            }
            .boxed_local(),
        );
    }

    fn is_stale(&self, buffer: &BufferId, generation: u64, latest: u64) -> bool {
        let stale = *buffer != self.buffer || generation != latest;
        if stale {
            debug!(buffer = %buffer, generation, latest, "Discarding stale fetch");
        }
        stale
    }

    fn apply(&mut self, done: Completion) {
        match done {
            Completion::Symbols {
                buffer,
                generation,
                result,
            } => {
                if self.is_stale(&buffer, generation, self.generation) {
                    return;
                }
                match result {
                    Ok(tree) => {
                        let profile = registry().profile_for_path(buffer.path());
                        let entries = flatten(&tree, profile);
                        debug!(buffer = %buffer, generation, entries = entries.len(), "Index replaced");
                        self.scope = Scope::File;
                        self.nav.replace_index(entries);
                        self.redraw();
                    }
                    Err(e) => self.report(&e),
                }
            }
            Completion::Namespace {
                buffer,
                generation,
                result,
            } => {
                if self.is_stale(&buffer, generation, self.generation) {
                    return;
                }
                self.namespace_pending = false;
                match result {
                    Ok(Some((ns, entries))) => {
                        debug!(namespace = %ns, entries = entries.len(), "Namespace index replaced");
                        self.scope = Scope::Namespace(ns);
                        self.nav.replace_index(entries);
                        self.redraw();
                    }
                    Ok(None) => {
                        debug!(buffer = %buffer, "No namespace detected, keeping file scope");
                        // This request superseded any file fetch issued before it.
                        self.request_document_symbols();
                    }
                    Err(e) => {
                        self.report(&e);
                        if self.scope == Scope::File {
                            self.request_document_symbols();
                        }
                    }
                }
            }
            Completion::References {
                buffer,
                generation,
                result,
            } => {
                if self.is_stale(&buffer, generation, self.reference_generation) {
                    return;
                }
                match result {
                    Ok(refs) => {
                        debug!(buffer = %buffer, references = refs.len(), "References loaded");
                        self.nav.set_references(refs);
                    }
                    Err(e) => self.report(&e),
                }
            }
        }
    }

    fn report(&self, err: &ProviderError) {
        warn!(buffer = %self.buffer, error = %err, "Provider request failed");
        self.sink.report(&err.to_string());
    }

    fn redraw(&self) {
        if self.visible {
            self.sink
                .render(&render_frame(&self.nav, &self.buffer, &self.config.display));
        }
    }

    fn show(&mut self) {
        self.visible = true;
        self.redraw();
    }

    fn jump_to_current(&self) {
        if let Some(target) = self.nav.jump_target(&self.buffer) {
            self.sink.jump(&target);
        }
    }

    /// Listing visible: move the highlight. Hidden: move and jump.
    fn after_move(&self) {
        if self.visible {
            self.redraw();
        } else {
            self.jump_to_current();
        }
    }

    fn jump_to_reference(&self, reference: Option<Reference>) {
        if let Some(r) = reference {
            self.sink.jump(&JumpTarget::new(r.file, r.range.start));
        }
    }

    pub fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Show => self.show(),
            Command::Hide => {
                self.visible = false;
                self.sink.hide();
            }
            Command::Next => {
                if self.nav.next().is_some() {
                    self.after_move();
                }
            }
            Command::Prev => {
                if self.nav.prev().is_some() {
                    self.after_move();
                }
            }
            Command::NextReference => {
                let r = self.nav.next_reference().cloned();
                self.jump_to_reference(r);
            }
            Command::PrevReference => {
                let r = self.nav.prev_reference().cloned();
                self.jump_to_reference(r);
            }
            Command::References { line, column } => {
                self.request_references(Position::new(line, column));
            }
            Command::BeginFilter => {
                self.nav.begin_filter();
                self.show();
            }
            Command::Type { text } => {
                if self.nav.push_str(&text) {
                    self.redraw();
                }
            }
            Command::Backspace => {
                if self.nav.backspace() {
                    self.redraw();
                }
            }
            Command::Accept => {
                self.nav.accept();
                self.redraw();
            }
            Command::Dismiss => {
                self.nav.dismiss();
                self.redraw();
            }
            Command::Cancel => {
                self.nav.cancel();
                self.redraw();
            }
            Command::ClearFilter => {
                self.nav.clear_filter();
                self.redraw();
            }
            Command::Jump => self.jump_to_current(),
            Command::ToggleNamespace => self.toggle_namespace(),
            Command::Search => self.search(),
        }
    }

    fn toggle_namespace(&mut self) {
        if !self.config.namespace.enabled {
            self.sink.report("Namespace scope is disabled");
            return;
        }
        match self.scope {
            Scope::Namespace(_) => {
                self.scope = Scope::File;
                self.request_document_symbols();
            }
            Scope::File if self.namespace_pending => {
                self.namespace_pending = false;
                self.request_document_symbols();
            }
            Scope::File => {
                if self.fallback.is_none() {
                    self.sink.report("Namespace detection is unavailable for this buffer");
                    return;
                }
                self.namespace_pending = true;
                self.request_namespace(None);
            }
        }
    }

    fn search(&mut self) {
        let finder = match (&self.finder, self.visible) {
            (Some(finder), false) => finder,
            _ => {
                self.nav.begin_filter();
                self.show();
                return;
            }
        };

        let buffer_path = self.buffer.path().to_path_buf();
        let format = |e: &SymbolEntry| format_entry(e, &buffer_path);
        let picked = finder
            .pick(self.nav.full_index(), &format)
            .and_then(|idx| self.nav.full_index().get(idx).cloned());

        if let Some(entry) = picked {
            self.nav.focus(&entry);
            if let Some(target) = entry_jump_target(&entry, &self.buffer) {
                self.sink.jump(&target);
            }
        }
    }
}
