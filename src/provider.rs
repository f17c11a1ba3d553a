//! Collaborator seams: where symbols come from and where render/jump
//! instructions go. The session owns one of each behind `Rc<dyn ...>`.

use async_trait::async_trait;
use lsp_types::Position;

use crate::error::ProviderResult;
use crate::render::RenderFrame;
use crate::symbol::{BufferId, HierarchicalSymbol, JumpTarget, Reference, SymbolEntry};

/// Source of hierarchical symbol trees (a language server, or the syntax-tree provider).
#[async_trait(?Send)]
pub trait SymbolProvider {
    async fn fetch_document_symbols(&self, buffer: &BufferId) -> ProviderResult<Vec<HierarchicalSymbol>>;

    async fn fetch_references(&self, buffer: &BufferId, position: Position) -> ProviderResult<Vec<Reference>>;

    /// Flat entries belonging to `namespace`, each tagged with its source file.
    async fn fetch_workspace_symbols(&self, namespace: &str) -> ProviderResult<Vec<SymbolEntry>>;
}

/// Namespace/package lookup used when deciding namespace-wide scope.
#[async_trait(?Send)]
pub trait SyntaxTreeFallback {
    async fn parse_declaration_near(&self, buffer: &BufferId) -> Option<String>;
}

/// Receives everything the navigator wants shown.
pub trait PresentationSink {
    fn render(&self, frame: &RenderFrame);

    fn hide(&self) {}

    fn jump(&self, target: &JumpTarget);

    /// Advisory only; the session keeps running.
    fn report(&self, message: &str);
}

/// Alternate picker used by `search` while the listing is hidden.
pub trait FuzzyFinder {
    fn pick(&self, entries: &[SymbolEntry], format: &dyn Fn(&SymbolEntry) -> String) -> Option<usize>;
}
