//! Tree-sitter backed symbol provider for files on disk.
//!
//! Used by the CLI and whenever no language server is attached. Outlines are
//! driven entirely by the language profile: it says which nodes are symbols and
//! which top-level nodes declare a namespace.

use async_trait::async_trait;
use lsp_types::{Position, Range};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;
use tree_sitter::{Node, Parser, Point, Tree};

use crate::config::NamespaceConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::flatten::flatten_from;
use crate::namespace;
use crate::profile::{registry, LanguageProfile};
use crate::provider::{SymbolProvider, SyntaxTreeFallback};
use crate::scanner::{scan_sources, SourceFile};
use crate::symbol::{BufferId, HierarchicalSymbol, Reference, SymbolEntry};

/// Top-level named nodes inspected for a namespace/package declaration.
const DECLARATION_SCAN_NODES: usize = 16;

const MAX_SIGNATURE_CHARS: usize = 240;

const IDENTIFIER_KINDS: &[&str] = &[
    "identifier",
    "type_identifier",
    "field_identifier",
    "property_identifier",
    "package_identifier",
    "shorthand_property_identifier",
    "shorthand_property_identifier_pattern",
];

pub(crate) fn node_text<'a>(source: &'a [u8], node: Node) -> &'a str {
    std::str::from_utf8(&source[node.start_byte()..node.end_byte()]).unwrap_or("")
}

fn parse_source(text: &str, file: &Path, profile: &dyn LanguageProfile) -> ProviderResult<Tree> {
    let language = profile
        .syntax_language(file)
        .ok_or_else(|| ProviderError::UnsupportedLanguage(profile.name().to_string()))?;

    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| ProviderError::Parse(e.to_string()))?;
    parser
        .parse(text, None)
        .ok_or_else(|| ProviderError::Parse(format!("Failed to parse {}", file.display())))
}

/// Declaration line of a node: first line only, body opener dropped, whitespace collapsed.
fn first_line_signature(def_text: &str) -> String {
    let line = def_text.lines().next().unwrap_or("");
    let head = match line.find(" {").or_else(|| line.find("\t{")) {
        Some(idx) => &line[..idx],
        None => line,
    };
    let mut sig = head.split_whitespace().collect::<Vec<_>>().join(" ");
    if sig.chars().count() > MAX_SIGNATURE_CHARS {
        sig = sig.chars().take(MAX_SIGNATURE_CHARS).collect();
    }
    sig.trim_end_matches('{').trim_end().to_string()
}

/// Python decorators live on a wrapping node; fold them into the signature.
fn signature_for(node: Node, source: &[u8]) -> String {
    let sig = first_line_signature(node_text(source, node));
    match node.parent() {
        Some(parent) if parent.kind() == "decorated_definition" => {
            let mut cursor = parent.walk();
            let decorators: Vec<&str> = parent
                .named_children(&mut cursor)
                .filter(|n| n.kind() == "decorator")
                .map(|n| node_text(source, n).trim())
                .collect();
            if decorators.is_empty() {
                sig
            } else {
                format!("{} {}", decorators.join(" "), sig)
            }
        }
        _ => sig,
    }
}

/// Tree-sitter points count bytes; LSP columns count UTF-16 units.
fn to_position(source: &[u8], byte: usize, point: Point) -> Position {
    let line_start = byte.saturating_sub(point.column);
    let prefix = std::str::from_utf8(&source[line_start..byte]).unwrap_or("");
    Position::new(point.row as u32, prefix.encode_utf16().count() as u32)
}

fn node_range(source: &[u8], node: Node) -> Range {
    Range::new(
        to_position(source, node.start_byte(), node.start_position()),
        to_position(source, node.end_byte(), node.end_position()),
    )
}

fn byte_offset(text: &str, pos: Position) -> Option<usize> {
    let mut line_start = 0usize;
    for _ in 0..pos.line {
        line_start += text[line_start..].find('\n')? + 1;
    }
    let line = &text[line_start..];
    let line_end = line.find('\n').unwrap_or(line.len());

    let mut units = 0u32;
    for (i, c) in line[..line_end].char_indices() {
        if units >= pos.character {
            return Some(line_start + i);
        }
        units += c.len_utf16() as u32;
    }
    Some(line_start + line_end)
}

/// Namespace/package declared among the first top-level nodes of `text`.
pub fn declaration_near(text: &str, file: &Path, profile: &dyn LanguageProfile) -> Option<String> {
    let tree = parse_source(text, file, profile).ok()?;
    let root = tree.root_node();
    let source = text.as_bytes();

    let mut cursor = root.walk();
    let found = root
        .named_children(&mut cursor)
        .take(DECLARATION_SCAN_NODES)
        .find_map(|n| profile.declaration_name(n, source))
        .filter(|name| !name.is_empty());
    found
}

/// Hierarchical outline of `text`, in source order.
pub fn outline(text: &str, file: &Path, profile: &dyn LanguageProfile) -> ProviderResult<Vec<HierarchicalSymbol>> {
    let tree = parse_source(text, file, profile)?;
    let mut out = Vec::new();
    collect_outline(tree.root_node(), text.as_bytes(), profile, &mut out);
    Ok(out)
}

fn collect_outline(node: Node, source: &[u8], profile: &dyn LanguageProfile, out: &mut Vec<HierarchicalSymbol>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let Some(kind) = profile.outline_kind(child) else {
            collect_outline(child, source, profile, out);
            continue;
        };

        let name_node = child
            .child_by_field_name("name")
            .or_else(|| child.child_by_field_name("type"));
        let Some(name_node) = name_node else {
            collect_outline(child, source, profile, out);
            continue;
        };
        let name = node_text(source, name_node).trim();
        if name.is_empty() {
            collect_outline(child, source, profile, out);
            continue;
        }

        let mut sym = HierarchicalSymbol::new(name, kind);
        sym.range = Some(node_range(source, child));
        sym.selection_range = Some(node_range(source, name_node));
        let sig = signature_for(child, source);
        if !sig.is_empty() {
            sym.detail = Some(sig);
        }
        collect_outline(child, source, profile, &mut sym.children);
        out.push(sym);
    }
}

fn is_identifier(node: &Node) -> bool {
    IDENTIFIER_KINDS.contains(&node.kind())
}

fn identifier_node_at(tree: &Tree, offset: usize) -> Option<Node<'_>> {
    let root = tree.root_node();
    if let Some(n) = root.descendant_for_byte_range(offset, offset).filter(is_identifier) {
        return Some(n);
    }
    // Cursor just past the last character of a name.
    let prev = offset.checked_sub(1)?;
    root.descendant_for_byte_range(prev, prev).filter(is_identifier)
}

/// Identifier under `position`, if any.
pub fn identifier_at(
    text: &str,
    file: &Path,
    profile: &dyn LanguageProfile,
    position: Position,
) -> ProviderResult<Option<String>> {
    let tree = parse_source(text, file, profile)?;
    let Some(offset) = byte_offset(text, position) else {
        return Ok(None);
    };
    Ok(identifier_node_at(&tree, offset).map(|n| node_text(text.as_bytes(), n).to_string()))
}

/// Identifier leaves spelled `name`, skipping comment and string subtrees.
fn collect_identifier_refs(node: Node, source: &[u8], name: &str, out: &mut Vec<Range>) {
    let kind = node.kind();
    if kind.contains("comment")
        || matches!(
            kind,
            "string"
                | "string_literal"
                | "raw_string"
                | "raw_string_literal"
                | "interpreted_string_literal"
                | "verbatim_string_literal"
                | "char_literal"
                | "character_literal"
                | "template_string"
                | "string_fragment"
        )
    {
        return;
    }

    if node.child_count() == 0 {
        if is_identifier(&node) && node_text(source, node) == name {
            out.push(node_range(source, node));
        }
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_identifier_refs(child, source, name, out);
    }
}

pub fn identifier_refs(text: &str, file: &Path, profile: &dyn LanguageProfile, name: &str) -> ProviderResult<Vec<Range>> {
    let tree = parse_source(text, file, profile)?;
    let mut out = Vec::new();
    collect_identifier_refs(tree.root_node(), text.as_bytes(), name, &mut out);
    Ok(out)
}

/// Prefix an entry with the file's declared namespace unless its path already carries it.
fn qualify_under(mut entry: SymbolEntry, declared: &str) -> SymbolEntry {
    if !namespace::matches(&entry.qualified_name, declared) {
        entry.qualified_name = format!("{declared}.{}", entry.qualified_name);
        entry.depth += 1;
    }
    entry
}

fn namespace_entries(file: &SourceFile, target: &str) -> Option<Vec<SymbolEntry>> {
    let text = std::fs::read_to_string(&file.abs_path).ok()?;
    let profile = registry().profile_for_path(&file.abs_path);
    let declared = namespace::detect_declaration(&text, &file.abs_path, profile)?;
    if !namespace::matches(&declared, target) {
        return None;
    }

    let tree = match outline(&text, &file.abs_path, profile) {
        Ok(tree) => tree,
        Err(e) => {
            debug!(file = %file.rel_path.display(), error = %e, "Skipping unparsable file");
            return None;
        }
    };
    let entries = flatten_from(&tree, profile, Some(&file.abs_path))
        .into_iter()
        .map(|e| qualify_under(e, &declared))
        .filter(|e| namespace::matches(&e.qualified_name, target))
        .collect();
    Some(entries)
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Syntax-tree symbol provider rooted at a workspace directory.
#[derive(Debug, Clone)]
pub struct TreeSitterProvider {
    root: PathBuf,
    limits: NamespaceConfig,
}

impl TreeSitterProvider {
    pub fn new(root: impl Into<PathBuf>, limits: NamespaceConfig) -> Self {
        Self {
            root: root.into(),
            limits,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sources(root: &Path, limits: &NamespaceConfig) -> ProviderResult<Vec<SourceFile>> {
        scan_sources(root, limits).map_err(|e| ProviderError::Workspace(format!("{e:#}")))
    }

    /// Blocking: walks and parses the whole workspace.
    pub fn aggregate_namespace(&self, target: &str) -> ProviderResult<Vec<SymbolEntry>> {
        let files = Self::sources(&self.root, &self.limits)?;
        let per_file: Vec<Vec<SymbolEntry>> = files
            .par_iter()
            .filter_map(|f| namespace_entries(f, target))
            .collect();

        let entries: Vec<SymbolEntry> = per_file.into_iter().flatten().collect();
        debug!(namespace = target, files = files.len(), entries = entries.len(), "Namespace aggregated");
        Ok(entries)
    }

    /// Blocking: same-spelled identifiers in files of the buffer's language.
    pub fn find_references(&self, file: &Path, position: Position) -> ProviderResult<Vec<Reference>> {
        let text = std::fs::read_to_string(file)?;
        let profile = registry().profile_for_path(file);
        let Some(name) = identifier_at(&text, file, profile, position)? else {
            return Ok(Vec::new());
        };

        let mut files: Vec<PathBuf> = Self::sources(&self.root, &self.limits)?
            .into_iter()
            .map(|f| f.abs_path)
            .filter(|p| registry().profile_for_path(p).name() == profile.name())
            .collect();
        if !files.iter().any(|p| same_file(p, file)) {
            files.insert(0, file.to_path_buf());
        }

        let per_file: Vec<Vec<Reference>> = files
            .par_iter()
            .map(|path| {
                let Ok(text) = std::fs::read_to_string(path) else {
                    return Vec::new();
                };
                identifier_refs(&text, path, profile, &name)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|range| Reference {
                        file: path.clone(),
                        range,
                    })
                    .collect()
            })
            .collect();
        Ok(per_file.into_iter().flatten().collect())
    }
}

#[async_trait(?Send)]
impl SymbolProvider for TreeSitterProvider {
    async fn fetch_document_symbols(&self, buffer: &BufferId) -> ProviderResult<Vec<HierarchicalSymbol>> {
        let text = tokio::fs::read_to_string(buffer.path()).await?;
        let profile = registry().profile_for_path(buffer.path());
        outline(&text, buffer.path(), profile)
    }

    async fn fetch_references(&self, buffer: &BufferId, position: Position) -> ProviderResult<Vec<Reference>> {
        let this = self.clone();
        let file = buffer.path().to_path_buf();
        tokio::task::spawn_blocking(move || this.find_references(&file, position))
            .await
            .map_err(|e| ProviderError::Workspace(e.to_string()))?
    }

    async fn fetch_workspace_symbols(&self, namespace: &str) -> ProviderResult<Vec<SymbolEntry>> {
        let this = self.clone();
        let target = namespace.to_string();
        tokio::task::spawn_blocking(move || this.aggregate_namespace(&target))
            .await
            .map_err(|e| ProviderError::Workspace(e.to_string()))?
    }
}

#[async_trait(?Send)]
impl SyntaxTreeFallback for TreeSitterProvider {
    async fn parse_declaration_near(&self, buffer: &BufferId) -> Option<String> {
        let text = tokio::fs::read_to_string(buffer.path()).await.ok()?;
        let profile = registry().profile_for_path(buffer.path());
        namespace::detect_declaration(&text, buffer.path(), profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use crate::profile::{GoProfile, PythonProfile, RustProfile, TypeScriptProfile};
    use crate::symbol::SymbolKind;
    use std::fs;

    const RUST_SRC: &str = "\
mod geometry {
    pub struct Point {
        x: i32,
    }

    impl Point {
        pub fn norm(&self) -> f64 {
            0.0
        }
    }
}

fn main() {
    // Point is mentioned here only in a comment
    let p = geometry::Point { x: 1 };
    let label = \"Point\";
}
";

    #[test]
    fn rust_outline_nests_and_records_ranges() {
        let tree = outline(RUST_SRC, Path::new("lib.rs"), &RustProfile).unwrap();
        let flat = flatten(&tree, &RustProfile);
        let names: Vec<_> = flat.iter().map(|e| e.qualified_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["geometry", "geometry.Point", "geometry.Point", "geometry.Point.norm", "main"]
        );

        let norm = &flat[3];
        assert_eq!(norm.kind, SymbolKind::Function);
        assert_eq!(norm.signature.as_deref(), Some("pub fn norm(&self) -> f64"));
        assert_eq!(norm.selection_range.map(|r| r.start), Some(Position::new(6, 15)));
        assert_eq!(norm.range.map(|r| r.start), Some(Position::new(6, 8)));
    }

    #[test]
    fn python_decorators_fold_into_signature() {
        let src = "class Svc:\n    @staticmethod\n    def build(n) -> int:\n        return n\n";
        let tree = outline(src, Path::new("svc.py"), &PythonProfile).unwrap();
        let build = &tree[0].children[0];
        assert_eq!(build.name, "build");
        assert_eq!(build.detail.as_deref(), Some("@staticmethod def build(n) -> int:"));
    }

    #[test]
    fn go_outline_refines_type_specs() {
        let src = "package api\n\ntype Server struct {\n\tport int\n}\n\ntype Handler interface {\n\tServe() error\n}\n\nfunc (s *Server) Run() error {\n\treturn nil\n}\n";
        let tree = outline(src, Path::new("api.go"), &GoProfile).unwrap();
        let kinds: Vec<_> = tree.iter().map(|s| (s.name.as_str(), s.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("Server", SymbolKind::Struct),
                ("Handler", SymbolKind::Interface),
                ("Run", SymbolKind::Method),
            ]
        );
        assert_eq!(tree[0].children[0].name, "port");
        assert_eq!(tree[2].detail.as_deref(), Some("func (s *Server) Run() error"));
    }

    #[test]
    fn references_skip_comments_and_strings() {
        let refs = identifier_refs(RUST_SRC, Path::new("lib.rs"), &RustProfile, "Point").unwrap();
        let lines: Vec<_> = refs.iter().map(|r| r.start.line).collect();
        assert_eq!(lines, vec![1, 5, 14]);
    }

    #[test]
    fn identifier_lookup_by_position() {
        let p = Path::new("lib.rs");
        let at = |line, col| identifier_at(RUST_SRC, p, &RustProfile, Position::new(line, col)).unwrap();
        assert_eq!(at(1, 15).as_deref(), Some("Point"));
        assert_eq!(at(1, 20).as_deref(), Some("Point"));
        assert_eq!(at(0, 3), None);
    }

    #[test]
    fn utf16_columns() {
        let src = "fn é() {}\nfn b() {}\n";
        let tree = outline(src, Path::new("u.rs"), &RustProfile).unwrap();
        assert_eq!(tree[0].selection_range.map(|r| r.end), Some(Position::new(0, 4)));
        assert_eq!(byte_offset(src, Position::new(1, 3)), Some(14));
    }

    #[test]
    fn typescript_declaration_inside_export() {
        let src = "export namespace Shapes.Flat {\n  export function area(): number { return 0; }\n}\n";
        assert_eq!(
            declaration_near(src, Path::new("s.ts"), &TypeScriptProfile).as_deref(),
            Some("Shapes.Flat")
        );
    }

    #[test]
    fn namespace_aggregation_over_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("billing")).unwrap();
        fs::write(
            root.join("billing/invoice.go"),
            "package billing\n\nfunc Total() int {\n\treturn 0\n}\n",
        )
        .unwrap();
        fs::write(
            root.join("billing/tax.go"),
            "package billing\n\ntype Rate struct{}\n",
        )
        .unwrap();
        fs::write(root.join("other.go"), "package billinghelper\n\nfunc Nope() {}\n").unwrap();

        let provider = TreeSitterProvider::new(root, NamespaceConfig::default());
        let entries = provider.aggregate_namespace("billing").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["billing.Total", "billing.Rate"]);
        assert!(entries.iter().all(|e| e.source_file.is_some()));
        assert_eq!(entries[0].depth, 1);
    }

    #[test]
    fn workspace_references_stay_in_language() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let a = root.join("a.py");
        fs::write(&a, "def greet():\n    pass\n").unwrap();
        fs::write(root.join("b.py"), "from a import greet\ngreet()\n").unwrap();
        fs::write(root.join("c.rs"), "fn greet() {}\n").unwrap();

        let provider = TreeSitterProvider::new(root, NamespaceConfig::default());
        let refs = provider.find_references(&a, Position::new(0, 5)).unwrap();
        let files: Vec<_> = refs
            .iter()
            .map(|r| r.file.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files, vec!["a.py", "b.py", "b.py"]);
    }
}
