//! Symbol shapes shared by the flattener, the inference rules and the navigator.

use lsp_types::{DocumentSymbol, Location, Position, Range, SymbolKind as LspSymbolKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Symbol category, collapsed from the language-server kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Namespace,
    Class,
    Struct,
    Interface,
    Enum,
    EnumMember,
    Method,
    Function,
    Constructor,
    Property,
    Field,
    Variable,
    Constant,
    Event,
    Operator,
    TypeParameter,
    Object,
    Unknown,
}

impl From<LspSymbolKind> for SymbolKind {
    fn from(kind: LspSymbolKind) -> Self {
        match kind {
            LspSymbolKind::FILE
            | LspSymbolKind::MODULE
            | LspSymbolKind::NAMESPACE
            | LspSymbolKind::PACKAGE => SymbolKind::Namespace,
            LspSymbolKind::CLASS => SymbolKind::Class,
            LspSymbolKind::STRUCT => SymbolKind::Struct,
            LspSymbolKind::INTERFACE => SymbolKind::Interface,
            LspSymbolKind::ENUM => SymbolKind::Enum,
            LspSymbolKind::ENUM_MEMBER => SymbolKind::EnumMember,
            LspSymbolKind::METHOD => SymbolKind::Method,
            LspSymbolKind::FUNCTION => SymbolKind::Function,
            LspSymbolKind::CONSTRUCTOR => SymbolKind::Constructor,
            LspSymbolKind::PROPERTY => SymbolKind::Property,
            LspSymbolKind::FIELD => SymbolKind::Field,
            LspSymbolKind::VARIABLE => SymbolKind::Variable,
            LspSymbolKind::CONSTANT => SymbolKind::Constant,
            LspSymbolKind::EVENT => SymbolKind::Event,
            LspSymbolKind::OPERATOR => SymbolKind::Operator,
            LspSymbolKind::TYPE_PARAMETER => SymbolKind::TypeParameter,
            LspSymbolKind::OBJECT => SymbolKind::Object,
            _ => SymbolKind::Unknown,
        }
    }
}

impl SymbolKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            SymbolKind::Namespace => "namespace",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Interface => "interface",
            SymbolKind::Enum => "enum",
            SymbolKind::EnumMember => "enum member",
            SymbolKind::Method => "method",
            SymbolKind::Function => "function",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Property => "property",
            SymbolKind::Field => "field",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Event => "event",
            SymbolKind::Operator => "operator",
            SymbolKind::TypeParameter => "type parameter",
            SymbolKind::Object => "object",
            SymbolKind::Unknown => "symbol",
        }
    }

    /// Kinds whose signature describes a value or return type worth classifying.
    pub fn carries_value_type(&self) -> bool {
        matches!(
            self,
            SymbolKind::Method
                | SymbolKind::Function
                | SymbolKind::Property
                | SymbolKind::Field
                | SymbolKind::Variable
                | SymbolKind::Constant
                | SymbolKind::Object
                | SymbolKind::Unknown
        )
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, SymbolKind::Method | SymbolKind::Function)
    }
}

/// Identity of the buffer a session tracks. Backed by the file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferId(PathBuf);

impl BufferId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// One node of a provider's symbol tree, before flattening.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchicalSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub detail: Option<String>,
    pub range: Option<Range>,
    pub selection_range: Option<Range>,
    pub children: Vec<HierarchicalSymbol>,
}

impl HierarchicalSymbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            detail: None,
            range: None,
            selection_range: None,
            children: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_children(mut self, children: Vec<HierarchicalSymbol>) -> Self {
        self.children = children;
        self
    }
}

impl From<DocumentSymbol> for HierarchicalSymbol {
    fn from(sym: DocumentSymbol) -> Self {
        Self {
            name: sym.name,
            kind: sym.kind.into(),
            detail: sym.detail.filter(|d| !d.trim().is_empty()),
            range: Some(sym.range),
            selection_range: Some(sym.selection_range),
            children: sym
                .children
                .unwrap_or_default()
                .into_iter()
                .map(HierarchicalSymbol::from)
                .collect(),
        }
    }
}

/// One row of the flat index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolEntry {
    pub qualified_name: String,
    pub simple_name: String,
    pub kind: SymbolKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_range: Option<Range>,

    /// Originating file when the index spans several files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<PathBuf>,

    /// Nesting depth in the source tree (0 for roots).
    pub depth: usize,
}

impl SymbolEntry {
    /// Where "jump to" lands: the name span if known, else the declaration start.
    pub fn jump_position(&self) -> Option<Position> {
        self.selection_range
            .or(self.range)
            .map(|r| r.start)
    }

    /// Same symbol across two snapshots of an index.
    pub fn same_symbol(&self, other: &SymbolEntry) -> bool {
        self.qualified_name == other.qualified_name
            && self.kind == other.kind
            && self.source_file == other.source_file
    }
}

/// A reference location returned by the reference-lookup collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    pub file: PathBuf,
    pub range: Range,
}

impl TryFrom<Location> for Reference {
    type Error = String;

    fn try_from(loc: Location) -> Result<Self, Self::Error> {
        let file = loc
            .uri
            .to_file_path()
            .map_err(|_| format!("not a file URI: {}", loc.uri))?;
        Ok(Self {
            file,
            range: loc.range,
        })
    }
}

/// Instruction for the presentation sink to move the editor cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JumpTarget {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl JumpTarget {
    pub fn new(file: impl Into<PathBuf>, position: Position) -> Self {
        Self {
            file: file.into(),
            line: position.line,
            column: position.character,
        }
    }
}

pub fn span(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Range {
    Range::new(
        Position::new(start_line, start_col),
        Position::new(end_line, end_col),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(range: Option<Range>, selection: Option<Range>) -> SymbolEntry {
        SymbolEntry {
            qualified_name: "A.B".into(),
            simple_name: "B".into(),
            kind: SymbolKind::Method,
            signature: None,
            range,
            selection_range: selection,
            source_file: None,
            depth: 1,
        }
    }

    #[test]
    fn selection_range_wins_over_range() {
        let e = entry(Some(span(3, 0, 9, 1)), Some(span(4, 16, 4, 22)));
        assert_eq!(e.jump_position(), Some(Position::new(4, 16)));
    }

    #[test]
    fn range_start_used_only_without_selection_range() {
        let e = entry(Some(span(3, 2, 9, 1)), None);
        assert_eq!(e.jump_position(), Some(Position::new(3, 2)));
        assert_eq!(entry(None, None).jump_position(), None);
    }

    fn location(uri: &str) -> Location {
        serde_json::from_value(serde_json::json!({
            "uri": uri,
            "range": { "start": { "line": 7, "character": 2 }, "end": { "line": 7, "character": 9 } }
        }))
        .unwrap()
    }

    #[test]
    fn reference_from_file_location() {
        let r = Reference::try_from(location("file:///w/src/lib.rs")).unwrap();
        assert_eq!(r.file, PathBuf::from("/w/src/lib.rs"));
        assert_eq!(r.range, span(7, 2, 7, 9));
    }

    #[test]
    fn reference_rejects_non_file_uri() {
        let err = Reference::try_from(location("https://example.com/lib.rs")).unwrap_err();
        assert!(err.contains("not a file URI"), "{err}");
    }

    #[test]
    fn lsp_namespace_like_kinds_collapse() {
        assert_eq!(SymbolKind::from(LspSymbolKind::PACKAGE), SymbolKind::Namespace);
        assert_eq!(SymbolKind::from(LspSymbolKind::MODULE), SymbolKind::Namespace);
        assert_eq!(SymbolKind::from(LspSymbolKind::KEY), SymbolKind::Unknown);
    }

    #[test]
    fn document_symbol_conversion_keeps_children_order() {
        let json = serde_json::json!({
            "name": "Outer",
            "kind": 5,
            "detail": "",
            "range": { "start": { "line": 0, "character": 0 }, "end": { "line": 10, "character": 1 } },
            "selectionRange": { "start": { "line": 0, "character": 6 }, "end": { "line": 0, "character": 11 } },
            "children": [
                { "name": "first", "kind": 6,
                  "range": { "start": { "line": 1, "character": 0 }, "end": { "line": 2, "character": 0 } },
                  "selectionRange": { "start": { "line": 1, "character": 4 }, "end": { "line": 1, "character": 9 } } },
                { "name": "second", "kind": 6,
                  "range": { "start": { "line": 3, "character": 0 }, "end": { "line": 4, "character": 0 } },
                  "selectionRange": { "start": { "line": 3, "character": 4 }, "end": { "line": 3, "character": 10 } } }
            ]
        });
        let doc: DocumentSymbol = serde_json::from_value(json).unwrap();
        let sym = HierarchicalSymbol::from(doc);
        assert_eq!(sym.kind, SymbolKind::Class);
        assert_eq!(sym.detail, None, "blank detail is dropped");
        let names: Vec<_> = sym.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
