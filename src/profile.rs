//! Language profiles: per-language classification, artifact cleanup, type-token
//! extraction, inference pattern tables and tree-sitter hooks.
//!
//! Downstream code never branches on a language name; it asks the profile.

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tree_sitter::{Language, Node};

use crate::symbol::SymbolKind;
use crate::syntax::node_text;

/// Generic wrappers whose type argument is the eventual value (`Task<T>`, `Promise<T>`).
#[derive(Debug, Clone)]
pub struct AsyncWrappers {
    pub names: &'static [&'static str],
    pub open: char,
    pub close: char,
}

/// Rules for languages with multi-value returns and channel types.
#[derive(Debug, Clone)]
pub struct StructuralRules {
    /// Canonical error type; a trailing return of this type marks the function fallible.
    pub error_type: &'static str,
    pub channel_keyword: &'static str,
}

/// Name conventions that hint a function is meant to run concurrently.
///
/// Best-effort: matching is a plain prefix/suffix test and will both miss and over-match.
#[derive(Debug, Clone)]
pub struct ConcurrencyNames {
    pub prefixes: &'static [&'static str],
    pub suffixes: &'static [&'static str],
}

impl ConcurrencyNames {
    pub fn matches(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.prefixes.iter().any(|p| lower.starts_with(p))
            || self.suffixes.iter().any(|s| lower.len() > s.len() && lower.ends_with(s))
    }
}

/// Pattern tables consulted by `infer::infer_display`.
#[derive(Debug, Default)]
pub struct InferenceRules {
    pub async_wrappers: Option<AsyncWrappers>,
    pub structural: Option<StructuralRules>,
    /// Leading-uppercase names are exported, everything else is package-private.
    pub visibility_by_case: bool,
    pub pointer_receiver: Option<Regex>,
    pub static_marker: Option<Regex>,
    pub generic_marker: Option<Regex>,
    pub concurrency_entry: Option<ConcurrencyNames>,
}

pub trait LanguageProfile: Send + Sync {
    fn name(&self) -> &'static str;

    /// Editor filetype tags that select this profile (besides the extensions).
    fn filetypes(&self) -> &'static [&'static str];

    fn extensions(&self) -> &'static [&'static str];

    fn handles_path(&self, path: &Path) -> bool {
        let ext = path_ext_lower(path);
        self.extensions().contains(&ext.as_str())
    }

    /// File-name artifacts stripped from synthesized container names (e.g. ".cs").
    fn artifact_suffixes(&self) -> &'static [&'static str] {
        &[]
    }

    fn rules(&self) -> &InferenceRules;

    /// The part of a signature that names the value or return type.
    ///
    /// Empty when the signature has no type to classify.
    fn type_token<'a>(&self, signature: &'a str) -> &'a str {
        trim_declaration_tail(signature)
    }

    /// How many leading lines the regex declaration fallback scans.
    fn declaration_scan_lines(&self) -> usize {
        0
    }

    /// Anchored line patterns; capture group 1 is the declared namespace/package.
    fn declaration_patterns(&self) -> &[Regex] {
        &[]
    }

    fn syntax_language(&self, _path: &Path) -> Option<Language> {
        None
    }

    /// Symbol kind for an outline-worthy syntax node, `None` to look through it.
    fn outline_kind(&self, _node: Node) -> Option<SymbolKind> {
        None
    }

    /// Namespace/package declared by a top-level syntax node.
    fn declaration_name(&self, _node: Node, _source: &[u8]) -> Option<String> {
        None
    }
}

pub fn path_ext_lower(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
}

fn static_regex() -> Option<Regex> {
    Regex::new(r"\bstatic\b").ok()
}

// ---------------------------------------------------------------------------
// Type-token helpers
// ---------------------------------------------------------------------------

/// Strip a trailing body opener / terminator and any `where` clause.
fn trim_declaration_tail(sig: &str) -> &str {
    let sig = match sig.find(" where ") {
        Some(idx) => &sig[..idx],
        None => sig,
    };
    sig.trim()
        .trim_end_matches(|c: char| matches!(c, '{' | ':' | ';' | ',') || c.is_whitespace())
}

/// Text after the last bracket-depth-0 separator.
///
/// Without a separator, a signature that has a parameter list has no declared
/// type (empty result); otherwise the whole signature is the type.
fn trailing_type<'a>(sig: &'a str, separators: &[&str]) -> &'a str {
    let sig = trim_declaration_tail(sig);
    let bytes = sig.as_bytes();
    let mut depth = 0i32;
    let mut last: Option<usize> = None;
    let mut saw_params = false;
    let mut i = 0;

    while i < bytes.len() {
        let rest = &sig[i..];
        if rest.starts_with("->") || rest.starts_with("=>") {
            if depth == 0 && separators.iter().any(|s| rest.starts_with(s)) {
                last = Some(i + 2);
            }
            i += 2;
            continue;
        }
        if depth == 0 {
            if let Some(sep) = separators.iter().find(|s| rest.starts_with(**s)) {
                last = Some(i + sep.len());
                i += sep.len();
                continue;
            }
        }
        match bytes[i] {
            b'(' => {
                saw_params = true;
                depth += 1;
            }
            b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' | b'>' => depth = (depth - 1).max(0),
            _ => {}
        }
        i += 1;
    }

    match last {
        Some(p) => sig[p..].trim(),
        None if saw_params => "",
        None => sig,
    }
}

/// First bracket-balanced token after any leading modifiers (`public static Task<int> Foo()`).
fn leading_type<'a>(sig: &'a str, modifiers: &[&str]) -> &'a str {
    let mut rest = trim_declaration_tail(sig);
    loop {
        let token = first_token(rest);
        if token.is_empty() {
            return "";
        }
        let skip = modifiers.contains(&token) || (token.starts_with('<') && token.ends_with('>'));
        if !skip {
            return token;
        }
        rest = rest[token.len()..].trim_start();
    }
}

/// Type of a `name: Type = value` declaration; `None` without a lone `:` at depth 0.
fn annotated_type(sig: &str) -> Option<&str> {
    let bytes = sig.as_bytes();
    let mut depth = 0i32;
    let mut start = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' | b'>' => depth = (depth - 1).max(0),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => i += 1,
            b':' if depth == 0 && start.is_none() => start = Some(i + 1),
            b'=' if depth == 0 && start.is_some() && !matches!(bytes.get(i + 1), Some(b'=' | b'>')) => {
                return start.map(|s| sig[s..i].trim());
            }
            _ => {}
        }
        i += 1;
    }
    start.map(|s| sig[s..].trim())
}

/// Leading run of text up to the first whitespace at bracket depth 0.
fn first_token(s: &str) -> &str {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth = (depth - 1).max(0),
            c if c.is_whitespace() && depth == 0 => return &s[..i],
            _ => {}
        }
    }
    s
}

/// End (exclusive) of the bracket group opening at `open_idx`.
fn group_end(s: &str, open_idx: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let (open, close) = match bytes.get(open_idx)? {
        b'(' => (b'(', b')'),
        b'[' => (b'[', b']'),
        _ => return None,
    };
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(open_idx) {
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(i + 1);
            }
        }
    }
    None
}

/// Result list of a Go function signature, receiver and name included or not:
/// `func (s *Server) Run(ctx context.Context) (int, error)` -> `(int, error)`.
fn go_results(sig: &str) -> Option<&str> {
    let sig = trim_declaration_tail(sig);
    let mut rest = sig.strip_prefix("func")?.trim_start();

    if rest.starts_with('(') {
        let end = group_end(rest, 0)?;
        let after = rest[end..].trim_start();
        let ident_len = after
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let is_method = ident_len > 0
            && after[ident_len..]
                .trim_start()
                .starts_with(|c: char| c == '(' || c == '[');
        if !is_method {
            // Literal func type: the first group was the parameter list.
            return Some(after);
        }
        rest = after;
    }

    let name_len = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    rest = rest[name_len..].trim_start();
    if rest.starts_with('[') {
        let end = group_end(rest, 0)?;
        rest = rest[end..].trim_start();
    }
    if rest.starts_with('(') {
        let end = group_end(rest, 0)?;
        return Some(rest[end..].trim());
    }
    None
}

const GO_TYPE_KEYWORDS: &[&str] = &["chan", "func", "map", "struct", "interface"];

/// `err error` -> `error`, `events chan Event` -> `chan Event`; unnamed types pass through.
pub(crate) fn strip_go_field_name(part: &str) -> &str {
    let Some((first, rest)) = part.split_once(char::is_whitespace) else {
        return part;
    };
    let plain_ident = first.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !GO_TYPE_KEYWORDS.contains(&first);
    if plain_ident && !rest.trim().is_empty() {
        rest.trim()
    } else {
        part
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

const CSHARP_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "async", "virtual", "override",
    "abstract", "sealed", "readonly", "extern", "unsafe", "new", "partial", "const", "volatile",
    "required", "ref",
];

pub struct CSharpProfile;

impl LanguageProfile for CSharpProfile {
    fn name(&self) -> &'static str {
        "csharp"
    }

    fn filetypes(&self) -> &'static [&'static str] {
        &["cs", "csharp"]
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cs", "csx"]
    }

    fn artifact_suffixes(&self) -> &'static [&'static str] {
        &[".cs"]
    }

    fn rules(&self) -> &InferenceRules {
        static RULES: OnceLock<InferenceRules> = OnceLock::new();
        RULES.get_or_init(|| InferenceRules {
            async_wrappers: Some(AsyncWrappers {
                names: &["Task", "ValueTask", "IAsyncEnumerable"],
                open: '<',
                close: '>',
            }),
            static_marker: static_regex(),
            generic_marker: Regex::new(r"[A-Za-z_]\w*\s*<[^<>()]*>\s*\(").ok(),
            ..InferenceRules::default()
        })
    }

    fn type_token<'a>(&self, signature: &'a str) -> &'a str {
        leading_type(signature, CSHARP_MODIFIERS)
    }

    fn declaration_scan_lines(&self) -> usize {
        50
    }

    fn declaration_patterns(&self) -> &[Regex] {
        static RE: OnceLock<Vec<Regex>> = OnceLock::new();
        RE.get_or_init(|| {
            compile(&[
                // File-scoped: namespace Foo.Bar;
                r"^\s*namespace\s+([A-Za-z_][\w.]*)\s*;",
                // Block-scoped: namespace Foo.Bar {  /  namespace Foo.Bar
                r"^\s*namespace\s+([A-Za-z_][\w.]*)\s*(?:\{.*)?$",
            ])
        })
    }

    #[cfg(feature = "lang-csharp")]
    fn syntax_language(&self, _path: &Path) -> Option<Language> {
        Some(tree_sitter_c_sharp::LANGUAGE.into())
    }

    fn outline_kind(&self, node: Node) -> Option<SymbolKind> {
        Some(match node.kind() {
            "namespace_declaration" | "file_scoped_namespace_declaration" => SymbolKind::Namespace,
            "class_declaration" | "record_declaration" => SymbolKind::Class,
            "struct_declaration" | "record_struct_declaration" => SymbolKind::Struct,
            "interface_declaration" => SymbolKind::Interface,
            "enum_declaration" => SymbolKind::Enum,
            "method_declaration" => SymbolKind::Method,
            "constructor_declaration" => SymbolKind::Constructor,
            "property_declaration" => SymbolKind::Property,
            _ => return None,
        })
    }

    fn declaration_name(&self, node: Node, source: &[u8]) -> Option<String> {
        match node.kind() {
            "namespace_declaration" | "file_scoped_namespace_declaration" => node
                .child_by_field_name("name")
                .map(|n| node_text(source, n).trim().to_string()),
            _ => None,
        }
    }
}

pub struct GoProfile;

impl LanguageProfile for GoProfile {
    fn name(&self) -> &'static str {
        "go"
    }

    fn filetypes(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn artifact_suffixes(&self) -> &'static [&'static str] {
        &[".go"]
    }

    fn rules(&self) -> &InferenceRules {
        static RULES: OnceLock<InferenceRules> = OnceLock::new();
        RULES.get_or_init(|| InferenceRules {
            structural: Some(StructuralRules {
                error_type: "error",
                channel_keyword: "chan",
            }),
            visibility_by_case: true,
            pointer_receiver: Regex::new(r"^func\s*\(\s*(?:[A-Za-z_]\w*\s+)?\*").ok(),
            generic_marker: Regex::new(r"^func\s*(?:\([^)]*\)\s*)?[A-Za-z_]\w*\s*\[").ok(),
            concurrency_entry: Some(ConcurrencyNames {
                prefixes: &["run", "start", "worker", "process", "handle"],
                suffixes: &["async", "background"],
            }),
            ..InferenceRules::default()
        })
    }

    fn type_token<'a>(&self, signature: &'a str) -> &'a str {
        match go_results(signature) {
            Some(results) => results,
            None => strip_go_field_name(trim_declaration_tail(signature)),
        }
    }

    fn declaration_scan_lines(&self) -> usize {
        10
    }

    fn declaration_patterns(&self) -> &[Regex] {
        static RE: OnceLock<Vec<Regex>> = OnceLock::new();
        RE.get_or_init(|| compile(&[r"^\s*package\s+([A-Za-z_]\w*)"]))
    }

    #[cfg(feature = "lang-go")]
    fn syntax_language(&self, _path: &Path) -> Option<Language> {
        Some(tree_sitter_go::LANGUAGE.into())
    }

    fn outline_kind(&self, node: Node) -> Option<SymbolKind> {
        Some(match node.kind() {
            "function_declaration" => SymbolKind::Function,
            "method_declaration" => SymbolKind::Method,
            "type_spec" => match node.child_by_field_name("type").map(|t| t.kind()) {
                Some("struct_type") => SymbolKind::Struct,
                Some("interface_type") => SymbolKind::Interface,
                _ => SymbolKind::Class,
            },
            "field_declaration" => SymbolKind::Field,
            "method_elem" | "method_spec" => SymbolKind::Method,
            _ => return None,
        })
    }

    fn declaration_name(&self, node: Node, source: &[u8]) -> Option<String> {
        if node.kind() != "package_clause" {
            return None;
        }
        node.named_child(0)
            .map(|n| node_text(source, n).trim().to_string())
    }
}

const JAVA_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "static", "final", "abstract", "synchronized", "native",
    "default", "transient", "volatile", "strictfp",
];

pub struct JavaProfile;

impl LanguageProfile for JavaProfile {
    fn name(&self) -> &'static str {
        "java"
    }

    fn filetypes(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn artifact_suffixes(&self) -> &'static [&'static str] {
        &[".java"]
    }

    fn rules(&self) -> &InferenceRules {
        static RULES: OnceLock<InferenceRules> = OnceLock::new();
        RULES.get_or_init(|| InferenceRules {
            async_wrappers: Some(AsyncWrappers {
                names: &["CompletableFuture", "Future", "CompletionStage"],
                open: '<',
                close: '>',
            }),
            static_marker: static_regex(),
            generic_marker: Regex::new(r"(?:^|\s)<[^<>()]+>\s").ok(),
            ..InferenceRules::default()
        })
    }

    fn type_token<'a>(&self, signature: &'a str) -> &'a str {
        leading_type(signature, JAVA_MODIFIERS)
    }

    fn declaration_scan_lines(&self) -> usize {
        20
    }

    fn declaration_patterns(&self) -> &[Regex] {
        static RE: OnceLock<Vec<Regex>> = OnceLock::new();
        RE.get_or_init(|| compile(&[r"^\s*package\s+([A-Za-z_][\w.]*)\s*;"]))
    }

    #[cfg(feature = "lang-java")]
    fn syntax_language(&self, _path: &Path) -> Option<Language> {
        Some(tree_sitter_java::LANGUAGE.into())
    }

    fn outline_kind(&self, node: Node) -> Option<SymbolKind> {
        Some(match node.kind() {
            "class_declaration" | "record_declaration" => SymbolKind::Class,
            "interface_declaration" | "annotation_type_declaration" => SymbolKind::Interface,
            "enum_declaration" => SymbolKind::Enum,
            "method_declaration" => SymbolKind::Method,
            "constructor_declaration" => SymbolKind::Constructor,
            _ => return None,
        })
    }

    fn declaration_name(&self, node: Node, source: &[u8]) -> Option<String> {
        if node.kind() != "package_declaration" {
            return None;
        }
        node.named_child(0)
            .map(|n| node_text(source, n).trim().to_string())
    }
}

pub struct TypeScriptProfile;

impl LanguageProfile for TypeScriptProfile {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn filetypes(&self) -> &'static [&'static str] {
        &["typescript", "typescriptreact", "javascript", "javascriptreact"]
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"]
    }

    fn handles_path(&self, path: &Path) -> bool {
        let ext = path_ext_lower(path);
        self.extensions().contains(&ext.as_str())
            || path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.to_lowercase().ends_with(".d.ts"))
                .unwrap_or(false)
    }

    fn artifact_suffixes(&self) -> &'static [&'static str] {
        &[".d.ts", ".ts", ".tsx", ".js", ".jsx"]
    }

    fn rules(&self) -> &InferenceRules {
        static RULES: OnceLock<InferenceRules> = OnceLock::new();
        RULES.get_or_init(|| InferenceRules {
            async_wrappers: Some(AsyncWrappers {
                names: &["Promise", "PromiseLike"],
                open: '<',
                close: '>',
            }),
            static_marker: static_regex(),
            generic_marker: Regex::new(r"[A-Za-z_$][\w$]*\s*<[^<>()]*>\s*\(").ok(),
            ..InferenceRules::default()
        })
    }

    fn type_token<'a>(&self, signature: &'a str) -> &'a str {
        trailing_type(signature, &[":", "=>"])
    }

    fn declaration_scan_lines(&self) -> usize {
        50
    }

    fn declaration_patterns(&self) -> &[Regex] {
        static RE: OnceLock<Vec<Regex>> = OnceLock::new();
        RE.get_or_init(|| {
            compile(&[
                r"^\s*(?:export\s+)?(?:declare\s+)?(?:namespace|module)\s+([A-Za-z_$][\w$.]*)\s*\{?",
            ])
        })
    }

    fn syntax_language(&self, path: &Path) -> Option<Language> {
        let ext = path_ext_lower(path);
        if ext == "tsx" || ext == "jsx" {
            Some(tree_sitter_typescript::LANGUAGE_TSX.into())
        } else {
            Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
        }
    }

    fn outline_kind(&self, node: Node) -> Option<SymbolKind> {
        Some(match node.kind() {
            "internal_module" | "module" => SymbolKind::Namespace,
            "class_declaration" | "abstract_class_declaration" => SymbolKind::Class,
            "interface_declaration" => SymbolKind::Interface,
            "enum_declaration" => SymbolKind::Enum,
            "function_declaration" | "generator_function_declaration" => SymbolKind::Function,
            "method_definition" | "method_signature" => SymbolKind::Method,
            "public_field_definition" | "property_signature" => SymbolKind::Property,
            _ => return None,
        })
    }

    fn declaration_name(&self, node: Node, source: &[u8]) -> Option<String> {
        match node.kind() {
            "internal_module" | "module" => node
                .child_by_field_name("name")
                .map(|n| node_text(source, n).trim().to_string()),
            "expression_statement" | "ambient_declaration" | "export_statement" => {
                let inner = node.named_child(0)?;
                self.declaration_name(inner, source)
            }
            _ => None,
        }
    }
}

pub struct RustProfile;

impl LanguageProfile for RustProfile {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn filetypes(&self) -> &'static [&'static str] {
        &["rust"]
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn artifact_suffixes(&self) -> &'static [&'static str] {
        &[".rs"]
    }

    fn rules(&self) -> &InferenceRules {
        static RULES: OnceLock<InferenceRules> = OnceLock::new();
        RULES.get_or_init(|| InferenceRules {
            generic_marker: Regex::new(r"\bfn\s+[A-Za-z_]\w*\s*<").ok(),
            ..InferenceRules::default()
        })
    }

    fn type_token<'a>(&self, signature: &'a str) -> &'a str {
        static FN_KEYWORD: OnceLock<Option<Regex>> = OnceLock::new();
        let is_fn = FN_KEYWORD
            .get_or_init(|| Regex::new(r"\bfn\b").ok())
            .as_ref()
            .map(|re| re.is_match(signature))
            .unwrap_or(false);
        if is_fn {
            let token = trailing_type(signature, &["->"]);
            // A function without `->` returns unit.
            return if token.is_empty() { "()" } else { token };
        }
        let sig = trim_declaration_tail(signature);
        annotated_type(sig).unwrap_or(sig)
    }

    fn syntax_language(&self, _path: &Path) -> Option<Language> {
        Some(tree_sitter_rust::LANGUAGE.into())
    }

    fn outline_kind(&self, node: Node) -> Option<SymbolKind> {
        Some(match node.kind() {
            "mod_item" => SymbolKind::Namespace,
            "struct_item" => SymbolKind::Struct,
            "enum_item" => SymbolKind::Enum,
            "trait_item" => SymbolKind::Interface,
            "impl_item" => SymbolKind::Object,
            "function_item" | "function_signature_item" => SymbolKind::Function,
            "const_item" | "static_item" => SymbolKind::Constant,
            _ => return None,
        })
    }
}

pub struct PythonProfile;

impl LanguageProfile for PythonProfile {
    fn name(&self) -> &'static str {
        "python"
    }

    fn filetypes(&self) -> &'static [&'static str] {
        &["python"]
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyi", "pyw"]
    }

    fn artifact_suffixes(&self) -> &'static [&'static str] {
        &[".py"]
    }

    fn rules(&self) -> &InferenceRules {
        static RULES: OnceLock<InferenceRules> = OnceLock::new();
        RULES.get_or_init(|| InferenceRules {
            async_wrappers: Some(AsyncWrappers {
                names: &["Awaitable", "Coroutine"],
                open: '[',
                close: ']',
            }),
            static_marker: Regex::new(r"@staticmethod").ok(),
            ..InferenceRules::default()
        })
    }

    fn type_token<'a>(&self, signature: &'a str) -> &'a str {
        if signature.contains("def ") {
            return trailing_type(signature, &["->"]);
        }
        let sig = trim_declaration_tail(signature);
        annotated_type(sig).unwrap_or(sig)
    }

    fn syntax_language(&self, _path: &Path) -> Option<Language> {
        Some(tree_sitter_python::LANGUAGE.into())
    }

    fn outline_kind(&self, node: Node) -> Option<SymbolKind> {
        Some(match node.kind() {
            "class_definition" => SymbolKind::Class,
            "function_definition" => SymbolKind::Function,
            _ => return None,
        })
    }
}

/// Used for files no registered profile claims: no cleanup, no rules.
pub struct PlainProfile;

impl LanguageProfile for PlainProfile {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn filetypes(&self) -> &'static [&'static str] {
        &[]
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[]
    }

    fn rules(&self) -> &InferenceRules {
        static RULES: OnceLock<InferenceRules> = OnceLock::new();
        RULES.get_or_init(InferenceRules::default)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct LanguageRegistry {
    profiles: Vec<Box<dyn LanguageProfile>>,
    by_tag: HashMap<String, usize>,
    plain: PlainProfile,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        let profiles: Vec<Box<dyn LanguageProfile>> = vec![
            Box::new(CSharpProfile),
            Box::new(GoProfile),
            Box::new(TypeScriptProfile),
            Box::new(RustProfile),
            Box::new(PythonProfile),
            Box::new(JavaProfile),
        ];

        let mut reg = Self {
            profiles,
            by_tag: HashMap::new(),
            plain: PlainProfile,
        };

        for (idx, p) in reg.profiles.iter().enumerate() {
            let tags = std::iter::once(p.name())
                .chain(p.filetypes().iter().copied())
                .chain(p.extensions().iter().copied());
            for tag in tags {
                reg.by_tag.entry(tag.to_string()).or_insert(idx);
            }
        }

        reg
    }
}

impl LanguageRegistry {
    /// Resolve a filetype tag (`cs`, `typescriptreact`) or a file path to a profile.
    pub fn classify(&self, file_identifier: &str) -> Option<&dyn LanguageProfile> {
        let tag = file_identifier.trim().to_lowercase();
        if let Some(&idx) = self.by_tag.get(&tag) {
            return self.profiles.get(idx).map(|p| p.as_ref());
        }
        self.classify_path(Path::new(file_identifier))
    }

    pub fn classify_path(&self, path: &Path) -> Option<&dyn LanguageProfile> {
        let ext = path_ext_lower(path);
        if let Some(&idx) = self.by_tag.get(&ext) {
            if let Some(p) = self.profiles.get(idx) {
                if p.handles_path(path) {
                    return Some(p.as_ref());
                }
            }
        }

        // Filename-based claims (e.g. `.d.ts`).
        self.profiles
            .iter()
            .find(|p| p.handles_path(path))
            .map(|p| p.as_ref())
    }

    /// Profile for a path, falling back to the rule-less plain profile.
    pub fn profile_for_path(&self, path: &Path) -> &dyn LanguageProfile {
        self.classify_path(path).unwrap_or(&self.plain)
    }

    pub fn plain(&self) -> &dyn LanguageProfile {
        &self.plain
    }
}

pub fn registry() -> &'static LanguageRegistry {
    static REG: OnceLock<LanguageRegistry> = OnceLock::new();
    REG.get_or_init(LanguageRegistry::default)
}

pub fn classify(file_identifier: &str) -> Option<&'static dyn LanguageProfile> {
    registry().classify(file_identifier)
}
