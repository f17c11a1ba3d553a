//! Display metadata inferred from symbol kinds and free-text signatures.
//!
//! Everything here is text heuristics over whatever detail string the provider
//! sent. Nothing is type-checked; unknown shapes degrade to the object icon.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::profile::{strip_go_field_name, AsyncWrappers, InferenceRules, LanguageProfile, StructuralRules};
use crate::symbol::{SymbolEntry, SymbolKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IconKey {
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
    Integer,
    Float,
    String,
    Boolean,
    Void,
    Array,
    Map,
    Any,
    Error,
    Channel,
    /// Deferred result whose value type is unknown.
    Pending,
    Object,
}

impl IconKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            IconKey::Namespace => "namespace",
            IconKey::Class => "class",
            IconKey::Struct => "struct",
            IconKey::Interface => "interface",
            IconKey::Enum => "enum",
            IconKey::EnumMember => "enum_member",
            IconKey::Method => "method",
            IconKey::Function => "function",
            IconKey::Constructor => "constructor",
            IconKey::Property => "property",
            IconKey::Field => "field",
            IconKey::Variable => "variable",
            IconKey::Constant => "constant",
            IconKey::Event => "event",
            IconKey::Operator => "operator",
            IconKey::TypeParameter => "type_parameter",
            IconKey::Integer => "integer",
            IconKey::Float => "float",
            IconKey::String => "string",
            IconKey::Boolean => "boolean",
            IconKey::Void => "void",
            IconKey::Array => "array",
            IconKey::Map => "map",
            IconKey::Any => "any",
            IconKey::Error => "error",
            IconKey::Channel => "channel",
            IconKey::Pending => "pending",
            IconKey::Object => "object",
        }
    }
}

pub fn kind_icon(kind: SymbolKind) -> IconKey {
    match kind {
        SymbolKind::Namespace => IconKey::Namespace,
        SymbolKind::Class => IconKey::Class,
        SymbolKind::Struct => IconKey::Struct,
        SymbolKind::Interface => IconKey::Interface,
        SymbolKind::Enum => IconKey::Enum,
        SymbolKind::EnumMember => IconKey::EnumMember,
        SymbolKind::Method => IconKey::Method,
        SymbolKind::Function => IconKey::Function,
        SymbolKind::Constructor => IconKey::Constructor,
        SymbolKind::Property => IconKey::Property,
        SymbolKind::Field => IconKey::Field,
        SymbolKind::Variable => IconKey::Variable,
        SymbolKind::Constant => IconKey::Constant,
        SymbolKind::Event => IconKey::Event,
        SymbolKind::Operator => IconKey::Operator,
        SymbolKind::TypeParameter => IconKey::TypeParameter,
        SymbolKind::Object | SymbolKind::Unknown => IconKey::Object,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelDirection {
    SendOnly,
    ReceiveOnly,
    Bidirectional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Async,
    Static,
    Generic,
    Exported,
    Unexported,
    PointerReceiver,
    /// Name looks like a concurrency entry point. Approximate.
    Goroutine,
    Channel(ChannelDirection),
    ReturnsError,
}

impl Indicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Indicator::Async => "async",
            Indicator::Static => "static",
            Indicator::Generic => "generic",
            Indicator::Exported => "exported",
            Indicator::Unexported => "unexported",
            Indicator::PointerReceiver => "pointer_receiver",
            Indicator::Goroutine => "goroutine",
            Indicator::Channel(ChannelDirection::SendOnly) => "chan_send",
            Indicator::Channel(ChannelDirection::ReceiveOnly) => "chan_recv",
            Indicator::Channel(ChannelDirection::Bidirectional) => "chan_bidi",
            Indicator::ReturnsError => "returns_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayMetadata {
    pub icon: IconKey,
    pub indicators: Vec<Indicator>,
}

impl DisplayMetadata {
    pub fn has(&self, indicator: Indicator) -> bool {
        self.indicators.contains(&indicator)
    }
}

// ---------------------------------------------------------------------------
// Classification table
// ---------------------------------------------------------------------------

const INTEGER_TYPES: &[&str] = &[
    "int", "uint", "int8", "int16", "int32", "int64", "uint8", "uint16", "uint32", "uint64",
    "uintptr", "byte", "sbyte", "rune", "short", "ushort", "long", "ulong", "nint", "nuint",
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
    "integer", "bigint", "biginteger",
];

const FLOAT_TYPES: &[&str] = &[
    "float", "double", "decimal", "single", "float32", "float64", "f32", "f64", "number",
    "complex64", "complex128",
];

const STRING_TYPES: &[&str] = &["string", "str", "char", "charsequence"];

const BOOLEAN_TYPES: &[&str] = &["bool", "boolean"];

const VOID_TYPES: &[&str] = &["void", "null", "none", "nil", "undefined", "()", "unit", "never"];

const ANY_TYPES: &[&str] = &["any", "object", "dynamic", "unknown", "interface{}", "anyobject"];

const MAP_PREFIXES: &[&str] = &[
    "map[", "map<", "dictionary<", "idictionary<", "ireadonlydictionary<",
    "concurrentdictionary<", "sorteddictionary<", "hashmap<", "btreemap<", "record<",
    "dict[", "mapping[", "defaultdict[",
];

const ARRAY_PREFIXES: &[&str] = &[
    "list<", "ilist<", "ienumerable<", "icollection<", "ireadonlylist<", "ireadonlycollection<",
    "collection<", "array<", "readonlyarray<", "vec<", "vecdeque<", "hashset<", "set<", "iset<",
    "sortedset<", "queue<", "stack<", "linkedlist<", "list[", "tuple[", "set[", "sequence[",
    "iterable[",
];

const REFERENCE_MODIFIERS: &[&str] = &["ref", "out", "in", "mut", "readonly", "const", "params"];

/// Case-fold, drop whitespace, reference sigils/modifiers and namespace qualifiers.
fn normalize_type(token: &str) -> String {
    let mut words: Vec<&str> = token.split_whitespace().collect();
    while words.len() > 1 && REFERENCE_MODIFIERS.contains(&words[0]) {
        words.remove(0);
    }
    let joined: String = words.concat().to_lowercase();
    let mut t = joined
        .trim_start_matches(|c| matches!(c, '*' | '&' | '^' | '%'))
        .trim_end_matches(|c| matches!(c, '?' | '!'))
        .to_string();
    if let Some(stripped) = t.strip_prefix("mut") {
        // `&mut T` after sigil removal
        if stripped.starts_with(|c: char| c.is_alphabetic() || c == '[') && joined.starts_with('&') {
            t = stripped.to_string();
        }
    }

    // System.Collections.Generic.List<int> -> list<int>
    let head_end = t.find(|c| c == '<' || c == '[').unwrap_or(t.len());
    if let Some(dot) = t[..head_end].rfind('.') {
        t = t[dot + 1..].to_string();
    }
    t
}

/// Map a type token through the primitive/collection/map table.
///
/// `None` only when nothing is left to classify; any other unknown type is an object.
pub fn classify_type(token: &str) -> Option<IconKey> {
    let t = normalize_type(token);
    if t.is_empty() {
        return None;
    }
    let t = t.as_str();

    let icon = if VOID_TYPES.contains(&t) {
        IconKey::Void
    } else if INTEGER_TYPES.contains(&t) {
        IconKey::Integer
    } else if FLOAT_TYPES.contains(&t) {
        IconKey::Float
    } else if STRING_TYPES.contains(&t) {
        IconKey::String
    } else if BOOLEAN_TYPES.contains(&t) {
        IconKey::Boolean
    } else if ANY_TYPES.contains(&t) {
        IconKey::Any
    } else if t.ends_with("[]") {
        IconKey::Array
    } else if t == "dict" || t == "map" || MAP_PREFIXES.iter().any(|p| t.starts_with(p)) {
        IconKey::Map
    } else if t == "list" || t == "array" || t == "tuple" || t.starts_with('[')
        || ARRAY_PREFIXES.iter().any(|p| t.starts_with(p))
    {
        IconKey::Array
    } else if t.ends_with("exception") || t.ends_with("error") {
        IconKey::Error
    } else {
        IconKey::Object
    };
    Some(icon)
}

// ---------------------------------------------------------------------------
// Signature scanners
// ---------------------------------------------------------------------------

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Bracket-balanced content starting right after `open` at byte `start`.
fn balanced_content(text: &str, start: usize, open: char, close: char) -> Option<&str> {
    let mut depth = 1i32;
    for (i, c) in text[start..].char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..start + i]);
            }
        }
    }
    None
}

#[derive(Debug, PartialEq)]
struct AsyncWrapperMatch<'a> {
    /// Type argument, `None` for a bare wrapper. Unbalanced brackets read as empty.
    inner: Option<&'a str>,
}

fn find_async_wrapper<'a>(signature: &'a str, wrappers: &AsyncWrappers) -> Option<AsyncWrapperMatch<'a>> {
    let mut best: Option<(usize, AsyncWrapperMatch<'a>)> = None;

    for name in wrappers.names {
        for (pos, _) in signature.match_indices(name) {
            let before_ok = signature[..pos]
                .chars()
                .next_back()
                .map(|c| !is_ident_char(c) && c != '.')
                .unwrap_or(true)
                || signature[..pos].ends_with("Tasks.");
            let after = &signature[pos + name.len()..];
            let after_ok = after.chars().next().map(|c| !is_ident_char(c)).unwrap_or(true);
            if !(before_ok && after_ok) {
                continue;
            }

            let trimmed = after.trim_start();
            let inner = if trimmed.starts_with(wrappers.open) {
                let offset = signature.len() - trimmed.len() + wrappers.open.len_utf8();
                Some(
                    balanced_content(signature, offset, wrappers.open, wrappers.close)
                        .map(str::trim)
                        .unwrap_or(""),
                )
            } else {
                None
            };

            if best.as_ref().map(|(p, _)| pos < *p).unwrap_or(true) {
                best = Some((pos, AsyncWrapperMatch { inner }));
            }
            break;
        }
    }

    best.map(|(_, m)| m)
}

/// True when `token` itself is a wrapper application, e.g. `Task<int>` or
/// `System.Threading.Tasks.Task<int>`, as opposed to `List<Task<int>>`.
fn starts_with_wrapper(token: &str, wrappers: &AsyncWrappers) -> bool {
    let head_end = token
        .find(|c: char| c == wrappers.open || c.is_whitespace())
        .unwrap_or(token.len());
    let head = &token[..head_end];
    let last = head.rsplit('.').next().unwrap_or(head);
    wrappers.names.contains(&last)
}

/// Peel nested wrappers: `Task<Task<int>>` -> `int`. `None` when the innermost is bare.
fn innermost_awaited<'a>(mut inner: &'a str, wrappers: &AsyncWrappers) -> Option<&'a str> {
    while starts_with_wrapper(inner, wrappers) {
        inner = find_async_wrapper(inner, wrappers)?.inner?;
    }
    Some(inner)
}

fn async_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:async|await)\b").expect("valid async marker regex"))
}

fn aggregate_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:type|interface|struct|class)\b").expect("valid aggregate regex"))
}

/// Split a result list into types: `(n int, err error)` -> `["int", "error"]`.
fn result_types(token: &str) -> Vec<&str> {
    let token = token.trim();
    let inner = match token.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => inner,
        None => return if token.is_empty() { vec![] } else { vec![token] },
    };

    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(inner[start..].trim());

    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(strip_go_field_name)
        .collect()
}

/// Direction of the first channel type in `text`, if any.
pub fn channel_direction(text: &str, keyword: &str) -> Option<ChannelDirection> {
    for (pos, _) in text.match_indices(keyword) {
        let before = &text[..pos];
        let after = &text[pos + keyword.len()..];
        let bounded = before.chars().next_back().map(|c| !is_ident_char(c)).unwrap_or(true)
            && after.chars().next().map(|c| !is_ident_char(c)).unwrap_or(true);
        if !bounded {
            continue;
        }
        return Some(if before.trim_end().ends_with("<-") {
            ChannelDirection::ReceiveOnly
        } else if after.trim_start().starts_with("<-") {
            ChannelDirection::SendOnly
        } else {
            ChannelDirection::Bidirectional
        });
    }
    None
}

/// Exported iff the first character is an uppercase letter.
pub fn is_exported_name(name: &str) -> bool {
    name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

/// Result-list and channel facts for languages with structural rules.
#[derive(Debug, Default)]
struct StructuralShape<'a> {
    results: Vec<&'a str>,
    channel: Option<ChannelDirection>,
    returns_error: bool,
}

fn structural_shape<'a>(type_token: &'a str, rules: &StructuralRules) -> StructuralShape<'a> {
    let results = result_types(type_token);
    let returns_error = results.len() >= 2 && results.last() == Some(&rules.error_type);
    let channel = if results.len() <= 1 {
        channel_direction(type_token, rules.channel_keyword)
    } else {
        None
    };
    StructuralShape {
        results,
        channel,
        returns_error,
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Icon and badges for one entry. Recomputed per render, never stored.
pub fn infer_display(entry: &SymbolEntry, profile: &dyn LanguageProfile) -> DisplayMetadata {
    let rules = profile.rules();
    let signature = entry.signature.as_deref().map(str::trim).unwrap_or("");
    let value_kind = entry.kind.carries_value_type() && !signature.is_empty();
    let type_token = if value_kind { profile.type_token(signature) } else { "" };

    let wrapper = match (&rules.async_wrappers, value_kind) {
        (Some(w), true) => find_async_wrapper(signature, w),
        _ => None,
    };
    let shape = match (&rules.structural, value_kind) {
        (Some(s), true) => Some(structural_shape(type_token, s)),
        _ => None,
    };

    let icon = infer_icon(entry, rules, signature, type_token, wrapper.as_ref(), shape.as_ref());
    let indicators = infer_indicators(entry, rules, signature, wrapper.is_some(), shape.as_ref());

    DisplayMetadata { icon, indicators }
}

fn infer_icon(
    entry: &SymbolEntry,
    rules: &InferenceRules,
    signature: &str,
    type_token: &str,
    wrapper: Option<&AsyncWrapperMatch<'_>>,
    shape: Option<&StructuralShape<'_>>,
) -> IconKey {
    if let (Some(w), Some(wrappers)) = (wrapper, rules.async_wrappers.as_ref()) {
        return w
            .inner
            .and_then(|inner| innermost_awaited(inner, wrappers))
            .and_then(classify_type)
            .unwrap_or(IconKey::Pending);
    }

    if matches!(entry.kind, SymbolKind::Object | SymbolKind::Unknown)
        && aggregate_keyword_regex().is_match(signature)
    {
        return IconKey::Class;
    }

    if rules.structural.is_some() {
        match entry.kind {
            SymbolKind::Interface => return IconKey::Interface,
            SymbolKind::Struct => return IconKey::Struct,
            _ => {}
        }
        if let Some(shape) = shape {
            if shape.returns_error {
                return shape
                    .results
                    .first()
                    .and_then(|first| classify_type(first))
                    .unwrap_or(IconKey::Object);
            }
            if shape.channel.is_some() {
                return IconKey::Channel;
            }
        }
    }

    if !type_token.is_empty() {
        if let Some(icon) = classify_type(type_token) {
            return icon;
        }
    }

    kind_icon(entry.kind)
}

fn infer_indicators(
    entry: &SymbolEntry,
    rules: &InferenceRules,
    signature: &str,
    wrapped: bool,
    shape: Option<&StructuralShape<'_>>,
) -> Vec<Indicator> {
    let mut out = Vec::new();

    if wrapped || async_marker_regex().is_match(signature) {
        out.push(Indicator::Async);
    }
    if rules.static_marker.as_ref().map(|re| re.is_match(signature)).unwrap_or(false) {
        out.push(Indicator::Static);
    }
    if rules.generic_marker.as_ref().map(|re| re.is_match(signature)).unwrap_or(false) {
        out.push(Indicator::Generic);
    }
    if rules.visibility_by_case {
        out.push(if is_exported_name(&entry.simple_name) {
            Indicator::Exported
        } else {
            Indicator::Unexported
        });
    }
    if rules.pointer_receiver.as_ref().map(|re| re.is_match(signature)).unwrap_or(false) {
        out.push(Indicator::PointerReceiver);
    }
    if entry.kind.is_callable()
        && rules
            .concurrency_entry
            .as_ref()
            .map(|names| names.matches(&entry.simple_name))
            .unwrap_or(false)
    {
        out.push(Indicator::Goroutine);
    }
    if let Some(shape) = shape {
        if let Some(dir) = shape.channel {
            out.push(Indicator::Channel(dir));
        }
        if shape.returns_error {
            out.push(Indicator::ReturnsError);
        }
    }

    out
}
