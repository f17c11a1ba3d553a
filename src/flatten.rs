use lsp_types::SymbolInformation;
use std::path::Path;

use crate::profile::LanguageProfile;
use crate::symbol::{HierarchicalSymbol, SymbolEntry};

/// Remove file-name artifacts (e.g. `.cs`) from a dotted container name,
/// both at the end and between segments: `File.cs.Namespace` -> `File.Namespace`.
pub fn clean_container_name(name: &str, artifacts: &[&str]) -> String {
    let mut out = name.to_string();
    for artifact in artifacts {
        let dotted = format!("{artifact}.");
        while let Some(idx) = out.find(&dotted) {
            out.replace_range(idx..idx + dotted.len(), ".");
        }
        while out.len() > artifact.len() && out.ends_with(artifact) {
            out.truncate(out.len() - artifact.len());
        }
    }
    out
}

fn join_qualified(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(p) if !p.is_empty() => format!("{p}.{name}"),
        _ => name.to_string(),
    }
}

/// Pre-order flatten of a provider tree into the canonical index.
pub fn flatten(tree: &[HierarchicalSymbol], profile: &dyn LanguageProfile) -> Vec<SymbolEntry> {
    flatten_from(tree, profile, None)
}

/// Same as [`flatten`], tagging every entry with the file it came from.
pub fn flatten_from(
    tree: &[HierarchicalSymbol],
    profile: &dyn LanguageProfile,
    source_file: Option<&Path>,
) -> Vec<SymbolEntry> {
    let mut out = Vec::new();
    flatten_into(&mut out, tree, profile, source_file, None, 0);
    out
}

fn flatten_into(
    out: &mut Vec<SymbolEntry>,
    nodes: &[HierarchicalSymbol],
    profile: &dyn LanguageProfile,
    source_file: Option<&Path>,
    parent: Option<&str>,
    depth: usize,
) {
    for node in nodes {
        let simple_name = clean_container_name(&node.name, profile.artifact_suffixes());
        let qualified_name = join_qualified(parent, &simple_name);

        out.push(SymbolEntry {
            qualified_name: qualified_name.clone(),
            simple_name,
            kind: node.kind,
            signature: node.detail.clone(),
            range: node.range,
            selection_range: node.selection_range,
            source_file: source_file.map(Path::to_path_buf),
            depth,
        });

        // Children right after their parent so sibling subtrees never interleave.
        flatten_into(
            out,
            &node.children,
            profile,
            source_file,
            Some(&qualified_name),
            depth + 1,
        );
    }
}

/// Flat workspace symbol -> index entry; the container name becomes the parent path.
pub fn entry_from_workspace_symbol(sym: SymbolInformation, profile: &dyn LanguageProfile) -> SymbolEntry {
    let artifacts = profile.artifact_suffixes();
    let simple_name = clean_container_name(&sym.name, artifacts);
    let container = sym
        .container_name
        .as_deref()
        .map(|c| clean_container_name(c, artifacts));
    let qualified_name = join_qualified(container.as_deref(), &simple_name);
    let depth = container
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(|c| c.split('.').count())
        .unwrap_or(0);
    let source_file = sym.location.uri.to_file_path().ok();

    SymbolEntry {
        qualified_name,
        simple_name,
        kind: sym.kind.into(),
        signature: None,
        range: Some(sym.location.range),
        selection_range: None,
        source_file,
        depth,
    }
}
