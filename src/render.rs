use serde::Serialize;
use std::path::Path;

use crate::config::DisplayConfig;
use crate::infer::{infer_display, IconKey};
use crate::navigator::{Mode, NavigationState};
use crate::profile::registry;
use crate::symbol::{BufferId, SymbolEntry};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRow {
    pub icon: IconKey,
    /// Display glyph for `icon` after config mapping.
    pub glyph: String,
    pub indicators: Vec<&'static str>,
    pub formatted_path: String,
    pub depth: usize,
}

/// Everything the presentation sink needs to draw the listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    pub rows: Vec<RenderRow>,
    /// 1-based highlighted row, `None` when the listing is empty.
    pub cursor: Option<usize>,
    pub query: String,
    pub filtering: bool,
}

/// Qualified name, plus the file name for entries that live in another file.
pub fn format_entry(entry: &SymbolEntry, buffer: &Path) -> String {
    match entry.source_file.as_deref() {
        Some(file) if file != buffer => {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_else(|| file.to_string_lossy());
            format!("{} ({name})", entry.qualified_name)
        }
        _ => entry.qualified_name.clone(),
    }
}

pub fn render_row(entry: &SymbolEntry, buffer: &BufferId, display: &DisplayConfig) -> RenderRow {
    let file = entry.source_file.as_deref().unwrap_or(buffer.path());
    let profile = registry().profile_for_path(file);
    let meta = infer_display(entry, profile);

    let indicators = if display.show_indicators {
        meta.indicators.iter().map(|i| i.as_str()).collect()
    } else {
        Vec::new()
    };

    RenderRow {
        icon: meta.icon,
        glyph: display.glyph(meta.icon.as_str()).to_string(),
        indicators,
        formatted_path: format_entry(entry, buffer.path()),
        depth: entry.depth,
    }
}

/// Rows for the active index; display metadata is recomputed on every call.
pub fn render_frame(nav: &NavigationState, buffer: &BufferId, display: &DisplayConfig) -> RenderFrame {
    RenderFrame {
        rows: nav
            .active_index()
            .iter()
            .map(|e| render_row(e, buffer, display))
            .collect(),
        cursor: nav.cursor(),
        query: nav.query().to_string(),
        filtering: nav.mode() == Mode::Filter,
    }
}
