//! Browse/filter state for one tracked buffer.
//!
//! Pure and synchronous: the session feeds it indexes and commands, and reads
//! back the active index and cursor. Every operation on an empty index is a no-op.

use serde::Serialize;

use crate::symbol::{BufferId, JumpTarget, Reference, SymbolEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Navigate,
    Filter,
}

/// Case-insensitive substring match against the qualified name.
pub fn filter_entries(entries: &[SymbolEntry], query: &str) -> Vec<SymbolEntry> {
    if query.is_empty() {
        return entries.to_vec();
    }
    let needle = query.to_lowercase();
    entries
        .iter()
        .filter(|e| e.qualified_name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// 1-based step with unconditional wraparound.
fn step(cursor: usize, len: usize, forward: bool) -> usize {
    match (forward, cursor) {
        (true, c) if c >= len => 1,
        (true, c) => c + 1,
        (false, c) if c <= 1 => len,
        (false, c) => c - 1,
    }
}

#[derive(Debug, Default)]
pub struct NavigationState {
    full: Vec<SymbolEntry>,
    filtered: Vec<SymbolEntry>,
    query: String,
    mode: Mode,
    /// 1-based into the active index; 0 while the active index is empty.
    cursor: usize,
    references: Vec<Reference>,
    reference_cursor: usize,
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn full_index(&self) -> &[SymbolEntry] {
        &self.full
    }

    /// Filtered index while a query is set, the full index otherwise.
    pub fn active_index(&self) -> &[SymbolEntry] {
        if self.query.is_empty() {
            &self.full
        } else {
            &self.filtered
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        (self.cursor > 0).then_some(self.cursor)
    }

    pub fn current(&self) -> Option<&SymbolEntry> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.active_index().get(i))
    }

    fn clamp_cursor(&mut self) {
        let len = self.active_index().len();
        self.cursor = if len == 0 { 0 } else { self.cursor.clamp(1, len) };
    }

    /// Put the cursor back on `selected` if it is still listed, else clamp.
    fn reconcile(&mut self, selected: Option<SymbolEntry>) {
        let found = selected.and_then(|sel| {
            self.active_index()
                .iter()
                .position(|e| e.same_symbol(&sel))
        });
        match found {
            Some(idx) => self.cursor = idx + 1,
            None => self.clamp_cursor(),
        }
    }

    fn refilter(&mut self) {
        self.filtered = filter_entries(&self.full, &self.query);
    }

    /// Swap in a freshly fetched index; the query survives.
    pub fn replace_index(&mut self, entries: Vec<SymbolEntry>) {
        let selected = self.current().cloned();
        self.full = entries;
        self.refilter();
        self.reconcile(selected);
    }

    pub fn begin_filter(&mut self) {
        let selected = self.current().cloned();
        self.mode = Mode::Filter;
        self.query.clear();
        self.refilter();
        self.reconcile(selected);
    }

    /// Append to the query. Ignored outside filter mode.
    pub fn push_char(&mut self, c: char) -> bool {
        if self.mode != Mode::Filter {
            return false;
        }
        self.query.push(c);
        self.refilter();
        self.clamp_cursor();
        true
    }

    pub fn push_str(&mut self, text: &str) -> bool {
        if self.mode != Mode::Filter || text.is_empty() {
            return false;
        }
        self.query.push_str(text);
        self.refilter();
        self.clamp_cursor();
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.mode != Mode::Filter || self.query.pop().is_none() {
            return false;
        }
        self.refilter();
        self.clamp_cursor();
        true
    }

    /// Leave filter mode keeping the query and the narrowed listing.
    pub fn accept(&mut self) {
        self.mode = Mode::Navigate;
    }

    pub fn dismiss(&mut self) {
        self.accept();
    }

    /// Leave filter mode and drop the query.
    pub fn cancel(&mut self) {
        self.clear_filter();
    }

    pub fn clear_filter(&mut self) {
        let selected = self.current().cloned();
        self.mode = Mode::Navigate;
        self.query.clear();
        self.refilter();
        self.reconcile(selected);
    }

    pub fn next(&mut self) -> Option<&SymbolEntry> {
        self.move_cursor(true)
    }

    pub fn prev(&mut self) -> Option<&SymbolEntry> {
        self.move_cursor(false)
    }

    fn move_cursor(&mut self, forward: bool) -> Option<&SymbolEntry> {
        let len = self.active_index().len();
        if len == 0 {
            return None;
        }
        self.cursor = step(self.cursor, len, forward);
        self.current()
    }

    /// Highlight `entry` if the active index lists it.
    pub fn focus(&mut self, entry: &SymbolEntry) -> bool {
        match self.active_index().iter().position(|e| e.same_symbol(entry)) {
            Some(idx) => {
                self.cursor = idx + 1;
                true
            }
            None => false,
        }
    }

    pub fn jump_target(&self, buffer: &BufferId) -> Option<JumpTarget> {
        self.current().and_then(|e| entry_jump_target(e, buffer))
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn set_references(&mut self, references: Vec<Reference>) {
        self.references = references;
        self.reference_cursor = 0;
    }

    pub fn next_reference(&mut self) -> Option<&Reference> {
        self.move_reference(true)
    }

    pub fn prev_reference(&mut self) -> Option<&Reference> {
        self.move_reference(false)
    }

    fn move_reference(&mut self, forward: bool) -> Option<&Reference> {
        let len = self.references.len();
        if len == 0 {
            return None;
        }
        self.reference_cursor = step(self.reference_cursor, len, forward);
        self.references.get(self.reference_cursor - 1)
    }
}

/// Name span first, declaration start otherwise; the entry's own file when it has one.
pub fn entry_jump_target(entry: &SymbolEntry, buffer: &BufferId) -> Option<JumpTarget> {
    let position = entry.jump_position()?;
    let file = entry
        .source_file
        .clone()
        .unwrap_or_else(|| buffer.path().to_path_buf());
    Some(JumpTarget::new(file, position))
}
