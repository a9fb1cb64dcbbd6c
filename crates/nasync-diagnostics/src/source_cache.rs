//! Cell source cache for diagnostic rendering.

use crate::span::{FileId, Location, Span};
use std::collections::HashMap;

/// A registered cell with precomputed line starts.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    /// Display name, e.g. `cell[3]` or a file path
    pub name: String,
    pub source: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    fn new(id: FileId, name: String, source: String) -> Self {
        let line_starts = compute_line_starts(&source);
        Self {
            id,
            name,
            source,
            line_starts,
        }
    }

    /// Line and column (both 1-indexed) of a byte offset.
    pub fn line_column(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.source.len() as u32);

        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };

        let line_start = self.line_starts[line_idx];
        ((line_idx + 1) as u32, (offset - line_start + 1).max(1))
    }

    /// Text of a 1-indexed line without its line terminator.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        if line == 0 {
            return None;
        }

        let idx = (line - 1) as usize;
        let start = *self.line_starts.get(idx)? as usize;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&e| e as usize)
            .unwrap_or(self.source.len());

        Some(self.source[start..end].trim_end_matches('\n').trim_end_matches('\r'))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

fn compute_line_starts(source: &str) -> Vec<u32> {
    let mut starts = vec![0];
    for (i, c) in source.char_indices() {
        if c == '\n' {
            starts.push((i + 1) as u32);
        }
    }
    starts
}

/// All cells seen during one session.
///
/// Unlike a file cache, re-running a cell with the same name registers a new
/// entry: the text of a cell changes between runs.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: HashMap<FileId, SourceFile>,
    next_id: u32,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cell's source, returning its id.
    pub fn add_cell(&mut self, name: impl Into<String>, source: String) -> FileId {
        let id = FileId(self.next_id);
        self.next_id += 1;
        self.files.insert(id, SourceFile::new(id, name.into(), source));
        id
    }

    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(&id)
    }

    pub fn location(&self, span: Span) -> Option<Location> {
        if span.is_dummy() {
            return None;
        }

        let file = self.files.get(&span.file_id)?;
        let (line, column) = file.line_column(span.start);

        Some(Location {
            file: file.name.clone(),
            line,
            column,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
