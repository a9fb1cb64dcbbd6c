//! Text insertions applied to the wrapped cell.
//!
//! The rewrite never reprints the tree. It only inserts text at byte offsets
//! of the parsed source, so everything the author wrote (line breaks,
//! comments, formatting) survives unchanged.

use std::cmp::Reverse;

#[derive(Debug, Clone)]
struct Insertion {
    at: u32,
    text: String,
    closing: bool,
    /// Pre-order visit number of the node that registered this insertion
    seq: u32,
}

#[derive(Debug, Default)]
pub(crate) struct Edits {
    items: Vec<Insertion>,
    next_seq: u32,
    /// Offsets where an expression statement inside a statement list begins
    statement_starts: Vec<u32>,
}

impl Edits {
    /// Surround `[lo, hi)` with `open` and `close`.
    ///
    /// Nodes must be wrapped in pre-order (parents before children) for
    /// nesting at shared offsets to come out right.
    pub fn wrap(&mut self, lo: u32, hi: u32, open: &str, close: &str) {
        let seq = self.bump();
        if !open.is_empty() {
            self.items.push(Insertion {
                at: lo,
                text: open.to_string(),
                closing: false,
                seq,
            });
        }
        if !close.is_empty() {
            self.items.push(Insertion {
                at: hi,
                text: close.to_string(),
                closing: true,
                seq,
            });
        }
    }

    /// Insert `text` in front of whatever starts at `at`.
    pub fn insert(&mut self, at: u32, text: impl Into<String>) {
        let seq = self.bump();
        self.items.push(Insertion {
            at,
            text: text.into(),
            closing: false,
            seq,
        });
    }

    pub fn statement_start(&mut self, at: u32) {
        self.statement_starts.push(at);
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn bump(&mut self) -> u32 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Produce the edited text.
    ///
    /// At a shared offset, closings come before openings; closings run
    /// innermost first and openings outermost first.
    pub fn apply(mut self, src: &str) -> String {
        self.items.sort_by_key(|item| {
            (
                item.at,
                !item.closing,
                if item.closing {
                    Reverse(item.seq)
                } else {
                    Reverse(u32::MAX - item.seq)
                },
            )
        });

        let extra: usize = self.items.iter().map(|i| i.text.len() + 1).sum();
        let mut out = String::with_capacity(src.len() + extra);
        let mut cursor = 0usize;
        let mut idx = 0usize;

        while idx < self.items.len() {
            let at = (self.items[idx].at as usize).min(src.len());
            out.push_str(&src[cursor..at]);
            cursor = at;

            let group_end = self.items[idx..]
                .iter()
                .position(|i| i.at as usize != at)
                .map(|n| idx + n)
                .unwrap_or(self.items.len());

            let first_open = self.items[idx..group_end].iter().find(|i| !i.closing);
            if let Some(open) = first_open {
                if open.text.starts_with('(')
                    && self.statement_starts.contains(&(at as u32))
                    && needs_leading_semicolon(src, at)
                {
                    out.push(';');
                }
            }

            for item in &self.items[idx..group_end] {
                out.push_str(&item.text);
            }
            idx = group_end;
        }

        out.push_str(&src[cursor..]);
        out
    }
}

/// A statement that now begins with `(` would continue the previous line
/// as a call unless the previous statement is already terminated.
fn needs_leading_semicolon(src: &str, at: usize) -> bool {
    !matches!(
        src[..at].trim_end().chars().last(),
        None | Some(';') | Some('{') | Some(':')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_wraps_share_offsets() {
        // foo() where both the call and the callee get awaited
        let src = "foo()";
        let mut edits = Edits::default();
        edits.wrap(0, 5, "(await ", ")");
        edits.wrap(0, 3, "(await ", ")");

        assert_eq!(edits.apply(src), "(await (await foo)())");
    }

    #[test]
    fn test_insert_orders_with_wraps() {
        let src = "x => x";
        let mut edits = Edits::default();
        edits.wrap(0, 6, "return {v: ", "}");
        edits.insert(0, "async ");

        assert_eq!(edits.apply(src), "return {v: async x => x}");
    }

    #[test]
    fn test_closings_before_openings() {
        let src = "ab";
        let mut edits = Edits::default();
        edits.wrap(1, 2, "[", "]");
        edits.wrap(0, 1, "<", ">");

        assert_eq!(edits.apply(src), "<a>[b]");
    }

    #[test]
    fn test_statement_start_semicolon() {
        let src = "let a = 1\na.b";
        let mut edits = Edits::default();
        edits.statement_start(10);
        edits.wrap(10, 11, "(await ", ")");

        assert_eq!(edits.apply(src), "let a = 1\n;(await a).b");
    }

    #[test]
    fn test_no_semicolon_after_terminated_statement() {
        let src = "let a = 1;\na.b";
        let mut edits = Edits::default();
        edits.statement_start(11);
        edits.wrap(11, 12, "(await ", ")");

        assert_eq!(edits.apply(src), "let a = 1;\n(await a).b");
    }

    #[test]
    fn test_empty_edits_keep_text() {
        let edits = Edits::default();
        assert!(edits.is_empty());
        assert_eq!(edits.apply("a\n b"), "a\n b");
    }
}
