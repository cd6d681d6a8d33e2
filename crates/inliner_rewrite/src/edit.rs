//! Text edits and per-file batches.

use inliner_span::{FileId, Span};
use inliner_utils::errors::Diagnostic;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextEdit {
    pub file: FileId,
    pub span: Span,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(file: FileId, span: Span, replacement: impl Into<String>) -> Self {
        Self {
            file,
            span,
            replacement: replacement.into(),
        }
    }

    pub fn delete(file: FileId, span: Span) -> Self {
        Self::new(file, span, String::new())
    }

    pub fn insert(file: FileId, offset: usize, text: impl Into<String>) -> Self {
        Self::new(file, Span::empty_at(offset), text)
    }
}

/// Two edits of one file touch the same text. The whole file is left as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("conflicting edits at {first} and {second}")]
pub struct BatchConflict {
    pub file: FileId,
    pub first: Span,
    pub second: Span,
}

impl BatchConflict {
    pub fn to_diagnostic(&self, source_id: &str) -> Diagnostic {
        Diagnostic::warning(source_id, self.second, self.to_string())
            .with_code("batch-conflict")
            .with_help(
                "no call site in this file was rewritten; a call nested in the arguments or receiver \
                 of another inlinable call always overlaps it, so inline the inner call by hand first",
            )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error(transparent)]
    Conflict(#[from] BatchConflict),
    #[error("edit {span} lies outside the {len}-byte source")]
    OutOfRange { span: Span, len: usize },
}

/// Sort a file's edits, collapsing identical duplicates. Any remaining
/// overlap is a conflict.
pub fn normalize(mut edits: Vec<TextEdit>) -> Result<Vec<TextEdit>, BatchConflict> {
    edits.sort_by(|a, b| {
        (a.span.start(), a.span.end(), &a.replacement).cmp(&(b.span.start(), b.span.end(), &b.replacement))
    });
    edits.dedup();
    for pair in edits.windows(2) {
        if let [first, second] = pair
            && first.span.overlaps(&second.span)
        {
            return Err(BatchConflict {
                file: second.file,
                first: first.span,
                second: second.span,
            });
        }
    }
    Ok(edits)
}

/// Apply a batch of edits to `text`. Used for previews and tests; writing
/// files is left to the caller.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    let edits = normalize(edits.to_vec())?;
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for edit in &edits {
        let out_of_range = || EditError::OutOfRange {
            span: edit.span,
            len: text.len(),
        };
        let kept = text.get(cursor..edit.span.start()).ok_or_else(out_of_range)?;
        if !text.is_char_boundary(edit.span.end()) {
            return Err(out_of_range());
        }
        out.push_str(kept);
        out.push_str(&edit.replacement);
        cursor = edit.span.end();
    }
    out.push_str(text.get(cursor..).unwrap_or_default());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> FileId {
        FileId::new(0)
    }

    #[test]
    fn edits_apply_in_offset_order() {
        let edits = vec![
            TextEdit::new(file(), Span::new(8, 9), "b"),
            TextEdit::new(file(), Span::new(0, 3), "xyz"),
        ];
        assert_eq!(apply_edits("foo(a); a;", &edits), Ok("xyz(a); b;".to_string()));
    }

    #[test]
    fn identical_edits_collapse() {
        let edit = TextEdit::new(file(), Span::new(0, 3), "bar");
        let edits = normalize(vec![edit.clone(), edit.clone()]).expect("no conflict");
        assert_eq!(edits, vec![edit]);
    }

    #[test]
    fn overlapping_edits_conflict() {
        let edits = vec![
            TextEdit::new(file(), Span::new(0, 10), "outer"),
            TextEdit::new(file(), Span::new(4, 6), "inner"),
        ];
        assert_eq!(
            normalize(edits),
            Err(BatchConflict {
                file: file(),
                first: Span::new(0, 10),
                second: Span::new(4, 6),
            })
        );
    }

    #[test]
    fn insertions_next_to_replacements_are_fine() {
        let edits = vec![
            TextEdit::insert(file(), 3, "\nimport a.B;"),
            TextEdit::new(file(), Span::new(3, 5), "x"),
        ];
        assert_eq!(apply_edits("abcde", &edits), Ok("abc\nimport a.B;x".to_string()));
    }

    #[test]
    fn deletions() {
        let edits = vec![TextEdit::delete(file(), Span::new(6, 13))];
        assert_eq!(apply_edits("client.noOp().bar()", &edits), Ok("client.bar()".to_string()));
    }

    #[test]
    fn out_of_range_edits_are_reported() {
        let edits = vec![TextEdit::delete(file(), Span::new(2, 40))];
        assert!(matches!(apply_edits("short", &edits), Err(EditError::OutOfRange { .. })));
    }
}
