use crate::core::models::{CanonicalPath, Span};

/// One module as it enters the output: final text plus the ranges to drop.
#[derive(Debug, Clone)]
pub struct ModuleText {
    pub path: CanonicalPath,
    pub text: String,
    pub excisions: Vec<Span>,
    pub input_map: Option<String>,
}

/// A run of bytes copied unchanged from a module into the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub out_start: usize,
    pub src_start: usize,
    pub len: usize,
}

#[derive(Debug, Clone)]
pub struct PlacedModule {
    pub path: CanonicalPath,
    pub text: String,
    pub input_map: Option<String>,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Default)]
pub struct Concatenation {
    pub code: String,
    pub modules: Vec<PlacedModule>,
}

/// Sort spans and merge the ones that overlap or touch.
pub fn merge_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort();
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

/// Complement of `excisions` within `0..len`, skipping empty ranges.
pub fn kept_ranges(len: usize, excisions: Vec<Span>) -> Vec<Span> {
    let mut kept = Vec::new();
    let mut cursor = 0;
    for span in merge_spans(excisions) {
        let start = span.start.min(len);
        if start > cursor {
            kept.push(Span::new(cursor, start));
        }
        cursor = cursor.max(span.end.min(len));
    }
    if cursor < len {
        kept.push(Span::new(cursor, len));
    }
    kept
}

pub struct Concatenator<'a> {
    separator: &'a str,
}

impl<'a> Concatenator<'a> {
    pub fn new(separator: &'a str) -> Self {
        Self { separator }
    }

    /// Join modules in order, removing each one's excised ranges.
    pub fn concat(&self, modules: Vec<ModuleText>) -> Concatenation {
        let capacity = modules.iter().map(|m| m.text.len() + self.separator.len()).sum();
        let mut code = String::with_capacity(capacity);
        let mut placed = Vec::with_capacity(modules.len());

        for (idx, module) in modules.into_iter().enumerate() {
            if idx > 0 {
                code.push_str(self.separator);
            }

            let mut segments = Vec::new();
            for range in kept_ranges(module.text.len(), module.excisions) {
                segments.push(Segment {
                    out_start: code.len(),
                    src_start: range.start,
                    len: range.len(),
                });
                code.push_str(&module.text[range.start..range.end]);
            }

            placed.push(PlacedModule {
                path: module.path,
                text: module.text,
                input_map: module.input_map,
                segments,
            });
        }

        Concatenation {
            code,
            modules: placed,
        }
    }
}
