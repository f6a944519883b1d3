//! Composite position map for a concatenated bundle.
//!
//! Mapping points are placed at the start of every kept text run and at
//! every line start inside it. A module that arrived with its own map is
//! composed through it, so points land on the module's ultimate origins.

use crate::core::concat::{Concatenation, PlacedModule};
use crate::core::line_index::LineIndex;
use crate::core::models::CanonicalPath;
use crate::utils::{NeuterError, Result};
use sourcemap::{SourceMap, SourceMapBuilder};
use std::collections::BTreeMap;

/// Original side of one mapping point, zero-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Origin {
    source: u32,
    line: u32,
    column: u32,
}

/// Register a source once per name. Contents given later fill a gap but
/// never replace earlier contents.
fn register_source(builder: &mut SourceMapBuilder, name: &str, contents: Option<&str>) -> u32 {
    let id = builder.add_source(name);
    if !builder.has_source_contents(id) {
        builder.set_source_contents(id, contents);
    }
    id
}

/// A module's own map, decoded once
struct InputMap {
    map: SourceMap,
    base: CanonicalPath,
}

impl InputMap {
    fn parse(module: &PlacedModule) -> Result<Option<Self>> {
        let Some(raw) = module.input_map.as_deref() else {
            return Ok(None);
        };
        let map = SourceMap::from_slice(raw.as_bytes())
            .map_err(|e| NeuterError::source_map(module.path.clone(), e.to_string()))?;
        Ok(Some(Self {
            map,
            base: module.path.dir(),
        }))
    }

    /// Ultimate origin of a position in the module's own text.
    fn origin(&self, line: u32, column: u32) -> Option<(String, Option<&str>, u32, u32)> {
        let token = self.map.lookup_token(line, column)?;
        if token.get_dst_line() != line {
            return None;
        }
        let source = token.get_source()?;
        let contents = self.map.get_source_contents(token.get_src_id());
        let column_offset = column.saturating_sub(token.get_dst_col());
        Some((
            self.base.join(source).to_string(),
            contents,
            token.get_src_line(),
            token.get_src_col() + column_offset,
        ))
    }
}

pub struct SourceMapMerger<'a> {
    output: &'a CanonicalPath,
}

impl<'a> SourceMapMerger<'a> {
    pub fn new(output: &'a CanonicalPath) -> Self {
        Self { output }
    }

    pub fn merge(&self, concatenation: &Concatenation) -> Result<SourceMap> {
        let output_index = LineIndex::new(&concatenation.code);
        let mut builder = SourceMapBuilder::new(Some(self.output.file_name()));
        // Keyed by generated position: a later point at the same spot wins
        let mut points: BTreeMap<(u32, u32), Origin> = BTreeMap::new();

        for module in &concatenation.modules {
            let input = InputMap::parse(module)?;
            let source_index = LineIndex::new(&module.text);
            let identity = match input {
                Some(_) => None,
                None => Some(register_source(&mut builder, module.path.as_str(), Some(&module.text))),
            };

            for segment in &module.segments {
                let bytes = module.text.as_bytes();
                let end = segment.src_start + segment.len;
                let line_starts = (segment.src_start + 1..end).filter(|&i| bytes[i - 1] == b'\n');

                for offset in std::iter::once(segment.src_start).chain(line_starts) {
                    let out_offset = segment.out_start + (offset - segment.src_start);
                    let generated = output_index.position(&concatenation.code, out_offset);
                    let (line, column) = source_index.position(&module.text, offset);

                    let origin = match (&input, identity) {
                        (Some(map), _) => map.origin(line, column).map(|(name, contents, l, c)| Origin {
                            source: register_source(&mut builder, &name, contents),
                            line: l,
                            column: c,
                        }),
                        (None, Some(source)) => Some(Origin { source, line, column }),
                        (None, None) => None,
                    };

                    // Positions the input map does not cover stay unmapped
                    if let Some(origin) = origin {
                        points.insert(generated, origin);
                    }
                }
            }
        }

        for (&(dst_line, dst_col), origin) in &points {
            builder.add_raw(
                dst_line,
                dst_col,
                origin.line,
                origin.column,
                Some(origin.source),
                None,
                false,
            );
        }

        Ok(builder.into_sourcemap())
    }

    pub fn to_json(&self, map: &SourceMap) -> Result<String> {
        let mut buf = Vec::new();
        map.to_writer(&mut buf)
            .map_err(|e| NeuterError::source_map(self.output.clone(), e.to_string()))?;
        String::from_utf8(buf).map_err(|e| NeuterError::source_map(self.output.clone(), e.to_string()))
    }

    /// Trailing comment pointing the primary artifact at its map.
    pub fn directive(&self, map_path: &CanonicalPath) -> String {
        format!("\n//# sourceMappingURL={}", map_path.relative_to(&self.output.dir()))
    }
}
