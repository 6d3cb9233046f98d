//! Table of contents
//!
//! Entries are emitted with string fields (`"level": "1"`) because that is
//! the shape existing clients of the service already consume.

use std::collections::HashSet;

use lopdf::{Dictionary, Object, ObjectId};
use serde::{Deserialize, Serialize};

use crate::document::PdfDocument;

/// Guards against runaway recursion in malformed outline and name trees
const MAX_DEPTH: usize = 64;

/// Cap on entries at a single outline level
const MAX_SIBLINGS: usize = 10_000;

/// Page value for bookmarks whose destination cannot be resolved
const UNRESOLVED_PAGE: &str = "-1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Nesting level, starting at 1
    pub level: String,
    pub title: String,
    /// 1-based page number, or "-1" when the target is unknown
    pub page: String,
}

impl TocEntry {
    pub fn new(level: usize, title: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            level: level.to_string(),
            title: title.into(),
            page: page
                .map(|p| p.to_string())
                .unwrap_or_else(|| UNRESOLVED_PAGE.to_string()),
        }
    }
}

/// The fixed table of contents served when outline extraction is disabled
pub fn placeholder_toc() -> Vec<TocEntry> {
    vec![TocEntry::new(1, "This is a test", Some(1))]
}

/// Flatten the document's bookmark tree into TOC entries, depth first.
///
/// Documents without an `/Outlines` tree yield an empty list.
pub fn extract_outline(doc: &PdfDocument) -> Vec<TocEntry> {
    let Some(catalog) = catalog(doc) else {
        return Vec::new();
    };
    let Some(outlines) = catalog.get(b"Outlines").ok().and_then(|o| doc.resolve_dict(o)) else {
        return Vec::new();
    };
    let Ok(first) = outlines.get(b"First").and_then(|f| f.as_reference()) else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    let mut visited = HashSet::new();
    walk(doc, catalog, first, 1, &mut visited, &mut entries);

    tracing::debug!("Extracted {} outline entries", entries.len());
    entries
}

fn catalog(doc: &PdfDocument) -> Option<&Dictionary> {
    let root = doc.inner().trailer.get(b"Root").ok()?;
    doc.resolve_dict(root)
}

fn walk(
    doc: &PdfDocument,
    catalog: &Dictionary,
    first: ObjectId,
    level: usize,
    visited: &mut HashSet<ObjectId>,
    entries: &mut Vec<TocEntry>,
) {
    if level > MAX_DEPTH {
        return;
    }

    let mut current = Some(first);
    let mut siblings = 0;

    while let Some(node_id) = current {
        if !visited.insert(node_id) || siblings >= MAX_SIBLINGS {
            break;
        }
        siblings += 1;

        let Some(node) = doc
            .inner()
            .get_object(node_id)
            .ok()
            .and_then(|o| o.as_dict().ok())
        else {
            break;
        };

        let title = node
            .get(b"Title")
            .ok()
            .and_then(|t| decode_text(doc.resolve(t)))
            .unwrap_or_default();
        let page = bookmark_page(doc, catalog, node);
        entries.push(TocEntry::new(level, title, page));

        if let Ok(child) = node.get(b"First").and_then(|c| c.as_reference()) {
            walk(doc, catalog, child, level + 1, visited, entries);
        }

        current = node.get(b"Next").and_then(|n| n.as_reference()).ok();
    }
}

/// Page a bookmark points at: its `/Dest`, or the target of a GoTo `/A` action
fn bookmark_page(doc: &PdfDocument, catalog: &Dictionary, node: &Dictionary) -> Option<u32> {
    if let Ok(dest) = node.get(b"Dest") {
        return dest_page(doc, catalog, dest, 0);
    }

    let action = doc.resolve_dict(node.get(b"A").ok()?)?;
    match action.get(b"S") {
        Ok(Object::Name(kind)) if kind == b"GoTo" => {
            dest_page(doc, catalog, action.get(b"D").ok()?, 0)
        }
        _ => None,
    }
}

fn dest_page(doc: &PdfDocument, catalog: &Dictionary, dest: &Object, depth: usize) -> Option<u32> {
    if depth > MAX_DEPTH {
        return None;
    }

    match doc.resolve(dest) {
        // [page /XYZ left top zoom] and friends
        Object::Array(arr) => match arr.first()? {
            Object::Reference(page_id) => doc.page_number_of(*page_id),
            // Some producers store a zero-based page index instead of a reference
            Object::Integer(index) if *index >= 0 => Some(*index as u32 + 1),
            _ => None,
        },
        // Named destination entries may be wrapped in << /D [...] >>
        Object::Dictionary(dict) => dest_page(doc, catalog, dict.get(b"D").ok()?, depth + 1),
        Object::Name(name) => {
            let target = named_dest(doc, catalog, name)?;
            dest_page(doc, catalog, target, depth + 1)
        }
        Object::String(name, _) => {
            let target = named_dest(doc, catalog, name)?;
            dest_page(doc, catalog, target, depth + 1)
        }
        _ => None,
    }
}

/// Look a destination name up in the catalog `/Dests` dictionary (PDF 1.1)
/// and then in the `/Names` → `/Dests` name tree
fn named_dest<'a>(doc: &'a PdfDocument, catalog: &'a Dictionary, name: &[u8]) -> Option<&'a Object> {
    if let Some(dests) = catalog.get(b"Dests").ok().and_then(|d| doc.resolve_dict(d)) {
        if let Ok(target) = dests.get(name) {
            return Some(target);
        }
    }

    let names = doc.resolve_dict(catalog.get(b"Names").ok()?)?;
    let tree = doc.resolve_dict(names.get(b"Dests").ok()?)?;
    search_name_tree(doc, tree, name, 0)
}

fn search_name_tree<'a>(
    doc: &'a PdfDocument,
    node: &'a Dictionary,
    name: &[u8],
    depth: usize,
) -> Option<&'a Object> {
    if depth > MAX_DEPTH {
        return None;
    }

    if let Ok(pairs) = node.get(b"Names").and_then(|n| doc.resolve(n).as_array()) {
        for pair in pairs.chunks(2) {
            if let [key, value] = pair {
                if let Object::String(key, _) = doc.resolve(key) {
                    if key.as_slice() == name {
                        return Some(value);
                    }
                }
            }
        }
    }

    let kids = node.get(b"Kids").and_then(|k| doc.resolve(k).as_array()).ok()?;
    kids.iter()
        .filter_map(|kid| doc.resolve_dict(kid))
        .find_map(|kid| search_name_tree(doc, kid, name, depth + 1))
}

/// Decode a PDF text string: UTF-16BE with BOM, otherwise UTF-8, otherwise Latin-1
fn decode_text(obj: &Object) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };

    if let Some(utf16) = bytes.strip_prefix(&[0xFE_u8, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&units));
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => Some(s.to_string()),
        Err(_) => Some(bytes.iter().map(|&b| b as char).collect()),
    }
}
