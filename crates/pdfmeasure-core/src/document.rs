//! PDF loading and page geometry
//!
//! Wraps a parsed `lopdf::Document` and answers the one question the
//! service cares about: how big is a page, as a viewer would display it.

use lopdf::{Dictionary, Object, ObjectId};
use serde::{Deserialize, Serialize};

use crate::error::{MeasureError, Result};

/// US Letter, used when no MediaBox exists anywhere in the page tree
const DEFAULT_MEDIA_BOX: PageBox = PageBox {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// Guards against `/Parent` cycles in malformed page trees
const MAX_TREE_DEPTH: usize = 64;

/// A rectangle in PDF user space (points), normalised so `x0 <= x1` and `y0 <= y1`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PageBox {
    pub fn new(ax: f64, ay: f64, bx: f64, by: f64) -> Self {
        Self {
            x0: ax.min(bx),
            y0: ay.min(by),
            x1: ax.max(bx),
            y1: ay.max(by),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Overlap of two boxes, `None` when they do not share any area
    pub fn intersect(&self, other: &PageBox) -> Option<PageBox> {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);
        if x1 > x0 && y1 > y0 {
            Some(PageBox { x0, y0, x1, y1 })
        } else {
            None
        }
    }
}

/// Displayed size of a page in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub width: f64,
    pub height: f64,
}

/// Everything that went into computing a page's dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    /// Zero-based page index
    pub page: u32,
    pub media_box: PageBox,
    pub crop_box: Option<PageBox>,
    /// Clockwise rotation in degrees: 0, 90, 180 or 270
    pub rotation: u16,
    pub dimensions: PageDimensions,
}

/// A parsed PDF held in memory
#[derive(Debug, Clone)]
pub struct PdfDocument {
    inner: lopdf::Document,
    page_ids: Vec<ObjectId>,
}

impl PdfDocument {
    /// Parse PDF bytes. Documents without any page are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = lopdf::Document::load_mem(bytes)
            .map_err(|e| MeasureError::InvalidPdf(e.to_string()))?;

        // get_pages is keyed by 1-based page number, so values come out in page order
        let page_ids: Vec<ObjectId> = inner.get_pages().values().copied().collect();
        if page_ids.is_empty() {
            return Err(MeasureError::InvalidPdf("document has no pages".into()));
        }

        tracing::debug!(
            "Parsed PDF {} with {} pages ({} bytes)",
            inner.version,
            page_ids.len(),
            bytes.len()
        );

        Ok(Self { inner, page_ids })
    }

    pub fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    /// PDF header version, e.g. "1.7"
    pub fn version(&self) -> &str {
        &self.inner.version
    }

    /// Turn a zero-based index into a page position, counting negative
    /// indices back from the last page (`-1` is the last page)
    pub fn resolve_page_index(&self, index: i64) -> Result<u32> {
        let total = self.page_count();
        let resolved = if index < 0 {
            i64::from(total) + index
        } else {
            index
        };

        if (0..i64::from(total)).contains(&resolved) {
            Ok(resolved as u32)
        } else {
            Err(MeasureError::PageOutOfBounds { page: index, total })
        }
    }

    /// Displayed width and height of the page at a zero-based index
    pub fn page_dimensions(&self, index: u32) -> Result<PageDimensions> {
        Ok(self.page_geometry(index)?.dimensions)
    }

    /// Resolve the boxes and rotation of the page at a zero-based index.
    ///
    /// The visible area is the CropBox clipped to the MediaBox (or just the
    /// MediaBox when there is no CropBox). A quarter-turn rotation swaps
    /// the reported width and height.
    pub fn page_geometry(&self, index: u32) -> Result<PageGeometry> {
        let page_id = self.page_id(index)?;

        let media_box = match self.inherited(page_id, b"MediaBox")? {
            Some(obj) => self.page_box(obj, "MediaBox")?,
            None => DEFAULT_MEDIA_BOX,
        };
        let crop_box = match self.inherited(page_id, b"CropBox")? {
            Some(obj) => Some(self.page_box(obj, "CropBox")?),
            None => None,
        };
        let rotation = match self.inherited(page_id, b"Rotate")? {
            // Some producers write /Rotate as a Real such as 90.0
            Some(obj) => normalize_rotation(
                number(self.resolve(obj)).map_or(0, |degrees| degrees.round() as i64),
            ),
            None => 0,
        };

        let visible = crop_box
            .and_then(|crop| crop.intersect(&media_box))
            .unwrap_or(media_box);

        let dimensions = if rotation % 180 == 0 {
            PageDimensions {
                width: visible.width(),
                height: visible.height(),
            }
        } else {
            PageDimensions {
                width: visible.height(),
                height: visible.width(),
            }
        };

        Ok(PageGeometry {
            page: index,
            media_box,
            crop_box,
            rotation,
            dimensions,
        })
    }

    pub(crate) fn inner(&self) -> &lopdf::Document {
        &self.inner
    }

    /// 1-based page number of a page object, if it belongs to this document
    pub(crate) fn page_number_of(&self, id: ObjectId) -> Option<u32> {
        self.page_ids
            .iter()
            .position(|&page_id| page_id == id)
            .map(|i| i as u32 + 1)
    }

    /// Follow an indirect reference; anything else is returned as is
    pub(crate) fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.inner.get_object(*id).unwrap_or(obj),
            other => other,
        }
    }

    pub(crate) fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        self.resolve(obj).as_dict().ok()
    }

    fn page_id(&self, index: u32) -> Result<ObjectId> {
        self.page_ids
            .get(index as usize)
            .copied()
            .ok_or(MeasureError::PageOutOfBounds {
                page: i64::from(index),
                total: self.page_count(),
            })
    }

    /// Look up a page attribute, walking up `/Parent` links for inheritable keys
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<&Object>> {
        let mut current = page_id;
        for _ in 0..MAX_TREE_DEPTH {
            let dict = self
                .inner
                .get_object(current)
                .and_then(|o| o.as_dict())
                .map_err(|e| MeasureError::InvalidPdf(format!("bad page node: {}", e)))?;

            if let Ok(value) = dict.get(key) {
                return Ok(Some(value));
            }

            match dict.get(b"Parent").and_then(|p| p.as_reference()) {
                Ok(parent) => current = parent,
                Err(_) => return Ok(None),
            }
        }
        Ok(None)
    }

    fn page_box(&self, obj: &Object, name: &str) -> Result<PageBox> {
        let array = self
            .resolve(obj)
            .as_array()
            .map_err(|_| MeasureError::InvalidPageBox(format!("{} is not an array", name)))?;

        if array.len() != 4 {
            return Err(MeasureError::InvalidPageBox(format!(
                "{} has {} entries, expected 4",
                name,
                array.len()
            )));
        }

        let mut coords = [0.0f64; 4];
        for (slot, value) in coords.iter_mut().zip(array) {
            *slot = number(self.resolve(value)).ok_or_else(|| {
                MeasureError::InvalidPageBox(format!("{} contains a non-number", name))
            })?;
        }

        Ok(PageBox::new(coords[0], coords[1], coords[2], coords[3]))
    }
}

/// Read an Integer or Real as f64
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}

/// Map any /Rotate value onto 0, 90, 180 or 270. Values that are not a
/// multiple of 90 are invalid and count as 0.
fn normalize_rotation(raw: i64) -> u16 {
    if raw % 90 != 0 {
        return 0;
    }
    raw.rem_euclid(360) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object};
    use pretty_assertions::assert_eq;

    /// Build a PDF from per-page extra entries. `parent_extra` lands on the Pages node.
    fn build_pdf(pages: Vec<Dictionary>, parent_extra: Dictionary) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for mut page in pages {
            page.set("Type", "Page");
            page.set("Parent", Object::Reference(pages_id));
            kids.push(Object::Reference(doc.add_object(page)));
        }

        let mut pages_dict = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        };
        for (key, value) in parent_extra.iter() {
            pages_dict.set(key.clone(), value.clone());
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn letter_page() -> Dictionary {
        dictionary! {
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }
    }

    #[test]
    fn test_rejects_garbage_bytes() {
        let result = PdfDocument::from_bytes(b"definitely not a pdf");
        assert!(matches!(result, Err(MeasureError::InvalidPdf(_))));
    }

    #[test]
    fn test_counts_pages() {
        let pdf = build_pdf(vec![letter_page(), letter_page(), letter_page()], Dictionary::new());
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.version(), "1.7");
    }

    #[test]
    fn test_letter_page_dimensions() {
        let pdf = build_pdf(vec![letter_page()], Dictionary::new());
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        assert_eq!(
            doc.page_dimensions(0).unwrap(),
            PageDimensions {
                width: 612.0,
                height: 792.0
            }
        );
    }

    #[test]
    fn test_page_index_is_zero_based() {
        let a4 = dictionary! {
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        let pdf = build_pdf(vec![letter_page(), a4], Dictionary::new());
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        assert_eq!(doc.page_dimensions(1).unwrap().width, 595.0);
    }

    #[test]
    fn test_out_of_range_page_fails() {
        let pdf = build_pdf(vec![letter_page()], Dictionary::new());
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        match doc.page_dimensions(1) {
            Err(MeasureError::PageOutOfBounds { page, total }) => {
                assert_eq!(page, 1);
                assert_eq!(total, 1);
            }
            other => panic!("expected PageOutOfBounds, got {:?}", other),
        }
    }

    #[test]
    fn test_media_box_inherited_from_parent() {
        let parent = dictionary! {
            "MediaBox" => vec![0.into(), 0.into(), 420.into(), 595.into()],
        };
        let pdf = build_pdf(vec![Dictionary::new()], parent);
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        let dims = doc.page_dimensions(0).unwrap();
        assert_eq!(dims.width, 420.0);
        assert_eq!(dims.height, 595.0);
    }

    #[test]
    fn test_missing_media_box_defaults_to_letter() {
        let pdf = build_pdf(vec![Dictionary::new()], Dictionary::new());
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        let geometry = doc.page_geometry(0).unwrap();
        assert_eq!(geometry.media_box, DEFAULT_MEDIA_BOX);
    }

    #[test]
    fn test_crop_box_wins_over_media_box() {
        let page = dictionary! {
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "CropBox" => vec![36.into(), 36.into(), 576.into(), 756.into()],
        };
        let pdf = build_pdf(vec![page], Dictionary::new());
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        let dims = doc.page_dimensions(0).unwrap();
        assert_eq!(dims.width, 540.0);
        assert_eq!(dims.height, 720.0);
    }

    #[test]
    fn test_crop_box_clipped_to_media_box() {
        let page = dictionary! {
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "CropBox" => vec![(-100).into(), 0.into(), 300.into(), 900.into()],
        };
        let pdf = build_pdf(vec![page], Dictionary::new());
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        let dims = doc.page_dimensions(0).unwrap();
        assert_eq!(dims.width, 300.0);
        assert_eq!(dims.height, 792.0);
    }

    #[test]
    fn test_quarter_turn_swaps_dimensions() {
        let page = dictionary! {
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Rotate" => 90,
        };
        let pdf = build_pdf(vec![page], Dictionary::new());
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        let geometry = doc.page_geometry(0).unwrap();
        assert_eq!(geometry.rotation, 90);
        assert_eq!(geometry.dimensions.width, 792.0);
        assert_eq!(geometry.dimensions.height, 612.0);
    }

    #[test]
    fn test_inherited_rotation() {
        let parent = dictionary! { "Rotate" => 270 };
        let pdf = build_pdf(vec![letter_page()], parent);
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        assert_eq!(doc.page_dimensions(0).unwrap().width, 792.0);
    }

    #[test]
    fn test_reversed_corners_are_normalised() {
        let page = dictionary! {
            "MediaBox" => vec![612.into(), 792.into(), 0.into(), 0.into()],
        };
        let pdf = build_pdf(vec![page], Dictionary::new());
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        assert_eq!(doc.page_dimensions(0).unwrap().height, 792.0);
    }

    #[test]
    fn test_real_valued_media_box() {
        let page = dictionary! {
            "MediaBox" => vec![Object::Real(0.0), Object::Real(0.0), Object::Real(595.5), Object::Real(842.25)],
        };
        let pdf = build_pdf(vec![page], Dictionary::new());
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        let dims = doc.page_dimensions(0).unwrap();
        assert!((dims.width - 595.5).abs() < 1e-3);
        assert!((dims.height - 842.25).abs() < 1e-3);
    }

    #[test]
    fn test_malformed_media_box_is_an_error() {
        let page = dictionary! {
            "MediaBox" => vec![0.into(), 0.into(), 612.into()],
        };
        let pdf = build_pdf(vec![page], Dictionary::new());
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        assert!(matches!(
            doc.page_dimensions(0),
            Err(MeasureError::InvalidPageBox(_))
        ));
    }

    #[test]
    fn test_real_valued_rotation() {
        let page = dictionary! {
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Rotate" => Object::Real(90.0),
        };
        let pdf = build_pdf(vec![page], Dictionary::new());
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        let geometry = doc.page_geometry(0).unwrap();
        assert_eq!(geometry.rotation, 90);
        assert_eq!(geometry.dimensions.width, 792.0);
    }

    #[test]
    fn test_parent_cycle_falls_back_to_default_media_box() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
        });
        // The Pages node points back at its own kid
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => 1,
                "Kids" => vec![Object::Reference(page_id)],
                "Parent" => Object::Reference(page_id),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();

        let doc = PdfDocument::from_bytes(&buffer).unwrap();
        let geometry = doc.page_geometry(0).unwrap();
        assert_eq!(geometry.media_box, DEFAULT_MEDIA_BOX);
        assert_eq!(geometry.rotation, 0);
    }

    #[test]
    fn test_resolve_page_index() {
        let pdf = build_pdf(vec![letter_page(), letter_page(), letter_page()], Dictionary::new());
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        assert_eq!(doc.resolve_page_index(0).unwrap(), 0);
        assert_eq!(doc.resolve_page_index(2).unwrap(), 2);
        assert_eq!(doc.resolve_page_index(-1).unwrap(), 2);
        assert_eq!(doc.resolve_page_index(-3).unwrap(), 0);
        assert!(matches!(
            doc.resolve_page_index(-4),
            Err(MeasureError::PageOutOfBounds { page: -4, total: 3 })
        ));
        assert!(matches!(
            doc.resolve_page_index(3),
            Err(MeasureError::PageOutOfBounds { page: 3, total: 3 })
        ));
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(0), 0);
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(normalize_rotation(-90), 270);
        assert_eq!(normalize_rotation(45), 0);
    }
}
