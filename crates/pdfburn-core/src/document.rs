//! In-memory document handle
//!
//! Thin wrapper over `lopdf::Document` that speaks zero-based page ordinals
//! and knows how to resolve the inheritable page attributes the compositor
//! needs (page boxes and rotation).

use crate::error::BurnError;
use lopdf::{Document, Object, ObjectId};

/// Guard against cyclic `/Parent` chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when a page carries no usable box at all
const DEFAULT_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Visible page area in default user space, plus the display rotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    /// Clockwise display rotation, one of 0, 90, 180, 270
    pub rotation: u16,
}

impl PageBox {
    fn from_corners(rect: [f32; 4], rotation: u16) -> Self {
        Self {
            x0: rect[0].min(rect[2]),
            y0: rect[1].min(rect[3]),
            x1: rect[0].max(rect[2]),
            y1: rect[1].max(rect[3]),
            rotation,
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Matrix mapping the image unit square onto the whole box
    ///
    /// The image ends up upright once a viewer applies the page's `/Rotate`.
    /// Aspect ratio is not preserved.
    pub fn overlay_matrix(&self) -> [f32; 6] {
        let (w, h) = (self.width(), self.height());
        match self.rotation {
            90 => [0.0, h, -w, 0.0, self.x1, self.y0],
            180 => [-w, 0.0, 0.0, -h, self.x1, self.y1],
            270 => [0.0, -h, w, 0.0, self.x0, self.y1],
            _ => [w, 0.0, 0.0, h, self.x0, self.y0],
        }
    }
}

/// A parsed PDF owned by a single burn request
pub struct BurnDocument {
    doc: Document,
}

impl BurnDocument {
    /// Parse a PDF from raw bytes
    pub fn load(bytes: &[u8]) -> Result<Self, BurnError> {
        let doc = Document::load_mem(bytes).map_err(|e| BurnError::ParseError(e.to_string()))?;
        Ok(Self { doc })
    }

    pub fn from_document(doc: Document) -> Self {
        Self { doc }
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Page object ids in display order; position in the vector is the ordinal
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    /// Remove the page at zero-based `index`; later pages shift down by one
    pub fn delete_page(&mut self, index: u32) {
        self.doc.delete_pages(&[index + 1]);
    }

    /// Visible box of a page: CropBox clipped to MediaBox, falling back to
    /// MediaBox, then to US Letter
    pub fn page_box(&self, page_id: ObjectId) -> PageBox {
        let rotation = self.rotation(page_id);
        let media_box = self.rect_attribute(page_id, b"MediaBox");
        let crop_box = self.rect_attribute(page_id, b"CropBox");

        let rect = match (crop_box, media_box) {
            (Some(crop), Some(media)) => intersect(crop, media).unwrap_or(media),
            (Some(crop), None) => crop,
            (None, Some(media)) => media,
            (None, None) => DEFAULT_BOX,
        };
        PageBox::from_corners(rect, rotation)
    }

    /// Normalized `/Rotate` of a page
    pub fn rotation(&self, page_id: ObjectId) -> u16 {
        let degrees = inherited_attribute(&self.doc, page_id, b"Rotate")
            .and_then(|obj| resolve(&self.doc, obj))
            .and_then(|obj| obj.as_i64().ok())
            .unwrap_or(0);
        match degrees.rem_euclid(360) {
            90 => 90,
            180 => 180,
            270 => 270,
            _ => 0,
        }
    }

    fn rect_attribute(&self, page_id: ObjectId, key: &[u8]) -> Option<[f32; 4]> {
        let obj = inherited_attribute(&self.doc, page_id, key)?;
        let rect = parse_rect(&self.doc, resolve(&self.doc, obj)?)?;
        let (w, h) = ((rect[2] - rect[0]).abs(), (rect[3] - rect[1]).abs());
        (w > 0.0 && h > 0.0).then_some(rect)
    }

    pub fn inner(&self) -> &Document {
        &self.doc
    }

    pub fn inner_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn into_inner(self) -> Document {
        self.doc
    }
}

/// Look up a page attribute, walking `/Parent` for inheritable keys
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = Some(page_id);
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(current?).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Follow a single indirect reference; `None` if it dangles
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn parse_rect(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let arr = obj.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut values = [0.0f32; 4];
    for (slot, item) in values.iter_mut().zip(arr) {
        *slot = match resolve(doc, item)? {
            Object::Integer(i) => *i as f32,
            Object::Real(r) => *r,
            _ => return None,
        };
    }
    Some(values)
}

fn intersect(a: [f32; 4], b: [f32; 4]) -> Option<[f32; 4]> {
    let a = PageBox::from_corners(a, 0);
    let b = PageBox::from_corners(b, 0);
    let rect = [a.x0.max(b.x0), a.y0.max(b.y0), a.x1.min(b.x1), a.y1.min(b.y1)];
    (rect[2] > rect[0] && rect[3] > rect[1]).then_some(rect)
}
