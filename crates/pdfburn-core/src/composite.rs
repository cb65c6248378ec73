//! Overlay compositing
//!
//! Burns each overlay over the full page box of the page at the same
//! (post-pruning) ordinal. The page's own content is wrapped in `q ... Q` so
//! any graphics state it leaves behind cannot distort the overlay.

use crate::document::{inherited_attribute, resolve, BurnDocument, PageBox};
use crate::error::BurnError;
use crate::image::OverlayImage;
use crate::overlay::OverlaySet;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// Prefix for the resource names given to overlay images
const XOBJECT_PREFIX: &str = "BurnOverlay";

/// Apply overlays to the pages they target; returns how many were applied
///
/// Overlays aimed past the last page are skipped without being decoded.
pub fn composite_overlays(
    doc: &mut BurnDocument,
    overlays: &OverlaySet,
) -> Result<usize, BurnError> {
    if overlays.is_empty() {
        return Ok(0);
    }

    let page_ids = doc.page_ids();
    let mut applied = 0;

    for (index, page_id) in page_ids.into_iter().enumerate() {
        let index = index as u32;
        let Some(bytes) = overlays.get(index) else {
            continue;
        };

        let image = OverlayImage::decode_png(bytes)
            .map_err(|message| BurnError::ImageError { page: index, message })?;
        let page_box = doc.page_box(page_id);
        debug!(
            page = index,
            width = image.width,
            height = image.height,
            rotation = page_box.rotation,
            "burning overlay"
        );

        burn_image(doc.inner_mut(), page_id, image, &page_box)?;
        applied += 1;
    }

    let skipped = overlays.len() - applied;
    if skipped > 0 {
        debug!(skipped, "overlays did not match any remaining page");
    }
    Ok(applied)
}

fn burn_image(
    doc: &mut Document,
    page_id: ObjectId,
    image: OverlayImage,
    page_box: &PageBox,
) -> Result<(), BurnError> {
    let image_id = image
        .embed(doc)
        .map_err(|e| BurnError::OperationError(format!("Failed to encode overlay: {}", e)))?;
    let name = register_xobject(doc, page_id, image_id)?;
    let draw = draw_operations(&name, page_box)?;
    append_after_contents(doc, page_id, draw)
}

/// `q <matrix> cm /<name> Do Q`
fn draw_operations(name: &str, page_box: &PageBox) -> Result<Vec<u8>, BurnError> {
    let matrix = page_box
        .overlay_matrix()
        .iter()
        .map(|&v| Object::Real(v))
        .collect();
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("cm", matrix),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    content
        .encode()
        .map_err(|e| BurnError::OperationError(e.to_string()))
}

/// Give the page its own resource dictionary and add the image to it
///
/// Resources may be inherited or shared with other pages, so they are copied
/// onto the page rather than edited in place.
fn register_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    image_id: ObjectId,
) -> Result<String, BurnError> {
    let mut resources = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    let name = unique_name(&xobjects, image_id);
    xobjects.set(name.as_str(), Object::Reference(image_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(name)
}

fn unique_name(xobjects: &Dictionary, image_id: ObjectId) -> String {
    let base = format!("{}{}", XOBJECT_PREFIX, image_id.0);
    let mut name = base.clone();
    let mut suffix = 1;
    while xobjects.has(name.as_bytes()) {
        name = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    name
}

/// Isolate the page's content in `q ... Q` and append `overlay` after it
fn append_after_contents(
    doc: &mut Document,
    page_id: ObjectId,
    overlay: Vec<u8>,
) -> Result<(), BurnError> {
    let existing = existing_content_refs(doc, page_id)?;

    let contents = if existing.is_empty() {
        vec![Object::Reference(
            doc.add_object(Stream::new(Dictionary::new(), overlay)),
        )]
    } else {
        let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let mut restore = b"Q\n".to_vec();
        restore.extend(overlay);
        let restore_id = doc.add_object(Stream::new(Dictionary::new(), restore));

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(save_id));
        contents.extend(existing);
        contents.push(Object::Reference(restore_id));
        contents
    };

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

fn existing_content_refs(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, BurnError> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| BurnError::OperationError(e.to_string()))?;

    let refs = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    Ok(refs
        .into_iter()
        .filter(|obj| matches!(obj, Object::Reference(_)))
        .collect())
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, BurnError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| BurnError::OperationError(e.to_string()))
}
