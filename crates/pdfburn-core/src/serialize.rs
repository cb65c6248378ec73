//! Output serialization
//!
//! One fixed cleanup policy, applied to every document before it is written:
//! byte-identical streams are merged, unreachable objects dropped, objects
//! renumbered and uncompressed streams deflated.

use crate::document::BurnDocument;
use crate::error::BurnError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Attachment filename of every burned document
pub const OUTPUT_FILENAME: &str = "edited.pdf";

/// Clean up and encode the document
pub fn save_document(doc: BurnDocument) -> Result<Vec<u8>, BurnError> {
    let mut doc = doc.into_inner();

    let merged = merge_duplicate_streams(&mut doc);
    let pruned = doc.prune_objects().len();
    doc.renumber_objects();
    doc.compress();
    debug!(merged, pruned, objects = doc.objects.len(), "compacted document");

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| BurnError::SaveError(e.to_string()))?;
    Ok(buffer)
}

/// Point every reference at the first of a set of identical streams
///
/// Repeats until stable: merging two soft masks can make the images that
/// use them identical in turn.
fn merge_duplicate_streams(doc: &mut Document) -> usize {
    let mut total = 0;
    loop {
        let replacements = find_duplicate_streams(doc);
        if replacements.is_empty() {
            return total;
        }
        total += replacements.len();

        for object in doc.objects.values_mut() {
            replace_refs(object, &replacements);
        }
        for (_, value) in doc.trailer.iter_mut() {
            replace_refs(value, &replacements);
        }
        for id in replacements.keys() {
            doc.objects.remove(id);
        }
    }
}

fn find_duplicate_streams(doc: &Document) -> BTreeMap<ObjectId, ObjectId> {
    let mut first_seen: HashMap<[u8; 32], ObjectId> = HashMap::new();
    let mut replacements = BTreeMap::new();

    for (&id, object) in &doc.objects {
        let Object::Stream(stream) = object else {
            continue;
        };
        let mut hasher = Sha256::new();
        hash_dictionary(&mut hasher, &stream.dict);
        hasher.update(&stream.content);
        let digest: [u8; 32] = hasher.finalize().into();

        match first_seen.get(&digest) {
            Some(&canonical) => {
                replacements.insert(id, canonical);
            }
            None => {
                first_seen.insert(digest, id);
            }
        }
    }
    replacements
}

/// Feed a dictionary into the hasher in its stored key order
fn hash_dictionary(hasher: &mut Sha256, dict: &Dictionary) {
    hasher.update(b"<<");
    for (key, value) in dict.iter() {
        hasher.update((key.len() as u64).to_le_bytes());
        hasher.update(key);
        hash_object(hasher, value);
    }
    hasher.update(b">>");
}

fn hash_object(hasher: &mut Sha256, object: &Object) {
    match object {
        Object::Null => hasher.update(b"n"),
        Object::Boolean(b) => hasher.update([b'b', *b as u8]),
        Object::Integer(i) => {
            hasher.update(b"i");
            hasher.update(i.to_le_bytes());
        }
        Object::Real(r) => {
            hasher.update(b"r");
            hasher.update(r.to_bits().to_le_bytes());
        }
        Object::Name(name) => {
            hasher.update(b"/");
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name);
        }
        Object::String(bytes, _) => {
            hasher.update(b"s");
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        Object::Array(items) => {
            hasher.update(b"[");
            for item in items {
                hash_object(hasher, item);
            }
            hasher.update(b"]");
        }
        Object::Dictionary(dict) => hash_dictionary(hasher, dict),
        Object::Stream(stream) => {
            hash_dictionary(hasher, &stream.dict);
            hasher.update(b"stream");
            hasher.update((stream.content.len() as u64).to_le_bytes());
            hasher.update(&stream.content);
        }
        Object::Reference((number, generation)) => {
            hasher.update(b"R");
            hasher.update(number.to_le_bytes());
            hasher.update(generation.to_le_bytes());
        }
    }
}

fn replace_refs(object: &mut Object, replacements: &BTreeMap<ObjectId, ObjectId>) {
    match object {
        Object::Reference(id) => {
            if let Some(&canonical) = replacements.get(&*id) {
                *id = canonical;
            }
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                replace_refs(item, replacements);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                replace_refs(value, replacements);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                replace_refs(value, replacements);
            }
        }
        _ => {}
    }
}
