//! PDF document adapter using lopdf
//!
//! Opens source bytes into an object graph, answers page and annotation
//! questions, owns the form container (`/AcroForm`) and serializes the graph
//! back to bytes.

use std::collections::{BTreeSet, HashSet};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use crate::coords::MediaBox;
use crate::error::FormError;
use crate::text::object_text;

/// US Letter, used when neither the page nor its ancestors declare a MediaBox
const FALLBACK_PAGE_SIZE: (f64, f64) = (612.0, 792.0);

/// Default appearance installed on the form container for synthesized fields
const FORM_DEFAULT_APPEARANCE: &str = "/Helv 0 Tf 0 g";

/// Wrapper around lopdf::Document for form-field operations
pub struct FormDocument {
    pub(crate) doc: Document,
}

impl FormDocument {
    /// Load a PDF from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormError> {
        if bytes.is_empty() {
            return Err(FormError::NoSourceDocument);
        }
        let doc =
            Document::load_mem(bytes).map_err(|e| FormError::DocumentUnreadable(e.to_string()))?;
        Ok(Self { doc })
    }

    /// Wrap an already parsed document
    pub fn from_document(doc: Document) -> Self {
        Self { doc }
    }

    /// Get the number of pages
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Get page object ID for a given page number (1-indexed)
    pub fn page_id(&self, page_num: u32) -> Option<ObjectId> {
        self.doc.get_pages().get(&page_num).copied()
    }

    /// Page numbers paired with their object IDs, in page order
    pub fn pages(&self) -> Vec<(u32, ObjectId)> {
        self.doc.get_pages().into_iter().collect()
    }

    /// Get page size (width, height) in document units
    pub fn page_size(&self, page_num: u32) -> Result<(f64, f64), FormError> {
        let [_, _, width, height] = self.media_box(page_num)?;
        Ok((width, height))
    }

    /// Get the page's media box as `[x, y, width, height]`
    ///
    /// Inherited from the page tree when the page has none; US Letter at the
    /// origin when no ancestor declares one either.
    pub fn media_box(&self, page_num: u32) -> Result<MediaBox, FormError> {
        let page_id = self
            .page_id(page_num)
            .ok_or_else(|| FormError::OperationError(format!("Page {} not found", page_num)))?;

        let mut current = Some(page_id);
        let mut depth = 0;
        while let Some(node_id) = current {
            let node = self.doc.get_dictionary(node_id)?;
            if let Ok(media_box) = node.get(b"MediaBox") {
                let [x1, y1, x2, y2] = self.parse_rect(media_box)?;
                return Ok([x1.min(x2), y1.min(y2), (x2 - x1).abs(), (y2 - y1).abs()]);
            }
            depth += 1;
            if depth > MAX_TREE_DEPTH {
                break;
            }
            current = node.get(b"Parent").and_then(Object::as_reference).ok();
        }

        let (width, height) = FALLBACK_PAGE_SIZE;
        Ok([0.0, 0.0, width, height])
    }

    /// Sizes of all pages, in page order
    pub fn page_sizes(&self) -> Result<Vec<(f64, f64)>, FormError> {
        (1..=self.page_count() as u32)
            .map(|page| self.page_size(page))
            .collect()
    }

    /// Annotation references of a page, whether `/Annots` is inline or indirect
    pub fn annotation_ids(&self, page_id: ObjectId) -> Vec<ObjectId> {
        let Ok(page) = self.doc.get_dictionary(page_id) else {
            return Vec::new();
        };
        let Ok(annots) = page.get(b"Annots") else {
            return Vec::new();
        };

        match self.resolve(annots) {
            Object::Array(entries) => entries
                .iter()
                .filter_map(|entry| match entry {
                    Object::Reference(id) => Some(*id),
                    _ => {
                        tracing::debug!("Skipping inline annotation on page {:?}", page_id);
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Append an annotation reference to a page's `/Annots` array
    pub fn push_annotation(
        &mut self,
        page_id: ObjectId,
        annot_id: ObjectId,
    ) -> Result<(), FormError> {
        let annots_ref = self
            .doc
            .get_dictionary(page_id)?
            .get(b"Annots")
            .and_then(Object::as_reference)
            .ok();

        if let Some(array_id) = annots_ref {
            if let Object::Array(ref mut arr) = self.doc.get_object_mut(array_id)? {
                arr.push(Object::Reference(annot_id));
                return Ok(());
            }
        }

        let page_dict = self.doc.get_dictionary_mut(page_id)?;
        if let Ok(Object::Array(ref mut arr)) = page_dict.get_mut(b"Annots") {
            arr.push(Object::Reference(annot_id));
        } else {
            page_dict.set("Annots", Object::Array(vec![Object::Reference(annot_id)]));
        }
        Ok(())
    }

    /// True when the catalog declares a form container
    pub fn has_form(&self) -> bool {
        self.catalog()
            .map(|catalog| catalog.has(b"AcroForm"))
            .unwrap_or(false)
    }

    /// Names of every node in the form's field tree
    ///
    /// Covers fields whose widgets carry no name of their own, which a page
    /// scan cannot attribute to a field.
    pub fn field_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        let Some(fields) = self
            .acroform()
            .and_then(|form| form.get(b"Fields").ok())
            .and_then(|fields| self.resolve(fields).as_array().ok())
        else {
            return names;
        };

        let mut pending: Vec<(&Object, usize)> = fields.iter().map(|f| (f, 0)).collect();
        let mut visited = HashSet::new();
        while let Some((node, depth)) = pending.pop() {
            if depth > MAX_TREE_DEPTH {
                continue;
            }
            if let Object::Reference(id) = node {
                if !visited.insert(*id) {
                    continue;
                }
            }
            let Ok(dict) = self.resolve(node).as_dict() else {
                continue;
            };
            if let Some(name) = dict.get(b"T").ok().and_then(object_text) {
                let name = name.trim();
                if !name.is_empty() {
                    names.insert(name.to_string());
                }
            }
            if let Some(kids) = dict
                .get(b"Kids")
                .ok()
                .and_then(|kids| self.resolve(kids).as_array().ok())
            {
                pending.extend(kids.iter().map(|kid| (kid, depth + 1)));
            }
        }
        names
    }

    /// Current value of the form container's `/NeedAppearances` flag
    pub fn need_appearances(&self) -> bool {
        self.acroform()
            .and_then(|form| form.get(b"NeedAppearances").ok())
            .and_then(|flag| flag.as_bool().ok())
            .unwrap_or(false)
    }

    /// Ask viewers to regenerate field appearances from field values
    pub fn set_need_appearances(&mut self) -> Result<(), FormError> {
        let form = self.acroform_mut()?;
        form.set("NeedAppearances", Object::Boolean(true));
        Ok(())
    }

    /// Register new top-level fields with the form container
    ///
    /// Also installs the Helvetica default resource that synthesized
    /// default appearance strings refer to.
    pub fn register_fields(&mut self, field_ids: &[ObjectId]) -> Result<(), FormError> {
        let fields_ref = self
            .acroform_mut()?
            .get(b"Fields")
            .and_then(Object::as_reference)
            .ok();

        let new_refs = field_ids.iter().map(|id| Object::Reference(*id));
        match fields_ref {
            Some(array_id) => {
                if let Object::Array(ref mut arr) = self.doc.get_object_mut(array_id)? {
                    arr.extend(new_refs);
                }
            }
            None => {
                let form = self.acroform_mut()?;
                if let Ok(Object::Array(ref mut arr)) = form.get_mut(b"Fields") {
                    arr.extend(new_refs);
                } else {
                    form.set("Fields", Object::Array(new_refs.collect()));
                }
            }
        }

        self.ensure_default_resources()
    }

    fn ensure_default_resources(&mut self) -> Result<(), FormError> {
        let has_dr = self.acroform_mut()?.has(b"DR");
        if !has_dr {
            let font_id = self.doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            });
            let form = self.acroform_mut()?;
            form.set(
                "DR",
                dictionary! {
                    "Font" => dictionary! {
                        "Helv" => Object::Reference(font_id),
                    },
                },
            );
        }

        let form = self.acroform_mut()?;
        if !form.has(b"DA") {
            form.set("DA", Object::string_literal(FORM_DEFAULT_APPEARANCE));
        }
        Ok(())
    }

    /// Serialize the document, consuming the adapter
    pub fn save(mut self) -> Result<Vec<u8>, FormError> {
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| FormError::OperationError(format!("Failed to save PDF: {}", e)))?;
        Ok(buffer)
    }

    /// Borrow the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.doc
    }

    /// Follow a reference to its target object; non-references pass through
    pub(crate) fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            _ => obj,
        }
    }

    /// Resolve an entry of a dictionary to a dictionary, following one reference
    pub(crate) fn resolve_dict<'a>(
        &'a self,
        dict: &'a Dictionary,
        key: &[u8],
    ) -> Option<&'a Dictionary> {
        dict.get(key)
            .ok()
            .map(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_dict().ok())
    }

    fn root_id(&self) -> Result<ObjectId, FormError> {
        self.doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|_| FormError::OperationError("Document has no catalog".to_string()))
    }

    fn catalog(&self) -> Option<&Dictionary> {
        let root_id = self.root_id().ok()?;
        self.doc.get_dictionary(root_id).ok()
    }

    fn acroform(&self) -> Option<&Dictionary> {
        let catalog = self.catalog()?;
        self.resolve_dict(catalog, b"AcroForm")
    }

    /// The form container, created when missing and hoisted when inline
    fn acroform_mut(&mut self) -> Result<&mut Dictionary, FormError> {
        let root_id = self.root_id()?;
        let existing = self.doc.get_dictionary(root_id)?.get(b"AcroForm").ok().cloned();

        let form_id = match existing {
            Some(Object::Reference(id)) => id,
            Some(Object::Dictionary(inline)) => {
                let id = self.doc.add_object(Object::Dictionary(inline));
                self.doc
                    .get_dictionary_mut(root_id)?
                    .set("AcroForm", Object::Reference(id));
                id
            }
            _ => {
                let id = self.doc.add_object(dictionary! {
                    "Fields" => Vec::<Object>::new(),
                });
                self.doc
                    .get_dictionary_mut(root_id)?
                    .set("AcroForm", Object::Reference(id));
                id
            }
        };

        Ok(self.doc.get_dictionary_mut(form_id)?)
    }

    /// Parse a PDF rectangle array into [x1, y1, x2, y2]
    fn parse_rect(&self, obj: &Object) -> Result<[f64; 4], FormError> {
        let arr = self
            .resolve(obj)
            .as_array()
            .map_err(|_| FormError::OperationError("MediaBox is not an array".to_string()))?;

        if arr.len() != 4 {
            return Err(FormError::OperationError(format!(
                "MediaBox has {} elements, expected 4",
                arr.len()
            )));
        }

        let mut values = [0.0f64; 4];
        for (i, obj) in arr.iter().enumerate() {
            values[i] = self.extract_number(obj)?;
        }
        Ok(values)
    }

    /// Extract a number from a PDF object
    fn extract_number(&self, obj: &Object) -> Result<f64, FormError> {
        match self.resolve(obj) {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(r) => Ok(*r as f64),
            _ => Err(FormError::OperationError(
                "Expected number in rectangle".to_string(),
            )),
        }
    }
}

/// Bound on `/Parent` walks, guarding against malformed cyclic trees
pub(crate) const MAX_TREE_DEPTH: usize = 32;
