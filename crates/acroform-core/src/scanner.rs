//! Widget scanner
//!
//! Walks every page's annotation list and turns widget annotations into
//! typed [`Widget`] records plus a registry of radio button groups.

use lopdf::{Dictionary, Object, ObjectId};

use crate::document::{FormDocument, MAX_TREE_DEPTH};
use crate::text::object_text;
use crate::widget::{ButtonGroup, FieldKind, FormScan, Widget, OFF_STATE};

/// Ff bit 16: the button is a radio button
const FLAG_RADIO: i64 = 1 << 15;
/// Ff bit 17: the button is a push button
const FLAG_PUSHBUTTON: i64 = 1 << 16;

/// Scan all form widgets of a document
///
/// A document without a form container has no fields; that is not an error.
pub fn scan_widgets(doc: &FormDocument) -> FormScan {
    let mut scan = FormScan::new();
    if !doc.has_form() {
        tracing::debug!("Document has no AcroForm, nothing to scan");
        return scan;
    }

    for (page_num, page_id) in doc.pages() {
        for annot_id in doc.annotation_ids(page_id) {
            let Ok(annot) = doc.doc.get_dictionary(annot_id) else {
                continue;
            };
            if !is_widget(annot) {
                continue;
            }
            let Some(widget) = read_widget(doc, annot_id, annot, page_num) else {
                tracing::debug!("Skipping unnamed widget {:?} on page {}", annot_id, page_num);
                continue;
            };

            if let FieldKind::Radio { group } = &widget.kind {
                if let Some(parent_id) = parent_id(annot) {
                    let selected = doc
                        .doc
                        .get_dictionary(parent_id)
                        .ok()
                        .and_then(|parent| parent.get(b"V").ok())
                        .and_then(object_text)
                        .filter(|v| v != OFF_STATE);
                    scan.join_group(
                        ButtonGroup {
                            id: parent_id,
                            name: group.clone(),
                            selected,
                            members: Vec::new(),
                        },
                        annot_id,
                    );
                }
            }
            scan.push(widget);
        }
    }

    tracing::debug!(
        "Scanned {} widgets, {} radio groups",
        scan.len(),
        scan.groups().len()
    );
    scan
}

fn is_widget(annot: &Dictionary) -> bool {
    annot
        .get(b"Subtype")
        .and_then(Object::as_name)
        .map(|subtype| subtype == b"Widget")
        .unwrap_or(false)
}

fn parent_id(dict: &Dictionary) -> Option<ObjectId> {
    dict.get(b"Parent").and_then(Object::as_reference).ok()
}

fn field_name(dict: &Dictionary) -> Option<String> {
    dict.get(b"T")
        .ok()
        .and_then(object_text)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Look up an inheritable field attribute, walking up the `/Parent` chain
fn inherited<'a>(doc: &'a FormDocument, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = dict;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(doc.resolve(value));
        }
        current = doc.doc.get_dictionary(parent_id(current)?).ok()?;
    }
    None
}

fn field_type(doc: &FormDocument, dict: &Dictionary) -> Option<Vec<u8>> {
    inherited(doc, dict, b"FT")
        .and_then(|ft| ft.as_name().ok())
        .map(|ft| ft.to_vec())
}

fn field_flags(doc: &FormDocument, dict: &Dictionary) -> i64 {
    inherited(doc, dict, b"Ff")
        .and_then(|ff| ff.as_i64().ok())
        .unwrap_or(0)
}

/// A parent groups radio buttons when it is a button field owning several
/// kids or explicitly flagged as a radio field
fn radio_group_name(doc: &FormDocument, parent: &Dictionary) -> Option<String> {
    if field_type(doc, parent).as_deref() != Some(b"Btn".as_slice()) {
        return None;
    }
    let kids = parent
        .get(b"Kids")
        .ok()
        .map(|kids| doc.resolve(kids))
        .and_then(|kids| kids.as_array().ok())
        .map(|kids| kids.len())
        .unwrap_or(0);
    let flagged = field_flags(doc, parent) & FLAG_RADIO != 0;
    if kids > 1 || (kids > 0 && flagged) {
        field_name(parent)
    } else {
        None
    }
}

fn read_widget(
    doc: &FormDocument,
    annot_id: ObjectId,
    annot: &Dictionary,
    page: u32,
) -> Option<Widget> {
    let ft = field_type(doc, annot);
    let is_button = ft.as_deref() == Some(b"Btn".as_slice());
    let parent = parent_id(annot).and_then(|id| doc.doc.get_dictionary(id).ok().map(|d| (id, d)));

    let own_name = field_name(annot);
    let named = own_name.is_some();
    let (name, field_id, field_dict) = match (own_name, parent) {
        (Some(name), _) => (name, annot_id, annot),
        (None, Some((id, parent))) if is_button => (field_name(parent)?, id, parent),
        _ => return None,
    };

    let kind = match ft.as_deref() {
        Some(b"Tx") => FieldKind::Text,
        Some(b"Ch") => FieldKind::Choice,
        Some(b"Btn") => {
            let group = parent.and_then(|(_, parent)| radio_group_name(doc, parent));
            if field_flags(doc, annot) & FLAG_PUSHBUTTON != 0 {
                FieldKind::Other
            } else if let Some(group) = group {
                FieldKind::Radio { group }
            } else {
                FieldKind::Checkbox
            }
        }
        _ => FieldKind::Other,
    };

    let options = match kind {
        FieldKind::Choice => choice_options(doc, field_dict),
        _ => Vec::new(),
    };

    // A radio kid's tooltip describes its option, the group's describes the question
    let tooltip_source = match kind {
        FieldKind::Radio { .. } => annot,
        _ => field_dict,
    };

    Some(Widget {
        id: annot_id,
        field_id,
        page,
        name,
        tooltip: tooltip_source.get(b"TU").ok().and_then(object_text),
        value: field_dict.get(b"V").ok().map(|v| doc.resolve(v)).and_then(object_text),
        appearance_state: annot.get(b"AS").ok().and_then(object_text),
        on_states: on_states(doc, annot),
        options,
        kind,
        named,
    })
}

/// Keys of the normal appearance dictionary, minus `Off`
fn on_states(doc: &FormDocument, annot: &Dictionary) -> Vec<String> {
    doc.resolve_dict(annot, b"AP")
        .and_then(|ap| doc.resolve_dict(ap, b"N"))
        .map(|normal| {
            normal
                .iter()
                .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
                .filter(|key| key != OFF_STATE)
                .collect()
        })
        .unwrap_or_default()
}

/// `/Opt` entries are either strings or `[export display]` pairs
fn choice_options(doc: &FormDocument, dict: &Dictionary) -> Vec<String> {
    let Some(Object::Array(entries)) = inherited(doc, dict, b"Opt") else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match doc.resolve(entry) {
            Object::Array(pair) => pair.first().and_then(object_text),
            other => object_text(other),
        })
        .collect()
}
