//! Apply submitted values back onto form widgets
//!
//! Text and choice fields take the submitted string as is. Checkboxes switch
//! their value and appearance state together. Radio members are driven by the
//! value submitted under their group's name; only the first member offering
//! that value is switched on.

use std::collections::BTreeMap;

use lopdf::{Object, ObjectId};

use crate::descriptor::FieldDescriptor;
use crate::document::FormDocument;
use crate::error::FormError;
use crate::scanner::scan_widgets;
use crate::text::encode_text;
use crate::widget::{FieldKind, FormScan, Widget, OFF_STATE};

/// Submitted values keyed by field (or radio group) name
pub type FieldValues = BTreeMap<String, String>;

/// Spellings a checkbox submission uses for "checked"
const AFFIRMATIVE: &[&str] = &[
    "Yes", "yes", "YES", "On", "on", "ON", "1", "true", "True", "TRUE",
];

/// What an apply pass changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplySummary {
    /// Widgets whose value or appearance state was written
    pub updated: usize,
    /// Submitted names that match no field or group
    pub ignored: Vec<String>,
}

/// Complete a browser submission with the checkboxes it left out
///
/// An unchecked checkbox is never part of a form submission, so every
/// checkbox missing from `values` is recorded as `Off`.
pub fn mark_unchecked_boxes(descriptors: &[FieldDescriptor], values: &mut FieldValues) {
    for descriptor in descriptors.iter().filter(|d| d.is_checkbox()) {
        values
            .entry(descriptor.submit_name().to_string())
            .or_insert_with(|| OFF_STATE.to_string());
    }
}

/// Write submitted values into the document's widgets
///
/// Flags the document so viewers regenerate appearances. Applying the same
/// values twice leaves the document in the same state as applying them once.
pub fn apply_values(doc: &mut FormDocument, values: &FieldValues) -> Result<ApplySummary, FormError> {
    let scan = scan_widgets(doc);
    let mut summary = ApplySummary::default();

    clear_unmatched_groups(doc, &scan, values)?;

    for widget in scan.widgets() {
        let written = match &widget.kind {
            FieldKind::Text | FieldKind::Choice => match values.get(&widget.name) {
                Some(value) => {
                    set_entry(doc, widget.field_id, "V", encode_text(value))?;
                    true
                }
                None => false,
            },
            FieldKind::Checkbox => match values.get(&widget.name) {
                Some(value) => {
                    apply_checkbox(doc, widget, value)?;
                    true
                }
                None => false,
            },
            FieldKind::Radio { group } => match values.get(group) {
                Some(value) => {
                    apply_radio(doc, &scan, widget, group, value)?;
                    true
                }
                None => false,
            },
            FieldKind::Other => false,
        };
        if written {
            summary.updated += 1;
        }
    }

    summary.ignored = values
        .keys()
        .filter(|name| !scan.addresses(name))
        .cloned()
        .collect();
    for name in &summary.ignored {
        tracing::debug!("Ignoring submitted value for unknown field '{}'", name);
    }

    doc.set_need_appearances()?;
    tracing::info!(
        "Applied values to {} widgets ({} submitted names ignored)",
        summary.updated,
        summary.ignored.len()
    );
    Ok(summary)
}

fn is_affirmative(value: &str, on_state: &str) -> bool {
    AFFIRMATIVE.contains(&value) || value == on_state
}

fn apply_checkbox(doc: &mut FormDocument, widget: &Widget, value: &str) -> Result<(), FormError> {
    let state = if is_affirmative(value, widget.on_state()) {
        widget.on_state()
    } else {
        OFF_STATE
    };
    set_entry(doc, widget.field_id, "V", name_object(state))?;
    set_entry(doc, widget.id, "AS", name_object(state))
}

fn apply_radio(
    doc: &mut FormDocument,
    scan: &FormScan,
    widget: &Widget,
    group: &str,
    value: &str,
) -> Result<(), FormError> {
    if scan.chosen_member(group, value) == Some(widget.id) {
        if let Some(group) = scan.group(group) {
            set_entry(doc, group.id, "V", name_object(widget.on_state()))?;
        }
        set_entry(doc, widget.id, "AS", name_object(widget.on_state()))
    } else {
        set_entry(doc, widget.id, "AS", name_object(OFF_STATE))
    }
}

/// A group whose submitted value names none of its members ends up off
fn clear_unmatched_groups(
    doc: &mut FormDocument,
    scan: &FormScan,
    values: &FieldValues,
) -> Result<(), FormError> {
    for (name, group) in scan.groups() {
        let Some(value) = values.get(name) else {
            continue;
        };
        if scan.chosen_member(name, value).is_none() {
            tracing::debug!("No member of radio group '{}' matches '{}'", name, value);
            set_entry(doc, group.id, "V", name_object(OFF_STATE))?;
        }
    }
    Ok(())
}

fn name_object(name: &str) -> Object {
    Object::Name(name.as_bytes().to_vec())
}

fn set_entry(doc: &mut FormDocument, id: ObjectId, key: &str, value: Object) -> Result<(), FormError> {
    doc.doc.get_dictionary_mut(id)?.set(key, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::describe_all;
    use crate::fixtures::FixtureBuilder;
    use pretty_assertions::assert_eq;

    fn values(pairs: &[(&str, &str)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn apply_and_rescan(bytes: &[u8], submitted: &FieldValues) -> (FormScan, Vec<u8>) {
        let mut doc = FormDocument::from_bytes(bytes).unwrap();
        apply_values(&mut doc, submitted).unwrap();
        let out = doc.save().unwrap();
        let reopened = FormDocument::from_bytes(&out).unwrap();
        (scan_widgets(&reopened), out)
    }

    fn radio_states(scan: &FormScan) -> Vec<Option<String>> {
        scan.widgets()
            .iter()
            .map(|w| w.appearance_state.clone())
            .collect()
    }

    #[test]
    fn test_text_and_checkbox_are_written() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0))
            .text_field(1, "name", Some("Alice"))
            .checkbox(1, "subscribe", "Yes", false)
            .build();
        let (scan, _) = apply_and_rescan(&bytes, &values(&[("name", "Bob"), ("subscribe", "Yes")]));

        assert_eq!(scan.field("name").unwrap().value.as_deref(), Some("Bob"));
        let subscribe = scan.field("subscribe").unwrap();
        assert_eq!(subscribe.value.as_deref(), Some("Yes"));
        assert_eq!(subscribe.appearance_state.as_deref(), Some("Yes"));
    }

    #[test]
    fn test_checkbox_uses_declared_on_state() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0))
            .checkbox(1, "agb", "Ja", false)
            .build();
        let (scan, _) = apply_and_rescan(&bytes, &values(&[("agb", "true")]));
        assert_eq!(scan.field("agb").unwrap().value.as_deref(), Some("Ja"));
        assert_eq!(scan.field("agb").unwrap().appearance_state.as_deref(), Some("Ja"));
    }

    #[test]
    fn test_absent_checkbox_is_switched_off() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0))
            .checkbox(1, "subscribe", "Yes", true)
            .text_field(1, "name", None)
            .build();
        let doc = FormDocument::from_bytes(&bytes).unwrap();
        let descriptors = describe_all(&scan_widgets(&doc));

        let mut submitted = values(&[("name", "Carol")]);
        mark_unchecked_boxes(&descriptors, &mut submitted);
        assert_eq!(submitted.get("subscribe").map(String::as_str), Some("Off"));

        let (scan, _) = apply_and_rescan(&bytes, &submitted);
        let subscribe = scan.field("subscribe").unwrap();
        assert_eq!(subscribe.value.as_deref(), Some("Off"));
        assert_eq!(subscribe.appearance_state.as_deref(), Some("Off"));
    }

    #[test]
    fn test_checkbox_kid_writes_value_on_parent() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0))
            .checkbox_kid(1, "newsletter", "On", false)
            .build();
        let (scan, _) = apply_and_rescan(&bytes, &values(&[("newsletter", "on")]));
        let widget = scan.field("newsletter").unwrap();
        assert_eq!(widget.value.as_deref(), Some("On"));
        assert_eq!(widget.appearance_state.as_deref(), Some("On"));
    }

    #[test]
    fn test_radio_selection_is_exclusive() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0))
            .radio_group(1, "payment", &["card", "invoice", "cash"], Some("card"))
            .build();
        let (scan, _) = apply_and_rescan(&bytes, &values(&[("payment", "cash")]));

        assert_eq!(
            radio_states(&scan),
            vec![
                Some("Off".to_string()),
                Some("Off".to_string()),
                Some("cash".to_string()),
            ]
        );
        assert_eq!(scan.group("payment").unwrap().selected.as_deref(), Some("cash"));
    }

    #[test]
    fn test_radio_unknown_option_turns_group_off() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0))
            .radio_group(1, "payment", &["card", "cash"], Some("card"))
            .build();
        let (scan, _) = apply_and_rescan(&bytes, &values(&[("payment", "bitcoin")]));

        assert_eq!(
            radio_states(&scan),
            vec![Some("Off".to_string()), Some("Off".to_string())]
        );
        assert_eq!(scan.group("payment").unwrap().selected, None);
    }

    #[test]
    fn test_radio_shared_on_state_selects_first_member_only() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0))
            .radio_group(1, "payment", &["card", "card", "cash"], Some("cash"))
            .build();
        let (scan, out) = apply_and_rescan(&bytes, &values(&[("payment", "card")]));

        assert_eq!(
            radio_states(&scan),
            vec![
                Some("card".to_string()),
                Some("Off".to_string()),
                Some("Off".to_string()),
            ]
        );
        assert_eq!(scan.group("payment").unwrap().selected.as_deref(), Some("card"));

        // A second pass keeps the same single member on
        let (again, _) = apply_and_rescan(&out, &values(&[("payment", "card")]));
        assert_eq!(radio_states(&again), radio_states(&scan));
    }

    #[test]
    fn test_radio_group_absent_from_submission_is_untouched() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0))
            .radio_group(1, "payment", &["card", "cash"], Some("card"))
            .build();
        let (scan, _) = apply_and_rescan(&bytes, &FieldValues::new());
        assert_eq!(scan.group("payment").unwrap().selected.as_deref(), Some("card"));
        assert_eq!(
            radio_states(&scan),
            vec![Some("card".to_string()), Some("Off".to_string())]
        );
    }

    #[test]
    fn test_named_radio_kids_are_selected_by_name() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0))
            .radio_group_named_kids(1, "size", &[("small", "1"), ("large", "2")])
            .build();
        let (scan, _) = apply_and_rescan(&bytes, &values(&[("size", "large")]));
        assert_eq!(
            radio_states(&scan),
            vec![Some("Off".to_string()), Some("2".to_string())]
        );
        assert_eq!(scan.group("size").unwrap().selected.as_deref(), Some("2"));
    }

    #[test]
    fn test_choice_accepts_value_outside_options() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0))
            .choice(1, "country", &["DE", "AT"], Some("DE"))
            .build();
        let (scan, _) = apply_and_rescan(&bytes, &values(&[("country", "FR")]));
        assert_eq!(scan.field("country").unwrap().value.as_deref(), Some("FR"));
    }

    #[test]
    fn test_unknown_names_are_reported_not_rejected() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0))
            .text_field(1, "name", None)
            .build();
        let mut doc = FormDocument::from_bytes(&bytes).unwrap();
        let summary = apply_values(&mut doc, &values(&[("name", "Dan"), ("csrf_token", "x")])).unwrap();
        assert_eq!(
            summary,
            ApplySummary {
                updated: 1,
                ignored: vec!["csrf_token".to_string()],
            }
        );
    }

    #[test]
    fn test_apply_sets_need_appearances() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0))
            .text_field(1, "name", None)
            .build();
        let mut doc = FormDocument::from_bytes(&bytes).unwrap();
        assert!(!doc.need_appearances());
        apply_values(&mut doc, &values(&[("name", "Eve")])).unwrap();
        assert!(doc.need_appearances());
    }

    #[test]
    fn test_apply_twice_is_idempotent() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0))
            .text_field(1, "name", Some("Alice"))
            .checkbox(1, "subscribe", "Yes", false)
            .radio_group(1, "payment", &["card", "cash"], None)
            .build();
        let submitted = values(&[("name", "Bob"), ("subscribe", "Yes"), ("payment", "cash")]);

        let (once, once_bytes) = apply_and_rescan(&bytes, &submitted);
        let (twice, _) = apply_and_rescan(&once_bytes, &submitted);

        assert_eq!(describe_all(&once), describe_all(&twice));
        assert_eq!(radio_states(&once), radio_states(&twice));
    }

    #[test]
    fn test_non_ascii_text_round_trips() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0))
            .text_field(1, "ort", None)
            .build();
        let (scan, _) = apply_and_rescan(&bytes, &values(&[("ort", "Köln")]));
        assert_eq!(scan.field("ort").unwrap().value.as_deref(), Some("Köln"));
    }
}
