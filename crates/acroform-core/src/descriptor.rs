//! UI-neutral field descriptors
//!
//! A descriptor is the read projection of a widget that a form renderer
//! needs: its kind, the name to submit under, a label and the current value.
//! Descriptors are rebuilt on every read and never written back.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::widget::{FieldKind, FormScan, Widget, OFF_STATE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldDescriptor {
    Text {
        name: String,
        label: String,
        value: Option<String>,
    },
    Checkbox {
        name: String,
        label: String,
        /// On-state identifier when checked, `Off` otherwise
        value: String,
        checked: bool,
    },
    /// One option of a radio group
    Radio {
        group: String,
        name: String,
        label: String,
        selected: bool,
    },
    Choice {
        name: String,
        label: String,
        options: Vec<String>,
        value: Option<String>,
    },
}

impl FieldDescriptor {
    /// Name the value is submitted under; radio options submit under their group
    pub fn submit_name(&self) -> &str {
        match self {
            FieldDescriptor::Radio { group, .. } => group,
            FieldDescriptor::Text { name, .. }
            | FieldDescriptor::Checkbox { name, .. }
            | FieldDescriptor::Choice { name, .. } => name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FieldDescriptor::Text { label, .. }
            | FieldDescriptor::Checkbox { label, .. }
            | FieldDescriptor::Radio { label, .. }
            | FieldDescriptor::Choice { label, .. } => label,
        }
    }

    pub fn is_checkbox(&self) -> bool {
        matches!(self, FieldDescriptor::Checkbox { .. })
    }
}

/// Project one widget into a descriptor
///
/// `selections` maps radio group names to their selected export value.
/// Unrecognized field kinds fall back to an empty text descriptor so they
/// stay editable instead of disappearing from the form.
pub fn describe(widget: &Widget, selections: &BTreeMap<String, String>) -> FieldDescriptor {
    match &widget.kind {
        FieldKind::Text => FieldDescriptor::Text {
            name: widget.name.clone(),
            label: widget.label().to_string(),
            value: widget.value.clone(),
        },
        FieldKind::Checkbox => {
            let checked = widget.is_checked();
            let value = if checked {
                match widget.value.as_deref() {
                    Some(v) if v != OFF_STATE => v.to_string(),
                    _ => widget
                        .appearance_state
                        .clone()
                        .filter(|state| state != OFF_STATE)
                        .unwrap_or_else(|| widget.on_state().to_string()),
                }
            } else {
                OFF_STATE.to_string()
            };
            FieldDescriptor::Checkbox {
                name: widget.name.clone(),
                label: widget.label().to_string(),
                value,
                checked,
            }
        }
        FieldKind::Radio { group } => {
            let option = widget.radio_option().to_string();
            let selected = match (selections.get(group), &widget.appearance_state) {
                (Some(selection), Some(state)) => selection == state,
                _ => false,
            };
            FieldDescriptor::Radio {
                group: group.clone(),
                label: widget.tooltip.clone().unwrap_or_else(|| option.clone()),
                name: option,
                selected,
            }
        }
        FieldKind::Choice => FieldDescriptor::Choice {
            name: widget.name.clone(),
            label: widget.label().to_string(),
            options: widget.options.clone(),
            value: widget.value.clone(),
        },
        FieldKind::Other => {
            tracing::debug!(
                "Field '{}' has no editable kind, describing it as text",
                widget.name
            );
            FieldDescriptor::Text {
                name: widget.name.clone(),
                label: widget.label().to_string(),
                value: None,
            }
        }
    }
}

/// Describe every field of a scan, once each
///
/// Radio options are surfaced once per `(group, option)` pair, all other
/// fields once per name, keeping the first widget seen.
pub fn describe_all(scan: &FormScan) -> Vec<FieldDescriptor> {
    let selections = scan.selections();
    let mut seen_names = HashSet::new();
    let mut seen_options = HashSet::new();

    scan.widgets()
        .iter()
        .filter(|widget| match widget.group() {
            Some(group) => seen_options.insert((group.to_string(), widget.radio_option().to_string())),
            None => seen_names.insert(widget.name.clone()),
        })
        .map(|widget| describe(widget, &selections))
        .collect()
}
