//! Typed widget records produced by the scanner

use std::collections::{BTreeMap, BTreeSet, HashMap};

use lopdf::ObjectId;

/// Appearance state every button declares for its unselected look
pub const OFF_STATE: &str = "Off";

/// On-state used when a button declares no appearance states of its own
pub const DEFAULT_ON_STATE: &str = "Yes";

/// Field kind, decided once at scan time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Checkbox,
    /// Member of the button group registered under `group`
    Radio { group: String },
    Choice,
    /// Push buttons, signatures and anything else without an editable value
    Other,
}

/// One widget annotation of a form field
#[derive(Debug, Clone)]
pub struct Widget {
    /// The widget annotation itself
    pub id: ObjectId,
    /// Node carrying `/T` and `/V`: the widget, or its parent for kids without a name
    pub field_id: ObjectId,
    /// Page number (1-indexed)
    pub page: u32,
    /// Own `/T`, or the parent's `/T` for unnamed button kids
    pub name: String,
    pub kind: FieldKind,
    /// Alternate name (`/TU`), taken from the kid itself for radio members
    pub tooltip: Option<String>,
    /// Current `/V` of the field node
    pub value: Option<String>,
    /// Current `/AS` of the widget
    pub appearance_state: Option<String>,
    /// Keys of `/AP /N` other than `Off`, in declaration order
    pub on_states: Vec<String>,
    /// Choice options (`/Opt` export values)
    pub options: Vec<String>,
    /// True when `name` is the widget's own `/T`
    pub(crate) named: bool,
}

impl Widget {
    /// Identifier of the "on" appearance state
    pub fn on_state(&self) -> &str {
        self.on_states
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_ON_STATE)
    }

    /// Radio group name, for group members
    pub fn group(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Radio { group } => Some(group),
            _ => None,
        }
    }

    /// Option name a radio submission selects this member by
    ///
    /// Members with their own `/T` are addressed by it, unnamed kids by
    /// their on-state identifier.
    pub fn radio_option(&self) -> &str {
        if self.named && self.group() != Some(self.name.as_str()) {
            &self.name
        } else {
            self.on_state()
        }
    }

    /// Checkbox state: the stored value wins, the appearance state decides otherwise
    pub fn is_checked(&self) -> bool {
        match (&self.value, &self.appearance_state) {
            (Some(value), _) => value != OFF_STATE,
            (None, Some(state)) => state != OFF_STATE,
            (None, None) => false,
        }
    }

    /// Label shown to users: the tooltip when present, the field name otherwise
    pub fn label(&self) -> &str {
        self.tooltip.as_deref().unwrap_or(&self.name)
    }
}

/// A radio group's shared field node and its members
#[derive(Debug, Clone)]
pub struct ButtonGroup {
    /// The parent field node owning the shared `/V`
    pub id: ObjectId,
    pub name: String,
    /// Export value currently selected, `None` when the group is off
    pub selected: Option<String>,
    /// Member widget IDs in scan order
    pub members: Vec<ObjectId>,
}

/// Result of scanning a document's annotation tree
#[derive(Debug, Clone, Default)]
pub struct FormScan {
    widgets: Vec<Widget>,
    index: HashMap<String, usize>,
    groups: BTreeMap<String, ButtonGroup>,
}

impl FormScan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a widget; the first widget seen under a name stays addressable by it
    pub fn push(&mut self, widget: Widget) {
        self.index
            .entry(widget.name.clone())
            .or_insert(self.widgets.len());
        self.widgets.push(widget);
    }

    /// Register a group member, creating the group on first sight
    pub fn join_group(&mut self, group: ButtonGroup, member: ObjectId) {
        self.groups
            .entry(group.name.clone())
            .or_insert(group)
            .members
            .push(member);
    }

    /// Every scanned widget in document order
    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    /// First widget seen under a name
    pub fn field(&self, name: &str) -> Option<&Widget> {
        self.index.get(name).map(|&i| &self.widgets[i])
    }

    /// Distinct field names
    pub fn names(&self) -> BTreeSet<&str> {
        self.index.keys().map(String::as_str).collect()
    }

    pub fn groups(&self) -> &BTreeMap<String, ButtonGroup> {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&ButtonGroup> {
        self.groups.get(name)
    }

    /// The member a submitted option switches on
    ///
    /// When several members offer the same option, the first one in scan
    /// order wins so that at most one member of a group is ever on.
    pub fn chosen_member(&self, group: &str, option: &str) -> Option<ObjectId> {
        self.groups.get(group)?.members.iter().copied().find(|id| {
            self.widgets
                .iter()
                .any(|w| w.id == *id && w.radio_option() == option)
        })
    }

    /// Group name to currently selected export value
    pub fn selections(&self) -> BTreeMap<String, String> {
        self.groups
            .values()
            .filter_map(|g| g.selected.clone().map(|s| (g.name.clone(), s)))
            .collect()
    }

    /// True when a submitted name addresses a field or a group
    pub fn addresses(&self, name: &str) -> bool {
        self.index.contains_key(name) || self.groups.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }
}
