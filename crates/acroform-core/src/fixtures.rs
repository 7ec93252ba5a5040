//! In-memory PDF fixtures for tests
//!
//! Builds small documents with the field shapes found in real AcroForms:
//! merged field/widget dictionaries, radio groups whose kids inherit type and
//! name from their parent, single-kid checkboxes, choice lists, signatures
//! and plain (non-widget) annotations.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::text::encode_text;

const FLAG_RADIO: i64 = 1 << 15;
const FLAG_PUSHBUTTON: i64 = 1 << 16;

pub struct FixtureBuilder {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    annots: Vec<Vec<Object>>,
    fields: Vec<ObjectId>,
    with_form: bool,
    next_y: f32,
    appearance: ObjectId,
}

impl FixtureBuilder {
    /// Document with `page_count` pages of the given size and an empty form
    pub fn new(page_count: usize, (width, height): (f64, f64)) -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let page_ids: Vec<ObjectId> = (0..page_count)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => Object::Reference(pages_id),
                    "MediaBox" => vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(width as f32),
                        Object::Real(height as f32),
                    ],
                })
            })
            .collect();

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
                "Count" => page_count as i64,
            }),
        );

        let appearance = doc.add_object(Stream::new(dictionary! {}, Vec::new()));

        Self {
            doc,
            pages_id,
            page_ids,
            annots: vec![Vec::new(); page_count],
            fields: Vec::new(),
            with_form: true,
            next_y: height as f32 - 60.0,
            appearance,
        }
    }

    /// Replace every page's media box, given as `[x1, y1, x2, y2]`
    pub fn media_box(mut self, corners: [f32; 4]) -> Self {
        for page_id in &self.page_ids {
            if let Ok(page) = self.doc.get_dictionary_mut(*page_id) {
                page.set(
                    "MediaBox",
                    corners.iter().map(|c| Object::Real(*c)).collect::<Vec<_>>(),
                );
            }
        }
        self
    }

    /// Leave the catalog without an `/AcroForm` entry
    pub fn without_form(mut self) -> Self {
        self.with_form = false;
        self
    }

    pub fn text_field(self, page: u32, name: &str, value: Option<&str>) -> Self {
        let mut dict = dictionary! {
            "FT" => "Tx",
            "T" => encode_text(name),
            "DA" => Object::string_literal("/Helv 10 Tf 0 g"),
        };
        if let Some(value) = value {
            dict.set("V", encode_text(value));
        }
        self.merged_field(page, dict)
    }

    pub fn text_field_with_tooltip(self, page: u32, name: &str, tooltip: &str) -> Self {
        self.merged_field(
            page,
            dictionary! {
                "FT" => "Tx",
                "T" => encode_text(name),
                "TU" => encode_text(tooltip),
            },
        )
    }

    /// Text field whose value is shown by several unnamed widget kids
    pub fn text_field_kids(mut self, page: u32, name: &str, kid_count: usize) -> Self {
        let parent_id = self.doc.new_object_id();
        let kids: Vec<Object> = (0..kid_count)
            .map(|_| {
                let kid = self.widget(page, dictionary! { "Parent" => Object::Reference(parent_id) });
                Object::Reference(kid)
            })
            .collect();

        self.doc.objects.insert(
            parent_id,
            Object::Dictionary(dictionary! {
                "FT" => "Tx",
                "T" => encode_text(name),
                "Kids" => kids,
            }),
        );
        self.fields.push(parent_id);
        self
    }

    /// Checkbox whose field and widget share one dictionary
    pub fn checkbox(self, page: u32, name: &str, on_state: &str, checked: bool) -> Self {
        let state = if checked { on_state } else { "Off" };
        let ap = self.button_appearance(on_state);
        self.merged_field(
            page,
            dictionary! {
                "FT" => "Btn",
                "T" => encode_text(name),
                "V" => Object::Name(state.as_bytes().to_vec()),
                "AS" => Object::Name(state.as_bytes().to_vec()),
                "AP" => ap,
            },
        )
    }

    /// Checkbox field with a single unnamed widget kid
    pub fn checkbox_kid(mut self, page: u32, name: &str, on_state: &str, checked: bool) -> Self {
        let state = if checked { on_state } else { "Off" };
        let parent_id = self.doc.new_object_id();
        let kid = self.widget(
            page,
            dictionary! {
                "Parent" => Object::Reference(parent_id),
                "AS" => Object::Name(state.as_bytes().to_vec()),
                "AP" => self.button_appearance(on_state),
            },
        );
        self.doc.objects.insert(
            parent_id,
            Object::Dictionary(dictionary! {
                "FT" => "Btn",
                "T" => encode_text(name),
                "V" => Object::Name(state.as_bytes().to_vec()),
                "Kids" => vec![Object::Reference(kid)],
            }),
        );
        self.fields.push(parent_id);
        self
    }

    /// Radio group whose unnamed kids are told apart by their on-states
    pub fn radio_group(
        mut self,
        page: u32,
        group: &str,
        options: &[&str],
        selected: Option<&str>,
    ) -> Self {
        let parent_id = self.doc.new_object_id();
        let kids: Vec<Object> = options
            .iter()
            .map(|option| {
                let state = if selected == Some(*option) { *option } else { "Off" };
                let kid = self.widget(
                    page,
                    dictionary! {
                        "Parent" => Object::Reference(parent_id),
                        "AS" => Object::Name(state.as_bytes().to_vec()),
                        "AP" => self.button_appearance(option),
                    },
                );
                Object::Reference(kid)
            })
            .collect();

        self.doc.objects.insert(
            parent_id,
            Object::Dictionary(dictionary! {
                "FT" => "Btn",
                "Ff" => FLAG_RADIO,
                "T" => encode_text(group),
                "V" => Object::Name(selected.unwrap_or("Off").as_bytes().to_vec()),
                "Kids" => kids,
            }),
        );
        self.fields.push(parent_id);
        self
    }

    /// Radio group with a tooltip on the group and, optionally, on each kid
    pub fn radio_group_with_tooltips(
        mut self,
        page: u32,
        group: &str,
        group_tooltip: &str,
        options: &[(&str, Option<&str>)],
    ) -> Self {
        let parent_id = self.doc.new_object_id();
        let kids: Vec<Object> = options
            .iter()
            .map(|(option, tooltip)| {
                let mut dict = dictionary! {
                    "Parent" => Object::Reference(parent_id),
                    "AS" => "Off",
                    "AP" => self.button_appearance(option),
                };
                if let Some(tooltip) = tooltip {
                    dict.set("TU", encode_text(tooltip));
                }
                Object::Reference(self.widget(page, dict))
            })
            .collect();

        self.doc.objects.insert(
            parent_id,
            Object::Dictionary(dictionary! {
                "FT" => "Btn",
                "Ff" => FLAG_RADIO,
                "T" => encode_text(group),
                "TU" => encode_text(group_tooltip),
                "V" => "Off",
                "Kids" => kids,
            }),
        );
        self.fields.push(parent_id);
        self
    }

    /// Radio group whose kids carry their own names; nothing is selected
    pub fn radio_group_named_kids(mut self, page: u32, group: &str, kids: &[(&str, &str)]) -> Self {
        let parent_id = self.doc.new_object_id();
        let kid_refs: Vec<Object> = kids
            .iter()
            .map(|(name, on_state)| {
                let kid = self.widget(
                    page,
                    dictionary! {
                        "Parent" => Object::Reference(parent_id),
                        "T" => encode_text(name),
                        "AS" => "Off",
                        "AP" => self.button_appearance(on_state),
                    },
                );
                Object::Reference(kid)
            })
            .collect();

        self.doc.objects.insert(
            parent_id,
            Object::Dictionary(dictionary! {
                "FT" => "Btn",
                "Ff" => FLAG_RADIO,
                "T" => encode_text(group),
                "V" => "Off",
                "Kids" => kid_refs,
            }),
        );
        self.fields.push(parent_id);
        self
    }

    pub fn choice(self, page: u32, name: &str, options: &[&str], value: Option<&str>) -> Self {
        let mut dict = dictionary! {
            "FT" => "Ch",
            "T" => encode_text(name),
            "Opt" => options.iter().map(|o| encode_text(o)).collect::<Vec<_>>(),
        };
        if let Some(value) = value {
            dict.set("V", encode_text(value));
        }
        self.merged_field(page, dict)
    }

    pub fn signature(self, page: u32, name: &str) -> Self {
        self.merged_field(
            page,
            dictionary! {
                "FT" => "Sig",
                "T" => encode_text(name),
            },
        )
    }

    pub fn push_button(self, page: u32, name: &str) -> Self {
        self.merged_field(
            page,
            dictionary! {
                "FT" => "Btn",
                "Ff" => FLAG_PUSHBUTTON,
                "T" => encode_text(name),
            },
        )
    }

    /// A sticky note, which is an annotation but not a widget
    pub fn note_annotation(mut self, page: u32, contents: &str) -> Self {
        let rect = self.next_rect();
        let id = self.doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Text",
            "Contents" => encode_text(contents),
            "Rect" => rect,
        });
        self.annots[page as usize - 1].push(Object::Reference(id));
        self
    }

    /// Serialize the document
    pub fn build(mut self) -> Vec<u8> {
        for (page_id, annots) in self.page_ids.iter().zip(self.annots) {
            if annots.is_empty() {
                continue;
            }
            if let Ok(page) = self.doc.get_dictionary_mut(*page_id) {
                page.set("Annots", Object::Array(annots));
            }
        }

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(self.pages_id),
        };
        if self.with_form {
            let fields: Vec<Object> = self.fields.iter().map(|id| Object::Reference(*id)).collect();
            catalog.set("AcroForm", dictionary! { "Fields" => fields });
        }
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .expect("fixture document serializes");
        buffer
    }

    fn merged_field(mut self, page: u32, dict: Dictionary) -> Self {
        let id = self.widget(page, dict);
        self.fields.push(id);
        self
    }

    /// Add a widget annotation to a page
    fn widget(&mut self, page: u32, mut dict: Dictionary) -> ObjectId {
        dict.set("Type", "Annot");
        dict.set("Subtype", "Widget");
        dict.set("Rect", self.next_rect());
        let id = self.doc.add_object(dict);
        self.annots[page as usize - 1].push(Object::Reference(id));
        id
    }

    fn button_appearance(&self, on_state: &str) -> Dictionary {
        let mut normal = Dictionary::new();
        normal.set(on_state.as_bytes().to_vec(), Object::Reference(self.appearance));
        normal.set("Off", Object::Reference(self.appearance));
        dictionary! { "N" => normal }
    }

    fn next_rect(&mut self) -> Vec<Object> {
        let y = self.next_y;
        self.next_y -= 30.0;
        vec![
            Object::Real(50.0),
            Object::Real(y),
            Object::Real(250.0),
            Object::Real(y + 20.0),
        ]
    }
}
