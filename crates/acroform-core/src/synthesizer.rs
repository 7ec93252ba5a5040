//! Field synthesis from designer templates
//!
//! Turns rectangles marked on rendered page images into new text field
//! widgets on the corresponding pages.

use lopdf::{dictionary, Object, ObjectId};

use crate::coords::{pixel_to_pdf, MediaBox};
use crate::document::FormDocument;
use crate::error::FormError;
use crate::scanner::scan_widgets;
use crate::template::{FieldSpec, Template, TemplateFieldType};
use crate::text::encode_text;

/// Default appearance of synthesized fields: Helvetica 10pt, black
pub const DEFAULT_APPEARANCE: &str = "/Helv 10 Tf 0 g";

/// Annotation flag bit 3: print the annotation
const ANNOT_FLAG_PRINT: i64 = 4;

/// Add one text field per template spec to the document
///
/// Every spec is validated before the first object is written; an invalid
/// template leaves the document as it was. Returns the new widget IDs in
/// template order.
pub fn synthesize_fields(
    doc: &mut FormDocument,
    template: &Template,
    zoom: f64,
) -> Result<Vec<ObjectId>, FormError> {
    template.validate(doc.page_count())?;
    if !zoom.is_finite() || zoom <= 0.0 {
        return Err(FormError::InvalidTemplate(format!(
            "render zoom must be positive, got {}",
            zoom
        )));
    }

    // Parents with unnamed widget kids only show up in the field tree
    let mut taken = doc.field_names();
    taken.extend(scan_widgets(doc).names().into_iter().map(str::to_string));
    if let Some(spec) = template
        .fields
        .iter()
        .find(|spec| taken.contains(&spec.name))
    {
        return Err(FormError::FieldNameConflict(spec.name.clone()));
    }

    let mut placements = Vec::with_capacity(template.fields.len());
    for spec in &template.fields {
        let page_id = doc.page_id(spec.page).ok_or_else(|| {
            FormError::InvalidTemplate(format!("page {} not found", spec.page))
        })?;
        let mut media_box = doc.media_box(spec.page)?;
        if let Some((width, height)) = template.page_size(spec.page) {
            media_box[2] = width;
            media_box[3] = height;
        }
        placements.push((spec, page_id, media_box));
    }

    let mut widget_ids = Vec::with_capacity(placements.len());
    for (spec, page_id, media_box) in placements {
        let widget_id = add_widget(doc, spec, page_id, media_box, zoom)?;
        widget_ids.push(widget_id);
    }

    doc.register_fields(&widget_ids)?;
    doc.set_need_appearances()?;
    tracing::info!("Synthesized {} form fields", widget_ids.len());
    Ok(widget_ids)
}

fn add_widget(
    doc: &mut FormDocument,
    spec: &FieldSpec,
    page_id: ObjectId,
    media_box: MediaBox,
    zoom: f64,
) -> Result<ObjectId, FormError> {
    let rect = pixel_to_pdf(spec.x, spec.y, spec.w, spec.h, media_box, zoom);
    let [x1, y1, x2, y2] = rect.to_array();

    let field_type = match spec.field_type {
        TemplateFieldType::Text => "Tx",
    };

    let widget = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => field_type,
        "T" => encode_text(&spec.name),
        "V" => Object::string_literal(""),
        "Ff" => 0,
        "DA" => Object::string_literal(DEFAULT_APPEARANCE),
        "Rect" => vec![
            Object::Real(x1 as f32),
            Object::Real(y1 as f32),
            Object::Real(x2 as f32),
            Object::Real(y2 as f32),
        ],
        "F" => ANNOT_FLAG_PRINT,
        "P" => Object::Reference(page_id),
    };

    let widget_id = doc.doc.add_object(Object::Dictionary(widget));
    doc.push_annotation(page_id, widget_id)?;
    tracing::debug!(
        "Placed field '{}' on page {} at [{:.1} {:.1} {:.1} {:.1}]",
        spec.name,
        spec.page,
        x1,
        y1,
        x2,
        y2
    );
    Ok(widget_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FixtureBuilder;
    use crate::text::object_text;
    use crate::widget::FieldKind;

    fn spec(page: u32, x: f64, y: f64, name: &str) -> FieldSpec {
        FieldSpec {
            page,
            x,
            y,
            w: 180.0,
            h: 20.0,
            name: name.to_string(),
            field_type: TemplateFieldType::Text,
        }
    }

    fn a4_template(fields: Vec<FieldSpec>, pages: usize) -> Template {
        Template {
            fields,
            page_sizes: vec![(595.0, 842.0); pages],
        }
    }

    fn rect_of(doc: &FormDocument, id: ObjectId) -> Vec<f32> {
        doc.inner()
            .get_dictionary(id)
            .unwrap()
            .get(b"Rect")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_float().unwrap())
            .collect()
    }

    #[test]
    fn test_synthesizes_text_field_at_flipped_position() {
        let bytes = FixtureBuilder::new(1, (595.0, 842.0)).without_form().build();
        let mut doc = FormDocument::from_bytes(&bytes).unwrap();
        let template = a4_template(vec![spec(1, 100.0, 50.0, "kunde_name")], 1);

        let ids = synthesize_fields(&mut doc, &template, 2.0).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(rect_of(&doc, ids[0]), vec![50.0, 797.0, 230.0, 817.0]);
        assert!(doc.need_appearances());

        let reopened = FormDocument::from_bytes(&doc.save().unwrap()).unwrap();
        let scan = scan_widgets(&reopened);
        let field = scan.field("kunde_name").unwrap();
        assert_eq!(field.kind, FieldKind::Text);
        assert_eq!(field.value.as_deref(), Some(""));
        assert_eq!(field.page, 1);
    }

    #[test]
    fn test_widget_carries_appearance_and_flags() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0)).without_form().build();
        let mut doc = FormDocument::from_bytes(&bytes).unwrap();
        let template = a4_template(vec![spec(1, 10.0, 10.0, "ort")], 1);

        let ids = synthesize_fields(&mut doc, &template, 1.0).unwrap();
        let widget = doc.inner().get_dictionary(ids[0]).unwrap();
        assert_eq!(widget.get(b"F").unwrap().as_i64().unwrap(), 4);
        assert_eq!(widget.get(b"Ff").unwrap().as_i64().unwrap(), 0);
        assert_eq!(
            object_text(widget.get(b"DA").unwrap()).as_deref(),
            Some(DEFAULT_APPEARANCE)
        );
        assert_eq!(widget.get(b"P").unwrap().as_reference().unwrap(), doc.page_id(1).unwrap());
    }

    #[test]
    fn test_empty_template_leaves_document_unchanged() {
        let bytes = FixtureBuilder::new(1, (595.0, 842.0)).without_form().build();
        let mut doc = FormDocument::from_bytes(&bytes).unwrap();
        let objects_before = doc.inner().objects.len();

        let result = synthesize_fields(&mut doc, &a4_template(Vec::new(), 1), 2.0);
        assert!(matches!(result, Err(FormError::EmptyTemplate)));
        assert_eq!(doc.inner().objects.len(), objects_before);
        assert!(!doc.has_form());
    }

    #[test]
    fn test_fields_accumulate_beside_existing_annotations() {
        let bytes = FixtureBuilder::new(2, (595.0, 842.0))
            .without_form()
            .note_annotation(1, "Keep me")
            .build();
        let mut doc = FormDocument::from_bytes(&bytes).unwrap();
        let template = a4_template(
            vec![
                spec(1, 100.0, 50.0, "vorname"),
                spec(1, 100.0, 120.0, "nachname"),
                spec(2, 100.0, 50.0, "datum"),
            ],
            2,
        );

        synthesize_fields(&mut doc, &template, 2.0).unwrap();

        let page_one = doc.annotation_ids(doc.page_id(1).unwrap());
        let page_two = doc.annotation_ids(doc.page_id(2).unwrap());
        assert_eq!(page_one.len(), 3);
        assert_eq!(page_two.len(), 1);

        let note = doc.inner().get_dictionary(page_one[0]).unwrap();
        assert_eq!(note.get(b"Subtype").unwrap().as_name().unwrap(), b"Text");

        let scan = scan_widgets(&doc);
        let names: Vec<&str> = scan.names().into_iter().collect();
        assert_eq!(names, vec!["datum", "nachname", "vorname"]);
    }

    #[test]
    fn test_rejects_name_of_existing_field() {
        let bytes = FixtureBuilder::new(1, (595.0, 842.0))
            .text_field(1, "kunde_name", None)
            .build();
        let mut doc = FormDocument::from_bytes(&bytes).unwrap();
        let template = a4_template(vec![spec(1, 0.0, 0.0, "kunde_name")], 1);

        let result = synthesize_fields(&mut doc, &template, 2.0);
        assert!(matches!(result, Err(FormError::FieldNameConflict(name)) if name == "kunde_name"));
    }

    #[test]
    fn test_rejects_name_of_parent_with_unnamed_kids() {
        let bytes = FixtureBuilder::new(1, (595.0, 842.0))
            .text_field_kids(1, "address", 2)
            .build();
        let mut doc = FormDocument::from_bytes(&bytes).unwrap();
        let objects_before = doc.inner().objects.len();
        let template = a4_template(vec![spec(1, 0.0, 0.0, "address")], 1);

        let result = synthesize_fields(&mut doc, &template, 2.0);
        assert!(matches!(result, Err(FormError::FieldNameConflict(name)) if name == "address"));
        assert_eq!(doc.inner().objects.len(), objects_before);
    }

    #[test]
    fn test_padded_name_does_not_slip_past_existing_field() {
        let bytes = FixtureBuilder::new(1, (595.0, 842.0))
            .text_field(1, "address", None)
            .build();
        let mut doc = FormDocument::from_bytes(&bytes).unwrap();
        let template = a4_template(vec![spec(1, 0.0, 0.0, "address ")], 1);

        let result = synthesize_fields(&mut doc, &template, 2.0);
        assert!(matches!(result, Err(FormError::InvalidTemplate(_))));
        assert_eq!(scan_widgets(&doc).len(), 1);
    }

    #[test]
    fn test_media_box_origin_shifts_placement() {
        let bytes = FixtureBuilder::new(1, (595.0, 842.0))
            .without_form()
            .media_box([30.0, 40.0, 625.0, 882.0])
            .build();
        let mut doc = FormDocument::from_bytes(&bytes).unwrap();
        let template = a4_template(vec![spec(1, 100.0, 50.0, "kunde_name")], 1);

        let ids = synthesize_fields(&mut doc, &template, 2.0).unwrap();
        assert_eq!(rect_of(&doc, ids[0]), vec![80.0, 837.0, 260.0, 857.0]);
    }

    #[test]
    fn test_rejects_non_positive_zoom() {
        let bytes = FixtureBuilder::new(1, (595.0, 842.0)).without_form().build();
        let mut doc = FormDocument::from_bytes(&bytes).unwrap();
        let template = a4_template(vec![spec(1, 0.0, 0.0, "a")], 1);
        assert!(matches!(
            synthesize_fields(&mut doc, &template, 0.0),
            Err(FormError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_missing_page_size_falls_back_to_media_box() {
        let bytes = FixtureBuilder::new(1, (612.0, 792.0)).without_form().build();
        let mut doc = FormDocument::from_bytes(&bytes).unwrap();
        let template = Template {
            fields: vec![spec(1, 0.0, 0.0, "oben")],
            page_sizes: Vec::new(),
        };

        let ids = synthesize_fields(&mut doc, &template, 2.0).unwrap();
        assert_eq!(rect_of(&doc, ids[0]), vec![0.0, 772.0, 180.0, 792.0]);
    }

    #[test]
    fn test_synthesized_fields_are_registered_in_form() {
        let bytes = FixtureBuilder::new(1, (595.0, 842.0)).without_form().build();
        let mut doc = FormDocument::from_bytes(&bytes).unwrap();
        let template = a4_template(vec![spec(1, 0.0, 0.0, "a"), spec(1, 0.0, 100.0, "b")], 1);
        let ids = synthesize_fields(&mut doc, &template, 2.0).unwrap();

        let root_id = doc.inner().trailer.get(b"Root").unwrap().as_reference().unwrap();
        let catalog = doc.inner().get_dictionary(root_id).unwrap();
        let form = doc.resolve_dict(catalog, b"AcroForm").unwrap();
        let fields: Vec<ObjectId> = form
            .get(b"Fields")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f.as_reference().unwrap())
            .collect();
        assert_eq!(fields, ids);
    }
}
