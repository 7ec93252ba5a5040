//! AcroForm field scanning, filling and synthesis
//!
//! This crate reads the interactive form of a PDF using lopdf and offers
//! three operations on it:
//! - `scan_fields`: describe every fillable field for a form renderer
//! - `fill_document`: write submitted values back and return the new bytes
//! - `build_fillable`: add text fields from a designer template
//!
//! Each operation opens its own copy of the source bytes; the caller's bytes
//! are never modified and a failed operation produces no output.

pub mod applier;
pub mod coords;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod scanner;
pub mod synthesizer;
pub mod template;
pub mod text;
pub mod widget;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;

pub use applier::{apply_values, mark_unchecked_boxes, ApplySummary, FieldValues};
pub use coords::{pdf_to_pixel, pixel_to_pdf, MediaBox, PdfRect, DEFAULT_RENDER_ZOOM};
pub use descriptor::{describe_all, FieldDescriptor};
pub use document::FormDocument;
pub use error::FormError;
pub use scanner::scan_widgets;
pub use synthesizer::synthesize_fields;
pub use template::{FieldSpec, Template, TemplateFieldType};
pub use widget::{FieldKind, FormScan, Widget};

/// Describe the fillable fields of a PDF
pub fn scan_fields(bytes: &[u8]) -> Result<Vec<FieldDescriptor>, FormError> {
    let doc = FormDocument::from_bytes(bytes)?;
    Ok(describe_all(&scan_widgets(&doc)))
}

/// Fill a PDF's fields with submitted values
///
/// Checkboxes missing from `values` are switched off, matching how browsers
/// leave unchecked boxes out of a submission.
pub fn fill_document(bytes: &[u8], values: &FieldValues) -> Result<Vec<u8>, FormError> {
    let mut doc = FormDocument::from_bytes(bytes)?;
    let descriptors = describe_all(&scan_widgets(&doc));

    let mut values = values.clone();
    mark_unchecked_boxes(&descriptors, &mut values);

    apply_values(&mut doc, &values)?;
    doc.save()
}

/// Add the template's fields to a PDF and return the fillable document
pub fn build_fillable(bytes: &[u8], template: &Template, zoom: f64) -> Result<Vec<u8>, FormError> {
    if template.is_empty() {
        return Err(FormError::EmptyTemplate);
    }
    let mut doc = FormDocument::from_bytes(bytes)?;
    synthesize_fields(&mut doc, template, zoom)?;
    doc.save()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Filled,
    Fillable,
}

impl OutputKind {
    fn suffix(self) -> &'static str {
        match self {
            OutputKind::Filled => "_filled.pdf",
            OutputKind::Fillable => "_fillable.pdf",
        }
    }
}

/// Download name for an operation's output, derived from the uploaded name
pub fn output_file_name(input: &str, kind: OutputKind) -> String {
    let base = input.rsplit(['/', '\\']).next().unwrap_or(input);
    let stem = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.eq_ignore_ascii_case("pdf") => stem,
        _ => base,
    };

    let sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches(|c| c == '.' || c == '_');

    let stem = if sanitized.is_empty() {
        "document"
    } else {
        sanitized
    };
    format!("{}{}", stem, kind.suffix())
}
