//! Designer templates: field regions captured on rendered page images

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::document::FormDocument;
use crate::error::FormError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFieldType {
    #[default]
    Text,
}

/// One rectangle marked by the user, in pixels of the rendered page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Page number (1-indexed)
    pub page: u32,
    pub x: f64,
    pub y: f64,
    /// Width in document units
    pub w: f64,
    /// Height in document units
    pub h: f64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: TemplateFieldType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    /// (width, height) per page in document units
    #[serde(default)]
    pub page_sizes: Vec<(f64, f64)>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty template seeded with the document's page sizes
    pub fn for_document(doc: &FormDocument) -> Result<Self, FormError> {
        Ok(Self {
            fields: Vec::new(),
            page_sizes: doc.page_sizes()?,
        })
    }

    pub fn push(&mut self, spec: FieldSpec) {
        self.fields.push(spec);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Size recorded for a page (1-indexed)
    pub fn page_size(&self, page: u32) -> Option<(f64, f64)> {
        let index = usize::try_from(page).ok()?.checked_sub(1)?;
        self.page_sizes.get(index).copied()
    }

    pub fn fields_on_page(&self, page: u32) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(move |f| f.page == page)
    }

    /// Check every spec against the target document's page count
    pub fn validate(&self, page_count: usize) -> Result<(), FormError> {
        if self.fields.is_empty() {
            return Err(FormError::EmptyTemplate);
        }

        let mut names = HashSet::new();
        for spec in &self.fields {
            if spec.name.trim().is_empty() {
                return Err(FormError::InvalidTemplate("field name is empty".to_string()));
            }
            // Scanned names are trimmed, so a padded name could shadow an existing field
            if spec.name.trim() != spec.name {
                return Err(FormError::InvalidTemplate(format!(
                    "field name '{}' has leading or trailing whitespace",
                    spec.name
                )));
            }
            if spec.page == 0 || spec.page as usize > page_count {
                return Err(FormError::InvalidTemplate(format!(
                    "field '{}' targets page {} of a {}-page document",
                    spec.name, spec.page, page_count
                )));
            }
            if ![spec.x, spec.y, spec.w, spec.h].iter().all(|v| v.is_finite()) {
                return Err(FormError::InvalidTemplate(format!(
                    "field '{}' has non-finite coordinates",
                    spec.name
                )));
            }
            if spec.w <= 0.0 || spec.h <= 0.0 {
                return Err(FormError::InvalidTemplate(format!(
                    "field '{}' has an empty rectangle",
                    spec.name
                )));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(FormError::FieldNameConflict(spec.name.clone()));
            }
        }
        Ok(())
    }
}
