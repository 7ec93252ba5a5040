use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormError {
    #[error("Failed to parse PDF: {0}")]
    DocumentUnreadable(String),

    #[error("No source document supplied")]
    NoSourceDocument,

    #[error("Template contains no fields, nothing to synthesize")]
    EmptyTemplate,

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Field name already in use: {0}")]
    FieldNameConflict(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),
}

impl From<lopdf::Error> for FormError {
    fn from(err: lopdf::Error) -> Self {
        FormError::OperationError(err.to_string())
    }
}
