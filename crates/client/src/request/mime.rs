use std::path::{Path, PathBuf};

/// One field of a multipart form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeField {
    name: String,
    value: MimeValue,
}

/// What a [`MimeField`] carries. The two kinds never mix within one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeValue {
    /// Inline value sent under the field name.
    Text(String),
    /// File streamed from disk; the field name becomes the part's filename.
    File(PathBuf),
}

impl MimeField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: MimeValue::Text(value.into()) }
    }

    pub fn file(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self { name: name.into(), value: MimeValue::File(path.as_ref().to_path_buf()) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &MimeValue {
        &self.value
    }
}
