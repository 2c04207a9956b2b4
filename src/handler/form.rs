use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::error::PanelError;

#[derive(Debug, Clone)]
pub struct FormFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// A fully buffered multipart body. Parts with a file name are files, the rest
/// are text fields. Later parts replace earlier ones of the same name.
#[derive(Debug, Default)]
pub struct Form {
    texts: HashMap<String, String>,
    files: HashMap<String, FormFile>,
}

impl Form {
    pub async fn read(mut multipart: Multipart) -> Result<Self, PanelError> {
        let bad_body = |e: axum::extract::multipart::MultipartError| {
            PanelError::invalid(format!("malformed multipart body: {}", e.body_text()))
        };
        let mut form = Form::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_body)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let bytes = field.bytes().await.map_err(bad_body)?;
                    // browsers send an empty, unnamed part for an untouched file input
                    if filename.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.files.insert(name, FormFile { filename, bytes });
                }
                None => {
                    let text = field.text().await.map_err(bad_body)?;
                    form.texts.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts
            .get(name)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<FormFile> {
        self.files.remove(name).filter(|f| !f.bytes.is_empty())
    }
}
