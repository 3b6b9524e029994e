//! Multipart form reading for endpoints that accept file uploads.

use crate::{
    errors::{Error, Result},
    storage::Upload,
};
use axum::extract::Multipart;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// A fully buffered multipart form.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<(String, Upload)>,
}

fn malformed(e: impl std::fmt::Display) -> Error {
    Error::validation(format!("Malformed form data: {e}"))
}

impl MultipartForm {
    /// Reads every part of the request. Empty file parts are skipped.
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_string();
            if let Some(file_name) = field.file_name().map(str::to_string) {
                let bytes = field.bytes().await.map_err(malformed)?;
                if !bytes.is_empty() {
                    form.files.push((
                        name,
                        Upload {
                            file_name,
                            bytes: bytes.to_vec(),
                        },
                    ));
                }
            } else {
                let text = field.text().await.map_err(malformed)?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    /// A text field, empty when absent.
    #[must_use]
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// A required text field parsed into `T`. Enum values use their snake-case names.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let raw = self
            .fields
            .get(name)
            .ok_or_else(|| Error::validation(format!("Missing field: {name}")))?;
        let value = raw
            .trim()
            .parse::<serde_json::Value>()
            .unwrap_or_else(|_| serde_json::Value::String(raw.trim().to_string()));
        serde_json::from_value(value)
            .map_err(|_| Error::validation(format!("Invalid value for {name}: {raw}")))
    }

    /// Removes and returns the first file sent under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        let index = self.files.iter().position(|(field, _)| field == name)?;
        Some(self.files.remove(index).1)
    }

    /// Removes and returns every file sent under `name`.
    pub fn take_files(&mut self, name: &str) -> Vec<Upload> {
        let (matching, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(field, _)| field == name);
        self.files = rest;
        matching.into_iter().map(|(_, upload)| upload).collect()
    }
}
