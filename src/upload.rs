//! Request body parsing for the HTTP endpoints.
//!
//! Two shapes are accepted: `multipart/form-data` (the image in a part that
//! carries a filename, parameters as plain text parts) or a raw JPEG/PNG
//! body with parameters in the query string.

use std::collections::HashMap;
use std::str::FromStr;

use actix_multipart::Multipart;
use actix_web::{web, HttpMessage, HttpRequest};
use futures_util::StreamExt;
use log::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

const ACCEPTED_IMAGE_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

#[derive(Debug)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn check_format(&self) -> Result<()> {
        if ACCEPTED_IMAGE_TYPES.contains(&self.content_type.as_str()) {
            Ok(())
        } else {
            Err(Error::UnsupportedFormat)
        }
    }
}

#[derive(Debug)]
pub struct Upload {
    pub request_id: Uuid,
    pub file: Option<UploadedFile>,
    fields: HashMap<String, String>,
}

impl Upload {
    /// Buffers the request body, failing once more than `limit` bytes
    /// have been received.
    pub async fn read(req: &HttpRequest, payload: web::Payload, limit: usize) -> Result<Self> {
        let mut upload = Upload {
            request_id: Uuid::new_v4(),
            file: None,
            fields: HashMap::new(),
        };

        if req.content_type().eq_ignore_ascii_case("multipart/form-data") {
            upload
                .read_multipart(Multipart::new(req.headers(), payload), limit)
                .await?;
        } else {
            let bytes = read_limited(payload, limit).await?;
            if !bytes.is_empty() {
                upload.file = Some(UploadedFile {
                    filename: None,
                    content_type: req.content_type().to_ascii_lowercase(),
                    bytes,
                });
            }
        }

        debug!(
            "[{}] upload parsed: file={} bytes, fields={:?}",
            upload.request_id,
            upload.file.as_ref().map_or(0, |f| f.bytes.len()),
            upload.fields.keys().collect::<Vec<_>>()
        );
        Ok(upload)
    }

    async fn read_multipart(&mut self, mut multipart: Multipart, limit: usize) -> Result<()> {
        let mut received = 0usize;

        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| Error::Upload(e.to_string()))?;
            let disposition = field.content_disposition();
            let name = disposition.get_name().unwrap_or_default().to_string();
            let filename = disposition.get_filename().map(str::to_string);
            let content_type = field.content_type().essence_str().to_ascii_lowercase();

            let mut data = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk.map_err(|e| Error::Upload(e.to_string()))?;
                received += chunk.len();
                if received > limit {
                    return Err(Error::PayloadTooLarge(limit));
                }
                data.extend_from_slice(&chunk);
            }

            match filename {
                Some(filename) => {
                    if self.file.is_some() {
                        return Err(Error::Upload("expected a single image file".into()));
                    }
                    self.file = Some(UploadedFile {
                        filename: Some(filename),
                        content_type,
                        bytes: data,
                    });
                }
                None => {
                    let value = String::from_utf8(data).map_err(|_| {
                        Error::Upload(format!("field '{}' is not valid UTF-8", name))
                    })?;
                    self.fields.insert(name, value);
                }
            }
        }
        Ok(())
    }

    /// Adds query parameters that were not already sent as form fields.
    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        for (key, value) in query {
            self.fields.entry(key).or_insert(value);
        }
        self
    }

    /// Parses the first parameter present under any of `names`.
    pub fn param<T: FromStr>(&self, names: &[&str]) -> Result<T> {
        let (name, raw) = names
            .iter()
            .find_map(|name| self.fields.get(*name).map(|v| (*name, v)))
            .ok_or_else(|| {
                Error::InvalidInput(format!("Missing required field: {}", names.join(" or ")))
            })?;
        raw.trim().parse().map_err(|_| {
            Error::InvalidInput(format!("Invalid value for field '{}': {:?}", name, raw))
        })
    }

    /// Takes the uploaded image, which must be present and JPEG or PNG.
    pub fn into_image(self) -> Result<UploadedFile> {
        let file = self
            .file
            .ok_or_else(|| Error::InvalidInput("Missing required field: file".into()))?;
        file.check_format()?;
        Ok(file)
    }
}

async fn read_limited(mut payload: web::Payload, limit: usize) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| Error::Upload(e.to_string()))?;
        if body.len() + chunk.len() > limit {
            return Err(Error::PayloadTooLarge(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
