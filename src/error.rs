use std::path::PathBuf;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};

use crate::models::ErrorResponse;
use crate::transforms::{MAX_DIMENSION, MAX_JPEG_DIMENSION, MAX_PIXELS};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "Invalid dimensions: width and height must be between 1 and {} with at most {} pixels in total (got {}x{})",
        MAX_DIMENSION,
        MAX_PIXELS,
        .width,
        .height
    )]
    InvalidDimension { width: i64, height: i64 },
    #[error(
        "Image of {}x{} is too large to encode as JPEG (at most {} per side)",
        .width,
        .height,
        MAX_JPEG_DIMENSION
    )]
    TooLargeForJpeg { width: u32, height: u32 },
    #[error("{0}")]
    InvalidInput(String),
    #[error("Invalid image format. Only JPEG/PNG allowed.")]
    UnsupportedFormat,
    #[error("Error decoding image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Error encoding image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("Malformed upload: {0}")]
    Upload(String),
    #[error("No such file or directory: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Upload exceeds the limit of {0} bytes")]
    PayloadTooLarge(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<actix_web::error::BlockingError> for Error {
    fn from(err: actix_web::error::BlockingError) -> Self {
        Error::Internal(err.to_string())
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidDimension { .. }
            | Error::TooLargeForJpeg { .. }
            | Error::InvalidInput(_)
            | Error::UnsupportedFormat
            | Error::Decode(_)
            | Error::Upload(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Encode(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            detail: self.to_string(),
        })
    }
}
