use std::collections::HashMap;

use actix_web::{http::header::ContentType, web, HttpRequest, HttpResponse};
use image::DynamicImage;
use log::info;

use crate::error::Result;
use crate::models::{HealthResponse, PredictionResponse};
use crate::state::AppState;
use crate::transforms;
use crate::upload::Upload;

const HOME_PAGE: &str = include_str!("../templates/home.html");

type Query = web::Query<HashMap<String, String>>;

/// Registers every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/resize").route(web::post().to(resize)))
        .service(web::resource("/grayscale").route(web::post().to(grayscale)))
        .service(web::resource("/rotate").route(web::post().to(rotate)));
}

pub async fn home() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(HOME_PAGE)
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse { status: "ok" })
}

/// Returns a placeholder label. The image is optional; when present it must
/// still be a decodable JPEG/PNG.
pub async fn predict(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let upload = Upload::read(&req, payload, state.max_upload_bytes).await?;
    let request_id = upload.request_id;

    let filename = upload.file.as_ref().and_then(|f| f.filename.clone());
    let image = match upload.file {
        Some(file) => {
            file.check_format()?;
            Some(web::block(move || transforms::decode(&file.bytes)).await??)
        }
        None => None,
    };

    let predictor = state.predictor.clone();
    let prediction = web::block(move || predictor.predict(image.as_ref())).await??;
    info!("[{}] predicted class: {}", request_id, prediction.label);

    Ok(HttpResponse::Ok().json(PredictionResponse {
        filename,
        prediction,
    }))
}

pub async fn resize(
    req: HttpRequest,
    payload: web::Payload,
    query: Query,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let upload = Upload::read(&req, payload, state.max_upload_bytes)
        .await?
        .with_query(query.into_inner());
    let width: i64 = upload.param(&["width"])?;
    let height: i64 = upload.param(&["height"])?;
    info!("[{}] resize to {}x{}", upload.request_id, width, height);

    transform_response(upload, move |img| transforms::resize(img, width, height)).await
}

pub async fn grayscale(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let upload = Upload::read(&req, payload, state.max_upload_bytes).await?;
    info!("[{}] grayscale", upload.request_id);

    transform_response(upload, |img| Ok(transforms::grayscale(img))).await
}

pub async fn rotate(
    req: HttpRequest,
    payload: web::Payload,
    query: Query,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let upload = Upload::read(&req, payload, state.max_upload_bytes)
        .await?
        .with_query(query.into_inner());
    let degrees: f32 = upload.param(&["degrees", "angle"])?;
    info!("[{}] rotate by {} degrees", upload.request_id, degrees);

    transform_response(upload, move |img| transforms::rotate(img, degrees)).await
}

/// Decodes the uploaded image, applies `op` on the blocking pool and
/// answers with the JPEG-encoded result.
async fn transform_response<F>(upload: Upload, op: F) -> Result<HttpResponse>
where
    F: FnOnce(&DynamicImage) -> Result<DynamicImage> + Send + 'static,
{
    let file = upload.into_image()?;
    let encoded = web::block(move || {
        let image = transforms::decode(&file.bytes)?;
        transforms::encode_jpeg(&op(&image)?)
    })
    .await??;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::jpeg())
        .body(encoded))
}
