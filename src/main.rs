use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::info;

use imagelab::config::ServerConfig;
use imagelab::{handlers, AppState, RandomPredictor};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    imagelab::init_logging();

    let config = ServerConfig::from_env();
    let state = web::Data::new(
        AppState::new(RandomPredictor::default()).with_max_upload_bytes(config.max_upload_bytes),
    );

    let bind_address = config.bind_address();
    info!("Server running at http://{}", bind_address);
    info!("Workers: {}", config.workers);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .workers(config.workers)
    .bind(&bind_address)?
    .run()
    .await
}
