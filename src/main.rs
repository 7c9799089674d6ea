mod classifier;
mod config;
mod error;
mod handlers;
mod labels;
mod models;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use log::LevelFilter;
use std::io::Write;

use classifier::ModelState;
use config::Config;
use handlers::AppState;

fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .parse_default_env()
        .init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = Config::parse();
    init_logging(config.log_level);

    // Loaded once; requests get a 500 instead of a crash when this fails
    let model = ModelState::load(&config.model_settings());
    let state = web::Data::new(AppState {
        model,
        max_upload_bytes: config.max_upload_bytes(),
    });

    log::info!("Server running at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(handlers::routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
