mod app;
mod config;
mod engine;
mod geometry;
mod physics;
mod platform;
mod pointer;
mod schedule;
mod signal;
mod trail;

fn main() {
    env_logger::init();
    log::info!("pawchase starting up");

    if let Err(e) = app::run() {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}
