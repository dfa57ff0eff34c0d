mod agent;
mod app;
mod config;
mod error;
mod hud;
mod population;
mod render;
mod systems;
mod util;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Contagion starting up");

    if let Err(e) = app::run(config::SimConfig::default()) {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}
