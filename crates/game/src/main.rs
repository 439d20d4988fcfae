mod app;
mod clock;
mod config;
mod controller;
mod daynight;
mod entity;
mod error;
mod geometry;
mod item;
mod messages;
mod preset;
mod registry;
mod scene;
mod sim;
mod world;

use std::process::ExitCode;

fn main() -> ExitCode {
    match app::build_app() {
        Ok(wiring) => app::run(wiring),
        Err(err) => {
            tracing::error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
