mod api;
mod app;
mod application;
mod config;
mod domain;
mod engine;
mod ui;
mod utils;

use iced::{window, Size};

fn main() -> iced::Result {
    utils::init_tracing();

    iced::application(app::DownloadApp::boot, app::update, app::view)
        .title("Universal Video Downloader")
        .window(window::Settings {
            size: Size::new(560.0, 620.0),
            resizable: false,
            ..Default::default()
        })
        .run()
}
