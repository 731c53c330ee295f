pub mod audio;
pub mod cli;
pub mod config;
pub mod gesture;
pub mod host;
pub mod logging;
pub mod models;
pub mod page;
pub mod panel;
pub mod playback;
pub mod prayer;
pub mod preferences;
pub mod provider;
pub mod reciters;
pub mod screen;
pub mod settings;
pub mod time_format;
pub mod ui;
