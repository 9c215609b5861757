//! SuperScript explorer: a local dashboard over pre-computed outputs of the
//! SuperScript team-formation model.

pub mod app;
pub mod chart;
pub mod config;
pub mod data;
pub mod logging;
pub mod network;
pub mod pages;
pub mod params;
pub mod player;
pub mod presets;
pub mod server;
pub mod session;
pub mod smoothing;
pub mod storage;
pub mod transfer;
