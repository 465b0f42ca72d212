pub mod annotator;
pub mod cleaning;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod labeling;
pub mod logging;
pub mod sheet;
