pub mod charts;
pub mod data;
pub mod engine;
pub mod error;
pub mod figure;
pub mod kpi;
pub mod logging;
pub mod render;
pub mod snapshot;
pub mod state;
pub mod verify;
