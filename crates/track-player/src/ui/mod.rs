//! Terminal UI around the playback control view.

mod app;
mod render;

pub(crate) use app::{Launch, run_tui};
