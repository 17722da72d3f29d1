pub mod basemap;
pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod geocode;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{AdjustConfig, Config, load_config};
pub use layout::compute_map_layout;
pub use layout::label_placement::{LabelInput, PlacementResult, place_labels};
