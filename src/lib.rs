#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod request;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, load_config, parse_config};
pub use ir::{ChartKind, ChartRequest, DataRecord, ScatterPoint, SortOrder, Validity};
pub use layout::compute_layout;
pub use layout::text::{
    CalibratedMeasurer, FixedAdvanceMeasurer, SystemFontMeasurer, TextMetricsProvider,
};
pub use layout::{DiagramData, Layout};
pub use layout_dump::{LayoutDump, layout_dump_json, write_layout_dump};
pub use request::{RequestError, parse_request};
pub use theme::{FontSpec, Theme};
