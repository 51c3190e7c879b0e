mod dates;
mod model;
mod project;
mod redirects;
mod series;

// Re-export public items
pub use dates::{format_date, parse_offset};
pub use model::{ComponentStrategy, Config};
pub use project::{CONFIG_FILE, resolve_root};
pub use redirects::Redirect;
pub use series::{SeriesConfig, SeriesLink, SeriesPart};
