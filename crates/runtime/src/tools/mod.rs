//! Reporting tools exposed to the model.

mod dates;
mod errors;
mod forecast;
mod host;
mod registry;
mod reporting;
mod types;

pub use dates::{ResolvedMonth, months_before, parse_month, parse_month_or_now, start_of_month};
pub use errors::ToolError;
pub use forecast::{ForecastQuery, HISTORY_MONTHS, LinearFit, Projection, project};
pub use host::ToolHost;
pub use registry::{DEFAULT_SEARCH_LIMIT, ToolKind, ToolRegistry};
pub use reporting::{MetricQuery, SearchQuery};
pub use types::{ParamType, ToolParam, ToolSpec, parse_arguments};

pub(crate) use forecast::round_to;
