//! Utility functions and types

mod dates;
mod validation;

pub use dates::{date_to_index_position, parse_date, DateInput, PositionMethod, PositionOptions};
pub use validation::{check_exog, check_exog_alignment, check_same_names, check_series};

pub(crate) use validation::format_names;
