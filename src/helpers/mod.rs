pub mod dates;
pub mod pagination;

pub use dates::{parse_day, today};
pub use pagination::{parse_param, Range};
