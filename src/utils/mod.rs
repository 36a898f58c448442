pub mod string_utils;

pub use string_utils::{is_blank, mask_address};
