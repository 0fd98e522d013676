mod boundary;
mod checked;

pub use boundary::{catch, catch_checked};
pub use checked::{checked, checked_or};
