pub mod human;
pub mod report;
pub mod style;
