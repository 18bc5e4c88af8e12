pub mod quota;
pub mod scaled;
