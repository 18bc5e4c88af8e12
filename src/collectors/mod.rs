pub mod identity;
pub mod mounts;
pub mod tools;
