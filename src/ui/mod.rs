pub mod recital;
pub mod windows;
