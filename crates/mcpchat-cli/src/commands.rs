pub mod session;
pub mod version;
