pub mod manager;

pub use manager::StreamManager;
