pub mod download;
pub mod history;
pub mod status;
pub mod stream;

pub mod util;
