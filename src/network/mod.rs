pub mod gateway;
pub mod http;
pub mod memory;

pub use gateway::{ProgressGateway, ProgressRecord};
pub use http::HttpProgressGateway;
pub use memory::MemoryProgressGateway;
