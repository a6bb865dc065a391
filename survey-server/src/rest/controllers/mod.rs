pub mod chat;
pub mod dataset;

pub use chat::ChatController;
pub use dataset::DatasetController;
