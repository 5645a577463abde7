pub mod cache;
pub mod error;
pub mod images;
pub mod logging;
pub mod preload;
pub mod providers;
pub mod story;
pub mod words;
