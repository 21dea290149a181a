pub mod config;
pub mod display;
pub mod meter;
pub mod reading;
pub mod upload;

pub use config::{MeterConfig, NetworkConfig};
pub use display::{DisplayPage, PageView, PAGE_COUNT};
pub use meter::{MeterAction, MeterEngine};
pub use reading::{Reading, SensorSample};
