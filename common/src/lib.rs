pub mod calibration;
pub mod config;
pub mod error;
pub mod logging;
pub mod plot;
pub mod results;
pub mod roofline;
pub mod util;
