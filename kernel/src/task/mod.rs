//! Thread scheduling and process loading.

pub mod clock;
pub mod loader;
pub mod process;
pub mod seed;
pub mod usermode;
