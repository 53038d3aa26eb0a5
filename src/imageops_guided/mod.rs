pub mod border;
pub mod compose;
pub mod executor;
pub mod filter;
pub mod regression;
pub mod resample;
pub mod window;
