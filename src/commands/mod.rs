pub mod audit;
pub mod batch;
pub mod cancel;
pub mod merge;
pub mod pipeline;
pub mod process;
pub mod segment;
pub mod status;
pub mod verify;
