//! Executor traits shared by every backend

mod traits;

pub use traits::{AdditionKernel, ComputeDevice};
