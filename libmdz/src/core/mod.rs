pub mod constants;
pub mod error;
pub mod npy;
pub mod types;

pub use constants::*;
pub use error::{Error, MdzResult};
pub use npy::{element_count, Dtype, NpyArray};
pub use types::*;
