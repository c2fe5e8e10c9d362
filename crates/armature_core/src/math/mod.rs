pub mod transform;
pub mod weight;

pub use transform::{KINDA_SMALL_NUMBER, SMALL_NUMBER, Transform};
pub use weight::ElementWeight;
