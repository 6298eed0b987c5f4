pub mod factors;
pub mod linear;
pub mod refine;
pub use linear::*;
pub use refine::*;
