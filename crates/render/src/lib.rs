pub mod convert;
pub mod error;
pub mod registry;
pub mod renderer;
pub mod stream;
