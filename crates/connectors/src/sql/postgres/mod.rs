pub mod cursor;
pub mod data_type;
pub mod decode;
pub mod session;
