pub mod column;
pub mod data_type;
pub mod value;
