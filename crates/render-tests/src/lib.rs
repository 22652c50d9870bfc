#![allow(dead_code)]

pub mod integration;
pub mod live;
pub mod utils;
