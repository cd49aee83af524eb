//!
//! Reading and writing observations and fitted models
//!
pub mod json;
pub mod matrix;
