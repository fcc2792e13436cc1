//! Data preprocessing module
//!
//! Feature scaling stages used as the first step of a pipeline
//! (StandardScaler, MinMaxScaler).

mod scaler;

pub use scaler::{Scaler, ScalerType};
