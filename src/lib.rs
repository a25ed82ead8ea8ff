//! Closed-form active/reactive power flow for two-bus and three-bus networks.
//!
//! ```
//! use branchflow::flow::compute_two_bus;
//!
//! let flow = compute_two_bus(345.0, 360.0, 0.0, 0.0, 5.0, 40.0).unwrap();
//! assert!((flow.pij + 15.923076923).abs() < 1e-6);
//! ```

pub mod case;
pub mod error;
pub mod flow;
pub mod impedance;
pub mod parse;
pub mod report;
pub mod server;

pub use case::*;
pub use error::{CaseError, FlowError};
pub use flow::{branch_flow, compute_three_bus, compute_two_bus};
pub use impedance::{Impedance, ImpedanceForm, convert_impedance};
