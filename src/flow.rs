//! Closed-form two-port power flow.
//!
//! Every branch is treated as an isolated series impedance between two buses.
//! Voltages go in as kV and impedances as ohms with no per-unit base, so the
//! results read directly as MW / MVAr. All arithmetic is `f64`; NaN or
//! infinite inputs propagate into the results unchanged.

use log::debug;

use crate::case::*;
use crate::error::FlowError;
use crate::impedance::{Impedance, reduce_degrees};

/// Power leaving bus `a` towards bus `b` through `z`, as `(P, Q)`.
///
/// The reverse direction is this same function with the buses swapped.
fn sending_end(a: BusVoltage, b: BusVoltage, z: Impedance, denom: f64) -> (f64, f64) {
    let theta = reduce_degrees(a.angle_deg - b.angle_deg).to_radians();
    let (sin, cos) = theta.sin_cos();
    let va2 = a.magnitude * a.magnitude;
    let vab = a.magnitude * b.magnitude;

    let p = (z.r * va2 - z.r * vab * cos + z.x * vab * sin) / denom;
    let q = (z.x * va2 - z.x * vab * cos - z.r * vab * sin) / denom;
    (p, q)
}

/// Evaluates one branch in both directions.
pub fn branch_flow(
    branch: BranchId,
    a: BusVoltage,
    b: BusVoltage,
    z: Impedance,
) -> Result<BranchFlow, FlowError> {
    let denom = z.norm_sqr();
    if denom == 0.0 {
        return Err(FlowError::DegenerateBranch { branch });
    }

    let (p_ab, q_ab) = sending_end(a, b, z, denom);
    let (p_ba, q_ba) = sending_end(b, a, z, denom);

    let flow = BranchFlow {
        p_ab,
        p_ba,
        q_ab,
        q_ba,
        delta_p: (p_ab.abs() - p_ba.abs()).abs(),
        delta_q: (q_ab.abs() - q_ba.abs()).abs(),
    };
    debug!("branch {}: {}", branch, flow);
    Ok(flow)
}

impl TwoBusCase {
    pub fn solve(&self) -> Result<TwoBusFlow, FlowError> {
        branch_flow(BranchId::IJ, self.vi, self.vj, self.z).map(TwoBusFlow::from)
    }
}

impl ThreeBusCase {
    pub fn solve(&self) -> Result<ThreeBusFlow, FlowError> {
        let solve_branch = |branch: BranchId| {
            let (a, b) = self.ends(branch);
            branch_flow(branch, a, b, self.impedance(branch))
        };
        Ok(ThreeBusFlow::from_branches(
            solve_branch(BranchId::IJ)?,
            solve_branch(BranchId::IK)?,
            solve_branch(BranchId::JK)?,
        ))
    }
}

impl Case {
    pub fn solve(&self) -> Result<Solution, FlowError> {
        Ok(match *self {
            Case::TwoBus(case) => Solution::TwoBus {
                case,
                flow: case.solve()?,
            },
            Case::ThreeBus(case) => Solution::ThreeBus {
                case,
                flow: case.solve()?,
            },
        })
    }
}

/// Two-bus flow from raw inputs: kV, degrees, ohms.
pub fn compute_two_bus(
    vi: f64,
    vj: f64,
    angle_vi: f64,
    angle_vj: f64,
    r: f64,
    x: f64,
) -> Result<TwoBusFlow, FlowError> {
    TwoBusCase::new(
        BusVoltage::new(vi, angle_vi),
        BusVoltage::new(vj, angle_vj),
        Impedance::from_rectangular(r, x),
    )
    .solve()
}

/// Three-bus flow from raw inputs, one impedance per branch.
#[allow(clippy::too_many_arguments)]
pub fn compute_three_bus(
    vi: f64,
    vj: f64,
    vk: f64,
    angle_vi: f64,
    angle_vj: f64,
    angle_vk: f64,
    r_ij: f64,
    x_ij: f64,
    r_ik: f64,
    x_ik: f64,
    r_jk: f64,
    x_jk: f64,
) -> Result<ThreeBusFlow, FlowError> {
    ThreeBusCase::new(
        BusVoltage::new(vi, angle_vi),
        BusVoltage::new(vj, angle_vj),
        BusVoltage::new(vk, angle_vk),
        Impedance::from_rectangular(r_ij, x_ij),
        Impedance::from_rectangular(r_ik, x_ik),
        Impedance::from_rectangular(r_jk, x_jk),
    )
    .solve()
}
