use serde::{Deserialize, Serialize};
use std::fmt;

use crate::impedance::Impedance;

/// Voltage phasor at a bus: magnitude in kV, angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BusVoltage {
    pub magnitude: f64,
    pub angle_deg: f64,
}

impl BusVoltage {
    pub fn new(magnitude: f64, angle_deg: f64) -> Self {
        Self {
            magnitude,
            angle_deg,
        }
    }
}

impl fmt::Display for BusVoltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}∠{}°", self.magnitude, self.angle_deg)
    }
}

/// The branches of the triangle network. The two-bus model only has `IJ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchId {
    IJ,
    IK,
    JK,
}

impl BranchId {
    pub const ALL: [BranchId; 3] = [BranchId::IJ, BranchId::IK, BranchId::JK];

    /// Bus letters at the two ends, e.g. `('i', 'j')`.
    pub fn ends(&self) -> (char, char) {
        match self {
            BranchId::IJ => ('i', 'j'),
            BranchId::IK => ('i', 'k'),
            BranchId::JK => ('j', 'k'),
        }
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = self.ends();
        write!(f, "{}-{}", a, b)
    }
}

/// One branch between buses i and j.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwoBusCase {
    pub vi: BusVoltage,
    pub vj: BusVoltage,
    pub z: Impedance,
}

impl TwoBusCase {
    pub fn new(vi: BusVoltage, vj: BusVoltage, z: Impedance) -> Self {
        Self { vi, vj, z }
    }
}

impl Default for TwoBusCase {
    fn default() -> Self {
        Self {
            vi: BusVoltage::new(345.0, 0.0),
            vj: BusVoltage::new(360.0, 0.0),
            z: Impedance::from_rectangular(5.0, 40.0),
        }
    }
}

/// Three buses joined pairwise by independent branches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreeBusCase {
    pub vi: BusVoltage,
    pub vj: BusVoltage,
    pub vk: BusVoltage,
    pub z_ij: Impedance,
    pub z_ik: Impedance,
    pub z_jk: Impedance,
}

impl ThreeBusCase {
    pub fn new(
        vi: BusVoltage,
        vj: BusVoltage,
        vk: BusVoltage,
        z_ij: Impedance,
        z_ik: Impedance,
        z_jk: Impedance,
    ) -> Self {
        Self {
            vi,
            vj,
            vk,
            z_ij,
            z_ik,
            z_jk,
        }
    }

    /// Same impedance on all three branches.
    pub fn with_shared_impedance(
        vi: BusVoltage,
        vj: BusVoltage,
        vk: BusVoltage,
        z: Impedance,
    ) -> Self {
        Self::new(vi, vj, vk, z, z, z)
    }

    pub fn impedance(&self, branch: BranchId) -> Impedance {
        match branch {
            BranchId::IJ => self.z_ij,
            BranchId::IK => self.z_ik,
            BranchId::JK => self.z_jk,
        }
    }

    /// Sending and receiving bus voltages of a branch.
    pub fn ends(&self, branch: BranchId) -> (BusVoltage, BusVoltage) {
        match branch {
            BranchId::IJ => (self.vi, self.vj),
            BranchId::IK => (self.vi, self.vk),
            BranchId::JK => (self.vj, self.vk),
        }
    }
}

impl Default for ThreeBusCase {
    fn default() -> Self {
        Self::with_shared_impedance(
            BusVoltage::new(345.0, 0.0),
            BusVoltage::new(360.0, 0.0),
            BusVoltage::new(350.0, 10.0),
            Impedance::from_rectangular(5.0, 40.0),
        )
    }
}

/// Flow on one branch seen from both ends, a being the sending bus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BranchFlow {
    pub p_ab: f64,
    pub p_ba: f64,
    pub q_ab: f64,
    pub q_ba: f64,
    pub delta_p: f64,
    pub delta_q: f64,
}

impl fmt::Display for BranchFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pab={:>12.4} MW  Pba={:>12.4} MW  dP={:>10.4} MW  Qab={:>12.4} MVAr  Qba={:>12.4} MVAr  dQ={:>10.4} MVAr",
            self.p_ab, self.p_ba, self.delta_p, self.q_ab, self.q_ba, self.delta_q
        )
    }
}

/// Two-bus result (MW / MVAr).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwoBusFlow {
    pub pij: f64,
    pub pji: f64,
    pub qij: f64,
    pub qji: f64,
    pub delta_p: f64,
    pub delta_q: f64,
}

impl From<BranchFlow> for TwoBusFlow {
    fn from(flow: BranchFlow) -> Self {
        Self {
            pij: flow.p_ab,
            pji: flow.p_ba,
            qij: flow.q_ab,
            qji: flow.q_ba,
            delta_p: flow.delta_p,
            delta_q: flow.delta_q,
        }
    }
}

/// Three-bus result: every branch evaluated on its own, no bus balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreeBusFlow {
    pub pij: f64,
    pub pji: f64,
    pub pik: f64,
    pub pki: f64,
    pub pjk: f64,
    pub pkj: f64,
    pub qij: f64,
    pub qji: f64,
    pub qik: f64,
    pub qki: f64,
    pub qjk: f64,
    pub qkj: f64,
    pub delta_pij: f64,
    pub delta_pik: f64,
    pub delta_pjk: f64,
    pub delta_qij: f64,
    pub delta_qik: f64,
    pub delta_qjk: f64,
}

impl ThreeBusFlow {
    pub fn from_branches(ij: BranchFlow, ik: BranchFlow, jk: BranchFlow) -> Self {
        Self {
            pij: ij.p_ab,
            pji: ij.p_ba,
            pik: ik.p_ab,
            pki: ik.p_ba,
            pjk: jk.p_ab,
            pkj: jk.p_ba,
            qij: ij.q_ab,
            qji: ij.q_ba,
            qik: ik.q_ab,
            qki: ik.q_ba,
            qjk: jk.q_ab,
            qkj: jk.q_ba,
            delta_pij: ij.delta_p,
            delta_pik: ik.delta_p,
            delta_pjk: jk.delta_p,
            delta_qij: ij.delta_q,
            delta_qik: ik.delta_q,
            delta_qjk: jk.delta_q,
        }
    }

    pub fn branch(&self, branch: BranchId) -> BranchFlow {
        match branch {
            BranchId::IJ => BranchFlow {
                p_ab: self.pij,
                p_ba: self.pji,
                q_ab: self.qij,
                q_ba: self.qji,
                delta_p: self.delta_pij,
                delta_q: self.delta_qij,
            },
            BranchId::IK => BranchFlow {
                p_ab: self.pik,
                p_ba: self.pki,
                q_ab: self.qik,
                q_ba: self.qki,
                delta_p: self.delta_pik,
                delta_q: self.delta_qik,
            },
            BranchId::JK => BranchFlow {
                p_ab: self.pjk,
                p_ba: self.pkj,
                q_ab: self.qjk,
                q_ba: self.qkj,
                delta_p: self.delta_pjk,
                delta_q: self.delta_qjk,
            },
        }
    }
}

/// A case of either size, as read from a case file or posted to the server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Case {
    TwoBus(TwoBusCase),
    ThreeBus(ThreeBusCase),
}

/// A solved case together with its inputs, ready to be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Solution {
    TwoBus {
        case: TwoBusCase,
        flow: TwoBusFlow,
    },
    ThreeBus {
        case: ThreeBusCase,
        flow: ThreeBusFlow,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_labels() {
        assert_eq!(BranchId::IJ.to_string(), "i-j");
        assert_eq!(BranchId::JK.ends(), ('j', 'k'));
    }

    #[test]
    fn shared_impedance_fills_every_branch() {
        let z = Impedance::from_rectangular(2.0, 9.0);
        let case = ThreeBusCase::with_shared_impedance(
            BusVoltage::new(1.0, 0.0),
            BusVoltage::new(1.0, 0.0),
            BusVoltage::new(1.0, 0.0),
            z,
        );
        for branch in BranchId::ALL {
            assert_eq!(case.impedance(branch), z);
        }
    }

    #[test]
    fn three_bus_ends() {
        let case = ThreeBusCase::default();
        assert_eq!(case.ends(BranchId::IK), (case.vi, case.vk));
        assert_eq!(case.ends(BranchId::JK), (case.vj, case.vk));
    }

    #[test]
    fn branch_accessor_matches_fields() {
        let flow = |base: f64| BranchFlow {
            p_ab: base,
            p_ba: base + 1.0,
            q_ab: base + 2.0,
            q_ba: base + 3.0,
            delta_p: base + 4.0,
            delta_q: base + 5.0,
        };
        let three = ThreeBusFlow::from_branches(flow(0.0), flow(10.0), flow(20.0));
        assert_eq!(three.branch(BranchId::IJ), flow(0.0));
        assert_eq!(three.branch(BranchId::IK), flow(10.0));
        assert_eq!(three.branch(BranchId::JK), flow(20.0));
        assert_eq!(three.pki, 11.0);
        assert_eq!(three.delta_qjk, 25.0);
    }

    #[test]
    fn case_json_is_tagged_by_model() {
        let json = serde_json::to_value(Case::TwoBus(TwoBusCase::default())).unwrap();
        assert_eq!(json["model"], "two_bus");
        assert_eq!(json["vj"]["magnitude"], 360.0);
        assert_eq!(json["z"]["x"], 40.0);
    }
}
