use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::case::*;

/// Decimal places shown for computed flows.
pub const PRECISION: usize = 10;

/// One labeled line of a result table.
#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct ResultRow {
    #[tabled(rename = "Parameter")]
    pub parameter: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Unit")]
    pub unit: &'static str,
}

impl ResultRow {
    fn voltage(label: &str, v: &BusVoltage) -> Self {
        Self {
            parameter: label.to_string(),
            value: v.to_string(),
            unit: "kV",
        }
    }

    fn power(label: String, value: f64, unit: &'static str) -> Self {
        Self {
            parameter: label,
            value: format!("{:.1$}", value, PRECISION),
            unit,
        }
    }
}

/// Rows for one branch: P both ways, ΔP, then Q both ways, ΔQ.
fn branch_rows(branch: BranchId, flow: &BranchFlow) -> Vec<ResultRow> {
    let (a, b) = branch.ends();
    vec![
        ResultRow::power(format!("P{}{}", a, b), flow.p_ab, "MW"),
        ResultRow::power(format!("P{}{}", b, a), flow.p_ba, "MW"),
        ResultRow::power(format!("ΔP{}{}", a, b), flow.delta_p, "MW"),
        ResultRow::power(format!("Q{}{}", a, b), flow.q_ab, "MVAr"),
        ResultRow::power(format!("Q{}{}", b, a), flow.q_ba, "MVAr"),
        ResultRow::power(format!("ΔQ{}{}", a, b), flow.delta_q, "MVAr"),
    ]
}

pub fn two_bus_rows(case: &TwoBusCase, flow: &TwoBusFlow) -> Vec<ResultRow> {
    let mut rows = vec![
        ResultRow::voltage("Vi", &case.vi),
        ResultRow::voltage("Vj", &case.vj),
    ];
    rows.extend([
        ResultRow::power("Pij".into(), flow.pij, "MW"),
        ResultRow::power("Pji".into(), flow.pji, "MW"),
        ResultRow::power("ΔP".into(), flow.delta_p, "MW"),
        ResultRow::power("Qij".into(), flow.qij, "MVAr"),
        ResultRow::power("Qji".into(), flow.qji, "MVAr"),
        ResultRow::power("ΔQ".into(), flow.delta_q, "MVAr"),
    ]);
    rows
}

pub fn three_bus_rows(case: &ThreeBusCase, flow: &ThreeBusFlow) -> Vec<ResultRow> {
    let mut rows = vec![
        ResultRow::voltage("Vi", &case.vi),
        ResultRow::voltage("Vj", &case.vj),
        ResultRow::voltage("Vk", &case.vk),
    ];
    for branch in BranchId::ALL {
        rows.extend(branch_rows(branch, &flow.branch(branch)));
    }
    rows
}

pub fn solution_rows(solution: &Solution) -> Vec<ResultRow> {
    match solution {
        Solution::TwoBus { case, flow } => two_bus_rows(case, flow),
        Solution::ThreeBus { case, flow } => three_bus_rows(case, flow),
    }
}

/// Renders a solution as a text table.
pub fn render_table(solution: &Solution) -> String {
    let mut table = Table::new(solution_rows(solution));
    table.with(Style::modern());
    table.to_string()
}
