use std::collections::HashMap;
use std::fs;

use log::info;

use crate::case::*;
use crate::error::CaseError;
use crate::impedance::Impedance;

/// strip comments and surrounding whitespace
fn strip_extras(s: &str) -> &str {
    s.split('#').next().unwrap_or("").trim()
}

/// Reads a case file from disk.
pub fn read_case(path: &str) -> Result<Case, CaseError> {
    let content = fs::read_to_string(path)?;
    let case = parse_case_str(&content)?;
    info!("Read {} case from {}", model_name(&case), path);
    Ok(case)
}

fn model_name(case: &Case) -> &'static str {
    match case {
        Case::TwoBus(_) => "two-bus",
        Case::ThreeBus(_) => "three-bus",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Key {
    Vi,
    Vj,
    Vk,
    AngleVi,
    AngleVj,
    AngleVk,
    R,
    X,
    Z,
    Branch(BranchId, Part),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Part {
    R,
    X,
    Z,
}

impl Key {
    fn lookup(name: &str) -> Option<Key> {
        let name = name.to_ascii_lowercase();
        let key = match name.as_str() {
            "vi" => Key::Vi,
            "vj" => Key::Vj,
            "vk" => Key::Vk,
            "anglevi" => Key::AngleVi,
            "anglevj" => Key::AngleVj,
            "anglevk" => Key::AngleVk,
            "r" => Key::R,
            "x" => Key::X,
            "z" => Key::Z,
            _ => {
                let (part, branch) = name.split_once('_')?;
                let part = match part {
                    "r" => Part::R,
                    "x" => Part::X,
                    "z" => Part::Z,
                    _ => return None,
                };
                let branch = match branch {
                    "ij" => BranchId::IJ,
                    "ik" => BranchId::IK,
                    "jk" => BranchId::JK,
                    _ => return None,
                };
                Key::Branch(branch, part)
            }
        };
        Some(key)
    }
}

#[derive(Debug, Clone, Copy)]
enum Value {
    Real(f64),
    Polar(f64, f64),
}

fn parse_number(text: &str, line: usize) -> Result<f64, CaseError> {
    text.trim().parse().map_err(|_| CaseError::Syntax {
        line,
        message: format!("'{}' is not a number", text.trim()),
    })
}

/// Values collected from the file, last occurrence of a key wins.
struct Fields(HashMap<Key, (usize, Value)>);

impl Fields {
    fn real(&self, key: Key, name: &str) -> Result<Option<f64>, CaseError> {
        match self.0.get(&key) {
            None => Ok(None),
            Some((_, Value::Real(v))) => Ok(Some(*v)),
            Some((line, Value::Polar(..))) => Err(CaseError::Syntax {
                line: *line,
                message: format!("'{}' expects a single number", name),
            }),
        }
    }

    fn required(&self, key: Key, name: &str) -> Result<f64, CaseError> {
        self.real(key, name)?
            .ok_or_else(|| CaseError::Missing(name.to_string()))
    }

    fn angle(&self, key: Key, name: &str) -> Result<f64, CaseError> {
        Ok(self.real(key, name)?.unwrap_or(0.0))
    }

    fn line_of(&self, key: Key) -> Option<usize> {
        self.0.get(&key).map(|(line, _)| *line)
    }

    /// Impedance from either an `R`/`X` pair or a polar `Z` entry.
    ///
    /// When both forms are given, whichever was written last wins.
    fn impedance(
        &self,
        r: Key,
        x: Key,
        z: Key,
        suffix: &str,
    ) -> Result<Option<Impedance>, CaseError> {
        let r_name = format!("R{}", suffix);
        let x_name = format!("X{}", suffix);
        let z_name = format!("Z{}", suffix);

        let rect_line = self.line_of(r).max(self.line_of(x));
        if let Some((line, value)) = self.0.get(&z).filter(|(line, _)| Some(*line) > rect_line) {
            return match value {
                Value::Polar(magnitude, angle) => Ok(Some(Impedance::from_polar(*magnitude, *angle)?)),
                Value::Real(_) => Err(CaseError::Syntax {
                    line: *line,
                    message: format!("'{}' expects 'magnitude @ angle'", z_name),
                }),
            };
        }

        match (self.real(r, &r_name)?, self.real(x, &x_name)?) {
            (Some(r), Some(x)) => Ok(Some(Impedance::from_rectangular(r, x))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(CaseError::Missing(x_name)),
            (None, Some(_)) => Err(CaseError::Missing(r_name)),
        }
    }

    fn shared_impedance(&self) -> Result<Option<Impedance>, CaseError> {
        self.impedance(Key::R, Key::X, Key::Z, "")
    }

    fn branch_impedance(&self, branch: BranchId) -> Result<Option<Impedance>, CaseError> {
        let (a, b) = branch.ends();
        self.impedance(
            Key::Branch(branch, Part::R),
            Key::Branch(branch, Part::X),
            Key::Branch(branch, Part::Z),
            &format!("_{}{}", a, b),
        )
    }
}

/// Parses a `key = value` case description.
///
/// A `Vk` entry selects the three-bus model. Polar impedances are written
/// `Z_ij = 40.31 @ 82.87` and converted to rectangular here.
pub fn parse_case_str(content: &str) -> Result<Case, CaseError> {
    let mut fields = Fields(HashMap::new());

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let trimmed = strip_extras(raw);
        if trimmed.is_empty() {
            continue;
        }

        let (name, value) = trimmed.split_once('=').ok_or_else(|| CaseError::Syntax {
            line,
            message: format!("expected 'key = value', got '{}'", trimmed),
        })?;
        let name = name.trim();
        let key = Key::lookup(name).ok_or_else(|| CaseError::UnknownKey {
            line,
            key: name.to_string(),
        })?;

        let value = match value.split_once('@') {
            Some((magnitude, angle)) => {
                Value::Polar(parse_number(magnitude, line)?, parse_number(angle, line)?)
            }
            None => Value::Real(parse_number(value, line)?),
        };
        fields.0.insert(key, (line, value));
    }

    let vi = BusVoltage::new(
        fields.required(Key::Vi, "Vi")?,
        fields.angle(Key::AngleVi, "angleVi")?,
    );
    let vj = BusVoltage::new(
        fields.required(Key::Vj, "Vj")?,
        fields.angle(Key::AngleVj, "angleVj")?,
    );
    let shared = fields.shared_impedance()?;

    match fields.real(Key::Vk, "Vk")? {
        None => {
            let z = match shared {
                Some(z) => z,
                None => fields
                    .branch_impedance(BranchId::IJ)?
                    .ok_or_else(|| CaseError::Missing("R".to_string()))?,
            };
            Ok(Case::TwoBus(TwoBusCase::new(vi, vj, z)))
        }
        Some(vk) => {
            let vk = BusVoltage::new(vk, fields.angle(Key::AngleVk, "angleVk")?);
            let mut branch_z = [Impedance::from_rectangular(0.0, 0.0); 3];
            for (slot, branch) in branch_z.iter_mut().zip(BranchId::ALL) {
                *slot = match (fields.branch_impedance(branch)?, shared) {
                    (Some(z), _) => z,
                    (None, Some(z)) => z,
                    (None, None) => {
                        let (a, b) = branch.ends();
                        return Err(CaseError::Missing(format!("R_{}{}", a, b)));
                    }
                };
            }
            let [z_ij, z_ik, z_jk] = branch_z;
            Ok(Case::ThreeBus(ThreeBusCase::new(vi, vj, vk, z_ij, z_ik, z_jk)))
        }
    }
}
