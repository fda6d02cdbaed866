//! Modified nodal analysis over polynomial entries.
//!
//! Unknowns are the non-reference node voltages followed by one branch
//! current for every element whose constitutive law is not a polynomial
//! admittance: resistors, inductors, voltage sources, ammeters, voltage-output
//! controlled sources and op-amp outputs. Capacitors stamp `s*C` directly.
//!
//! Row `k` of the node block is KCL at node `k + 1` with currents leaving the
//! node counted positive. Op-amps are ideal: their branch row forces the two
//! inputs to the same voltage and their output current is free.
//!
//! The driving source is stamped with unit amplitude, so solved node voltages
//! are transfer functions from the source.

use std::collections::HashMap;

use cs_netlist::{Analysis, NetControl, NetElement, NetKind, Netlist};
use serde::{Deserialize, Serialize};

use crate::error::{AlgebraResult, DeriveError, DeriveResult};
use crate::poly::{Poly, Symbols};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unknown {
    Node(u32),
    Branch(String),
}

impl Unknown {
    pub fn laplace_name(&self) -> String {
        match self {
            Unknown::Node(n) => format!("V{n}(s)"),
            Unknown::Branch(name) => format!("I_{name}(s)"),
        }
    }

    pub fn time_name(&self) -> String {
        match self {
            Unknown::Node(n) => format!("v{n}(t)"),
            Unknown::Branch(name) => format!("i_{name}(t)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MnaSystem {
    pub symbols: Symbols,
    pub unknowns: Vec<Unknown>,
    /// Square coefficient matrix, row-major.
    pub matrix: Vec<Vec<Poly>>,
    pub rhs: Vec<Poly>,
    /// Row carrying the driving source and the label shown for it.
    pub source: Option<(usize, String)>,
    pub analysis: Analysis,
}

fn has_branch(kind: NetKind) -> bool {
    matches!(
        kind,
        NetKind::Resistor
            | NetKind::Inductor
            | NetKind::VoltageSource
            | NetKind::Ammeter
            | NetKind::Vcvs
            | NetKind::Ccvs
            | NetKind::OpAmp
    )
}

impl MnaSystem {
    /// Stamp every element of `netlist`.
    pub fn stamp(netlist: &Netlist) -> DeriveResult<Self> {
        let nodes = netlist.node_count.saturating_sub(1) as usize;
        let mut unknowns: Vec<Unknown> = (1..netlist.node_count).map(Unknown::Node).collect();
        let mut branches = HashMap::new();
        for e in netlist.elements.iter().filter(|e| has_branch(e.kind)) {
            branches.insert(e.name.clone(), unknowns.len());
            unknowns.push(Unknown::Branch(e.name.clone()));
        }

        let size = unknowns.len();
        let mut system = MnaSystem {
            symbols: Symbols::new(),
            unknowns,
            matrix: vec![vec![Poly::zero(); size]; size],
            rhs: vec![Poly::zero(); size],
            source: None,
            analysis: netlist.analysis,
        };
        let node = |n: u32| -> Option<usize> { (n > 0 && (n as usize) <= nodes).then(|| n as usize - 1) };

        for e in &netlist.elements {
            let (p, n) = (node(e.pos), node(e.neg));
            let branch = branches.get(&e.name).copied();
            let param = system.parameter(netlist, e);
            let s = Poly::var(Symbols::S);

            if let Some(b) = branch {
                // Branch current leaves pos and enters neg.
                system.add(p, Some(b), &Poly::one())?;
                system.add(n, Some(b), &Poly::constant(-1))?;
            }

            match e.kind {
                NetKind::Resistor => {
                    system.stamp_branch_voltage(branch, p, n)?;
                    system.add(branch, branch, &param.neg()?)?;
                }
                NetKind::Inductor => {
                    system.stamp_branch_voltage(branch, p, n)?;
                    system.add(branch, branch, &param.mul(&s)?.neg()?)?;
                }
                NetKind::Capacitor => {
                    let y = param.mul(&s)?;
                    system.add(p, p, &y)?;
                    system.add(n, n, &y)?;
                    system.add(p, n, &y.neg()?)?;
                    system.add(n, p, &y.neg()?)?;
                }
                NetKind::VoltageSource => {
                    system.stamp_branch_voltage(branch, p, n)?;
                    if let Some(b) = branch {
                        let unit = if e.name == netlist.input {
                            system.source = Some((b, system.source_label(netlist, e)));
                            Poly::one()
                        } else {
                            param.clone()
                        };
                        system.rhs[b] = unit;
                    }
                }
                NetKind::CurrentSource => {
                    system.add_rhs(p, &param.neg()?)?;
                    system.add_rhs(n, &param)?;
                }
                NetKind::Ammeter => system.stamp_branch_voltage(branch, p, n)?,
                NetKind::Vccs => {
                    let (cp, cn) = system.control_nodes(e, &node)?;
                    system.add(p, cp, &param)?;
                    system.add(p, cn, &param.neg()?)?;
                    system.add(n, cp, &param.neg()?)?;
                    system.add(n, cn, &param)?;
                }
                NetKind::Vcvs => {
                    let (cp, cn) = system.control_nodes(e, &node)?;
                    system.stamp_branch_voltage(branch, p, n)?;
                    system.add(branch, cp, &param.neg()?)?;
                    system.add(branch, cn, &param)?;
                }
                NetKind::Cccs => {
                    let c = system.control_branch(e, &branches)?;
                    system.add(p, Some(c), &param)?;
                    system.add(n, Some(c), &param.neg()?)?;
                }
                NetKind::Ccvs => {
                    let c = system.control_branch(e, &branches)?;
                    system.stamp_branch_voltage(branch, p, n)?;
                    system.add(branch, Some(c), &param.neg()?)?;
                }
                NetKind::OpAmp => {
                    let (cp, cn) = system.control_nodes(e, &node)?;
                    system.add(branch, cp, &Poly::one())?;
                    system.add(branch, cn, &Poly::constant(-1))?;
                }
            }
        }

        if system.source.is_none() {
            return Err(DeriveError::failed(format!(
                "driving source {} not found",
                netlist.input
            )));
        }
        Ok(system)
    }

    pub fn size(&self) -> usize {
        self.unknowns.len()
    }

    pub fn node_index(&self, node: u32) -> Option<usize> {
        self.unknowns.iter().position(|u| *u == Unknown::Node(node))
    }

    /// Element value as a polynomial: its number in numeric netlists, its
    /// symbol otherwise.
    fn parameter(&mut self, netlist: &Netlist, e: &NetElement) -> Poly {
        match e.value {
            Some(v) if !netlist.symbolic => Poly::constant(i128::from(v)),
            _ => Poly::var(self.symbols.intern(&e.symbol)),
        }
    }

    fn source_label(&self, netlist: &Netlist, e: &NetElement) -> String {
        match e.value {
            Some(v) if !netlist.symbolic => v.to_string(),
            _ => e.symbol.clone(),
        }
    }

    fn add(&mut self, row: Option<usize>, col: Option<usize>, value: &Poly) -> AlgebraResult<()> {
        if let (Some(r), Some(c)) = (row, col) {
            self.matrix[r][c] = self.matrix[r][c].add(value)?;
        }
        Ok(())
    }

    fn add_rhs(&mut self, row: Option<usize>, value: &Poly) -> AlgebraResult<()> {
        if let Some(r) = row {
            self.rhs[r] = self.rhs[r].add(value)?;
        }
        Ok(())
    }

    /// `v(pos) - v(neg)` on the element's own branch row.
    fn stamp_branch_voltage(
        &mut self,
        branch: Option<usize>,
        p: Option<usize>,
        n: Option<usize>,
    ) -> AlgebraResult<()> {
        self.add(branch, p, &Poly::one())?;
        self.add(branch, n, &Poly::constant(-1))
    }

    fn control_nodes(
        &self,
        e: &NetElement,
        node: &impl Fn(u32) -> Option<usize>,
    ) -> DeriveResult<(Option<usize>, Option<usize>)> {
        match &e.control {
            Some(NetControl::Nodes { pos, neg }) => Ok((node(*pos), node(*neg))),
            _ => Err(DeriveError::failed(format!("{} lacks a voltage control", e.name))),
        }
    }

    fn control_branch(&self, e: &NetElement, branches: &HashMap<String, usize>) -> DeriveResult<usize> {
        match &e.control {
            Some(NetControl::Branch { ammeter }) => branches
                .get(ammeter)
                .copied()
                .ok_or_else(|| DeriveError::failed(format!("{} reads unknown ammeter {ammeter}", e.name))),
            _ => Err(DeriveError::failed(format!("{} lacks a current control", e.name))),
        }
    }

    fn rhs_text(&self, row: usize, time_domain: bool) -> String {
        match &self.source {
            Some((r, label)) if *r == row => match (time_domain, self.analysis) {
                (true, Analysis::Ac) => format!("{label}*u(t)"),
                (false, Analysis::Ac) => format!("{label}/s"),
                _ => label.clone(),
            },
            _ => self.rhs[row].display(&self.symbols),
        }
    }

    /// One equation per row in the Laplace domain.
    pub fn laplace_equations(&self) -> Vec<String> {
        (0..self.size())
            .map(|r| {
                let mut lhs = Vec::new();
                for (c, entry) in self.matrix[r].iter().enumerate() {
                    if entry.is_zero() {
                        continue;
                    }
                    let name = self.unknowns[c].laplace_name();
                    lhs.push(match entry.as_constant() {
                        Some(1) => name,
                        Some(-1) => format!("-{name}"),
                        _ => format!("{}*{name}", entry.display_factor(&self.symbols)),
                    });
                }
                format!("{} = {}", join_terms(&lhs), self.rhs_text(r, false))
            })
            .collect()
    }

    /// The same rows with `s^k` read as the k-th time derivative.
    pub fn time_domain_equations(&self) -> Vec<String> {
        (0..self.size())
            .map(|r| {
                let mut lhs = Vec::new();
                for (c, entry) in self.matrix[r].iter().enumerate() {
                    if entry.is_zero() {
                        continue;
                    }
                    let name = self.unknowns[c].time_name();
                    for k in (0..=entry.degree_in(Symbols::S)).rev() {
                        let coeff = entry.coeff_in(Symbols::S, k);
                        if coeff.is_zero() {
                            continue;
                        }
                        let target = match k {
                            0 => name.clone(),
                            1 => format!("d/dt {name}"),
                            _ => format!("d^{k}/dt^{k} {name}"),
                        };
                        lhs.push(match coeff.as_constant() {
                            Some(1) => target,
                            Some(-1) => format!("-{target}"),
                            _ => format!("{}*{target}", coeff.display_factor(&self.symbols)),
                        });
                    }
                }
                format!("{} = {}", join_terms(&lhs), self.rhs_text(r, true))
            })
            .collect()
    }

    /// Every variable that appears in the system other than `s`.
    pub fn parameters(&self) -> Vec<String> {
        let mut used = vec![false; self.symbols.len()];
        for entry in self.matrix.iter().flatten().chain(self.rhs.iter()) {
            for v in entry.vars() {
                used[v] = true;
            }
        }
        self.symbols
            .parameters()
            .enumerate()
            .filter(|(i, _)| used[i + 1])
            .map(|(_, name)| name.to_string())
            .collect()
    }
}

fn join_terms(terms: &[String]) -> String {
    if terms.is_empty() {
        return "0".to_string();
    }
    let mut out = terms[0].clone();
    for t in &terms[1..] {
        match t.strip_prefix('-') {
            Some(rest) => {
                out.push_str(" - ");
                out.push_str(rest);
            }
            None => {
                out.push_str(" + ");
                out.push_str(t);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_netlist::{NetControl, OutputRef};

    fn element(name: &str, kind: NetKind, pos: u32, neg: u32) -> NetElement {
        NetElement {
            name: name.into(),
            kind,
            pos,
            neg,
            control: None,
            value: None,
            symbol: name.into(),
        }
    }

    pub(crate) fn rc_lowpass() -> Netlist {
        Netlist {
            title: "rc".into(),
            analysis: Analysis::Ac,
            symbolic: true,
            node_count: 3,
            elements: vec![
                element("V1", NetKind::VoltageSource, 1, 0),
                element("R1", NetKind::Resistor, 1, 2),
                element("C1", NetKind::Capacitor, 2, 0),
            ],
            probes: Vec::new(),
            input: "V1".into(),
            output: OutputRef {
                label: "C1".into(),
                pos: 2,
                neg: 0,
            },
        }
    }

    #[test]
    fn rc_stamps() {
        let system = MnaSystem::stamp(&rc_lowpass()).unwrap();
        assert_eq!(system.size(), 4);
        assert_eq!(
            system.unknowns,
            vec![
                Unknown::Node(1),
                Unknown::Node(2),
                Unknown::Branch("V1".into()),
                Unknown::Branch("R1".into())
            ]
        );
        let eqs = system.laplace_equations();
        assert_eq!(eqs[0], "I_V1(s) + I_R1(s) = 0");
        assert_eq!(eqs[1], "s*C1*V2(s) - I_R1(s) = 0");
        assert_eq!(eqs[2], "V1(s) = V1/s");
        assert_eq!(eqs[3], "V1(s) - V2(s) - R1*I_R1(s) = 0");
        let time = system.time_domain_equations();
        assert_eq!(time[1], "C1*d/dt v2(t) - i_R1(t) = 0");
        assert_eq!(time[2], "v1(t) = V1*u(t)");
        assert_eq!(system.parameters(), vec!["R1".to_string(), "C1".to_string()]);
    }

    #[test]
    fn missing_control_fails() {
        let mut n = rc_lowpass();
        n.elements.push(element("F1", NetKind::Cccs, 2, 0));
        assert!(matches!(MnaSystem::stamp(&n), Err(DeriveError::Failed { .. })));
        n.elements[3].control = Some(NetControl::Branch { ammeter: "VI9".into() });
        assert!(matches!(MnaSystem::stamp(&n), Err(DeriveError::Failed { .. })));
    }
}
