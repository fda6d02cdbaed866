//! SPICE-style text for flattened netlists.
//!
//! ```text
//! .title circuit
//! * input V1
//! * output 1 2 R1
//! * mode symbolic
//! V1 1 0 step V1
//! R1 1 3 <Empty>
//! VI1 3 2 0
//! F1 2 0 VI1 y_1
//! Eint1 4 0 0 5 Ad
//! .control
//! ac dec 10 1 100k
//! print vm(1,2) vp(1,2) ; U3
//! print im(VI1) ip(VI1) ; I2
//! .endc
//! .end
//! ```
//!
//! Lines are dispatched on their element prefix; `*` lines other than the
//! three header comments are ignored and parsing stops at `.end`.

use std::fmt::Write as _;

use crate::error::{NetlistResult, parse_err};
use crate::model::{
    Analysis, EMPTY_VALUE, NetControl, NetElement, NetKind, NetProbe, Netlist, OPAMP_GAIN,
    OutputRef, ProbeTarget,
};

const AC_SWEEP: &str = "ac dec 10 1 100k";

/// Render `netlist` as SPICE-style text.
pub fn to_spice(netlist: &Netlist) -> String {
    let mut out = String::new();
    let _ = writeln!(out, ".title {}", netlist.title);
    let _ = writeln!(out, "* input {}", netlist.input);
    let _ = writeln!(
        out,
        "* output {} {} {}",
        netlist.output.pos, netlist.output.neg, netlist.output.label
    );
    let mode = if netlist.symbolic { "symbolic" } else { "numeric" };
    let _ = writeln!(out, "* mode {mode}");

    for e in &netlist.elements {
        let _ = writeln!(out, "{}", element_line(netlist, e));
    }

    out.push_str(".control\n");
    match netlist.analysis {
        Analysis::Dc => out.push_str("op\n"),
        Analysis::Ac => {
            out.push_str(AC_SWEEP);
            out.push('\n');
        }
    }
    for probe in &netlist.probes {
        let _ = writeln!(out, "{}", print_line(netlist.analysis, probe));
    }
    out.push_str(".endc\n.end\n");
    out
}

fn value_token(netlist: &Netlist, e: &NetElement) -> String {
    match e.value {
        Some(v) if !netlist.symbolic || e.kind == NetKind::Ammeter => v.to_string(),
        _ if e.kind == NetKind::OpAmp => OPAMP_GAIN.to_string(),
        _ => EMPTY_VALUE.to_string(),
    }
}

fn gain_token(netlist: &Netlist, e: &NetElement) -> String {
    match e.value {
        Some(v) if !netlist.symbolic => v.to_string(),
        _ => e.symbol.clone(),
    }
}

fn element_line(netlist: &Netlist, e: &NetElement) -> String {
    let head = format!("{} {} {}", e.name, e.pos, e.neg);
    match (e.kind, &e.control) {
        (NetKind::VoltageSource, _) if netlist.analysis == Analysis::Ac => {
            format!("{head} step {}", gain_token(netlist, e))
        }
        (NetKind::Vcvs | NetKind::Vccs | NetKind::OpAmp, Some(NetControl::Nodes { pos, neg })) => {
            let gain = if e.kind == NetKind::OpAmp {
                value_token(netlist, e)
            } else {
                gain_token(netlist, e)
            };
            format!("{head} {pos} {neg} {gain}")
        }
        (NetKind::Cccs | NetKind::Ccvs, Some(NetControl::Branch { ammeter })) => {
            format!("{head} {ammeter} {}", gain_token(netlist, e))
        }
        _ => format!("{head} {}", value_token(netlist, e)),
    }
}

fn print_line(analysis: Analysis, probe: &NetProbe) -> String {
    let quantity = match (&probe.target, analysis) {
        (ProbeTarget::Voltage { pos, neg }, Analysis::Dc) => format!("v({pos},{neg})"),
        (ProbeTarget::Voltage { pos, neg }, Analysis::Ac) => {
            format!("vm({pos},{neg}) vp({pos},{neg})")
        }
        (ProbeTarget::Current { ammeter }, Analysis::Dc) => format!("i({ammeter})"),
        (ProbeTarget::Current { ammeter }, Analysis::Ac) => {
            format!("im({ammeter}) ip({ammeter})")
        }
    };
    format!("print {quantity} ; {}", probe.name())
}

#[derive(Default)]
struct Header {
    title: Option<String>,
    input: Option<String>,
    output: Option<OutputRef>,
    symbolic: bool,
}

/// Parse text produced by [`to_spice`].
///
/// Gain symbols of numeric netlists are not written out; they are recovered
/// from the order controlled sources appear in.
pub fn parse_spice(text: &str) -> NetlistResult<Netlist> {
    let mut header = Header::default();
    let mut elements: Vec<NetElement> = Vec::new();
    let mut probes = Vec::new();
    let mut analysis = Analysis::Dc;
    let mut in_control = false;
    let mut gains = (0u32, 0u32);

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('*') {
            parse_header(comment.trim(), line_no, &mut header)?;
            continue;
        }
        let lower = line.to_ascii_lowercase();
        if lower == ".end" {
            break;
        }
        if let Some(title) = line.strip_prefix(".title") {
            header.title = Some(title.trim().to_string());
            continue;
        }
        if lower == ".control" {
            in_control = true;
            continue;
        }
        if lower == ".endc" {
            in_control = false;
            continue;
        }
        if in_control {
            if lower == "op" {
                analysis = Analysis::Dc;
            } else if lower.starts_with("ac ") {
                analysis = Analysis::Ac;
            } else if lower.starts_with("print ") {
                probes.push(parse_print(line, line_no)?);
            } else {
                return Err(parse_err(line_no, format!("unknown control command '{line}'")));
            }
            continue;
        }
        elements.push(parse_element(line, line_no, header.symbolic, &mut gains)?);
    }

    let title = header.title.ok_or_else(|| parse_err(0, "missing .title"))?;
    let input = header.input.ok_or_else(|| parse_err(0, "missing input header"))?;
    let output = header
        .output
        .ok_or_else(|| parse_err(0, "missing output header"))?;

    let mut max_node = output.pos.max(output.neg);
    for e in &elements {
        max_node = max_node.max(e.pos).max(e.neg);
        if let Some(NetControl::Nodes { pos, neg }) = e.control {
            max_node = max_node.max(pos).max(neg);
        }
    }
    for p in &probes {
        if let ProbeTarget::Voltage { pos, neg } = p.target {
            max_node = max_node.max(pos).max(neg);
        }
    }

    Ok(Netlist {
        title,
        analysis,
        symbolic: header.symbolic,
        node_count: max_node + 1,
        elements,
        probes,
        input,
        output,
    })
}

fn parse_header(comment: &str, line_no: usize, header: &mut Header) -> NetlistResult<()> {
    let mut tokens = comment.split_whitespace();
    match tokens.next() {
        Some("input") => {
            let name = tokens
                .next()
                .ok_or_else(|| parse_err(line_no, "input header without a source name"))?;
            header.input = Some(name.to_string());
        }
        Some("output") => {
            let pos = parse_node(tokens.next(), line_no)?;
            let neg = parse_node(tokens.next(), line_no)?;
            let label = tokens
                .next()
                .ok_or_else(|| parse_err(line_no, "output header without a label"))?;
            header.output = Some(OutputRef {
                label: label.to_string(),
                pos,
                neg,
            });
        }
        Some("mode") => header.symbolic = tokens.next() == Some("symbolic"),
        _ => {}
    }
    Ok(())
}

fn parse_node(token: Option<&str>, line_no: usize) -> NetlistResult<u32> {
    let token = token.ok_or_else(|| parse_err(line_no, "missing node"))?;
    token
        .parse()
        .map_err(|_| parse_err(line_no, format!("invalid node '{token}'")))
}

fn parse_value(token: Option<&str>, line_no: usize) -> NetlistResult<Option<i64>> {
    match token {
        None => Err(parse_err(line_no, "missing value")),
        Some(EMPTY_VALUE) | Some(OPAMP_GAIN) => Ok(None),
        Some(t) => t
            .parse()
            .map(Some)
            .map_err(|_| parse_err(line_no, format!("invalid value '{t}'"))),
    }
}

fn kind_of(name: &str) -> Option<NetKind> {
    if name.starts_with("VI") {
        return Some(NetKind::Ammeter);
    }
    if name.starts_with("Eint") || name.starts_with("Eop") {
        return Some(NetKind::OpAmp);
    }
    match name.chars().next()?.to_ascii_uppercase() {
        'V' => Some(NetKind::VoltageSource),
        'I' => Some(NetKind::CurrentSource),
        'R' => Some(NetKind::Resistor),
        'C' => Some(NetKind::Capacitor),
        'L' => Some(NetKind::Inductor),
        'G' => Some(NetKind::Vccs),
        'E' => Some(NetKind::Vcvs),
        'F' => Some(NetKind::Cccs),
        'H' => Some(NetKind::Ccvs),
        _ => None,
    }
}

fn parse_element(
    line: &str,
    line_no: usize,
    symbolic: bool,
    gains: &mut (u32, u32),
) -> NetlistResult<NetElement> {
    let mut tokens = line.split_whitespace();
    let name = tokens
        .next()
        .ok_or_else(|| parse_err(line_no, "empty element line"))?;
    let kind =
        kind_of(name).ok_or_else(|| parse_err(line_no, format!("unknown element '{name}'")))?;
    let pos = parse_node(tokens.next(), line_no)?;
    let neg = parse_node(tokens.next(), line_no)?;

    let mut element = NetElement {
        name: name.to_string(),
        kind,
        pos,
        neg,
        control: None,
        value: None,
        symbol: name.to_string(),
    };

    match kind {
        NetKind::Vcvs | NetKind::Vccs | NetKind::OpAmp => {
            let cpos = parse_node(tokens.next(), line_no)?;
            let cneg = parse_node(tokens.next(), line_no)?;
            element.control = Some(NetControl::Nodes {
                pos: cpos,
                neg: cneg,
            });
        }
        NetKind::Cccs | NetKind::Ccvs => {
            let ammeter = tokens
                .next()
                .ok_or_else(|| parse_err(line_no, "missing controlling ammeter"))?;
            element.control = Some(NetControl::Branch {
                ammeter: ammeter.to_string(),
            });
        }
        _ => {}
    }

    let mut token = tokens.next();
    if kind == NetKind::VoltageSource && token == Some("step") {
        token = tokens.next();
    }

    match kind {
        NetKind::Vcvs | NetKind::Ccvs | NetKind::Vccs | NetKind::Cccs => {
            let slot = if matches!(kind, NetKind::Vcvs | NetKind::Ccvs) {
                &mut gains.0
            } else {
                &mut gains.1
            };
            *slot += 1;
            let prefix = if matches!(kind, NetKind::Vcvs | NetKind::Ccvs) {
                "x_"
            } else {
                "y_"
            };
            if symbolic {
                let symbol =
                    token.ok_or_else(|| parse_err(line_no, "missing gain symbol"))?;
                element.symbol = symbol.to_string();
            } else {
                element.value = parse_value(token, line_no)?;
                element.symbol = format!("{prefix}{slot}");
            }
        }
        NetKind::OpAmp => {
            element.symbol = OPAMP_GAIN.to_string();
            element.value = parse_value(token, line_no)?;
        }
        NetKind::VoltageSource if symbolic => {
            token.ok_or_else(|| parse_err(line_no, "missing source value"))?;
        }
        _ => element.value = parse_value(token, line_no)?,
    }
    Ok(element)
}

fn parse_print(line: &str, line_no: usize) -> NetlistResult<NetProbe> {
    let (body, name) = line
        .split_once(';')
        .ok_or_else(|| parse_err(line_no, "print without a probe name"))?;
    let name = name.trim();
    let label: u8 = name
        .get(1..)
        .and_then(|l| l.parse().ok())
        .ok_or_else(|| parse_err(line_no, format!("invalid probe name '{name}'")))?;

    let quantity = body
        .trim()
        .strip_prefix("print")
        .map(str::trim)
        .and_then(|rest| rest.split_whitespace().next())
        .ok_or_else(|| parse_err(line_no, "empty print"))?;
    let (func, args) = quantity
        .split_once('(')
        .and_then(|(f, rest)| rest.strip_suffix(')').map(|a| (f, a)))
        .ok_or_else(|| parse_err(line_no, format!("malformed quantity '{quantity}'")))?;

    let target = match func {
        "v" | "vm" => {
            let (pos, neg) = args
                .split_once(',')
                .ok_or_else(|| parse_err(line_no, "voltage print needs two nodes"))?;
            ProbeTarget::Voltage {
                pos: parse_node(Some(pos.trim()), line_no)?,
                neg: parse_node(Some(neg.trim()), line_no)?,
            }
        }
        "i" | "im" => ProbeTarget::Current {
            ammeter: args.trim().to_string(),
        },
        other => {
            return Err(parse_err(line_no, format!("unknown quantity '{other}'")));
        }
    };
    Ok(NetProbe { label, target })
}
