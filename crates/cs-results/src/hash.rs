//! Content-based circuit identifiers.

use cs_netlist::Netlist;
use sha2::{Digest, Sha256};

/// Hex digits kept from the digest.
const ID_LEN: usize = 16;

/// Stable id of a flattened circuit.
///
/// The title is blanked and nodes are renumbered canonically first, so two
/// circuits with the same elements and wiring share an id regardless of what
/// they were called.
pub fn compute_circuit_id(netlist: &Netlist) -> String {
    let mut canonical = netlist.canonicalize();
    canonical.title.clear();

    let mut hasher = Sha256::new();
    let json = serde_json::to_string(&canonical).unwrap_or_default();
    hasher.update(json.as_bytes());

    let result = hasher.finalize();
    let mut id = format!("{:x}", result);
    id.truncate(ID_LEN);
    id
}
