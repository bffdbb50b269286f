// Rationale: duplicating a permit would release the same slot twice and
// silently grow the gate's effective capacity.
use griddle::AdmissionGate;

fn main() {
    let gate = AdmissionGate::new(1);
    let permit = gate.acquire();
    let _copy = permit.clone();
}
