// Rationale: permits may only be minted by the gate's acquire paths;
// forging one would let releases outnumber acquires.
use griddle::GatePermit;

fn forge() -> GatePermit {
    GatePermit { gate: todo!() }
}

fn main() {
    let _ = forge();
}
