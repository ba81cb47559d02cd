pub mod flow;
pub mod machine;
pub mod state;

pub use flow::{FlowBackend, RentFlow, RentSelection, ReturnEvidence, ReturnFlow};
pub use machine::SessionMachine;
pub use state::SessionState;
