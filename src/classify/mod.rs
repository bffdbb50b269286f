mod backend;
mod backends;
mod prediction;
mod registry;

pub use backend::ClassifierBackend;
pub use backends::{ScriptedBackend, StubBackend};
pub use prediction::{LabelScore, Prediction};
pub use registry::BackendRegistry;
