mod scripted;
mod stub;

pub use scripted::ScriptedBackend;
pub use stub::StubBackend;
