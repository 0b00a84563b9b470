pub mod callback;
pub mod engine;
pub mod jack;
pub mod peak_meter;
pub mod ports;
pub mod stream;

pub use callback::{AudioCallback, CallbackResult};
pub use engine::{Engine, EngineEvent, EngineHandle};
pub use stream::StreamManager;
