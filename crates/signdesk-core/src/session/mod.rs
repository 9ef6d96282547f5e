pub mod backend;
pub mod model;
pub mod settings;

pub use backend::SessionBackend;
pub use model::{
    MAX_PREDICTIONS, MAX_WORD_HISTORY, PredictionRecord, SessionPatch, SessionState, WordRecord,
};
pub use settings::SessionSettings;
