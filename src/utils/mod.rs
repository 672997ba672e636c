//! Delay arithmetic shared by the config and the engine.

pub(crate) mod duration;
pub(crate) mod retry;
