//! Message types for the three wire dialects the gateway translates between.

pub(crate) mod anthropic;
pub(crate) mod openai;
pub(crate) mod responses;
