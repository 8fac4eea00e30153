pub mod analysis;
pub mod gemini;
pub mod input;
pub mod report;
pub mod session;
pub mod workflow;
