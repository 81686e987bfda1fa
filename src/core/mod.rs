// Error modeling and height range validation shared by both pipelines.
pub mod error;
pub mod range;
