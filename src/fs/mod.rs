//! Local filesystem side of the pipeline: archive building and extraction.

pub mod archive;
pub mod extract;
