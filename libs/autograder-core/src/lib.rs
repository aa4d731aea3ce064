pub mod analyzer;
pub mod compiler;
pub mod design;
pub mod error;
pub mod evaluator;
pub mod extract;
pub mod judge;
pub mod llm;
pub mod optimization;
pub mod patterns;
pub mod performance;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod scoring;
pub mod structural;
pub mod tester;
pub mod testgen;

pub use compiler::ensure_toolchain;
pub use error::{GraderError, GraderResult};
pub use llm::{LanguageModel, ModelSet};
pub use pipeline::{grade, GradeRequest};
