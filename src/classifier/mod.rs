pub mod adapter;
pub mod groq;
pub mod http;

pub use adapter::{Classifier, ClassifierError, FailureKind, Verdict};
