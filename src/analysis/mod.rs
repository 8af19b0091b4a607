//! Static analysis used by the correction pipeline: language detection and
//! structure metrics, regex error detection, and rule-based fixing.

pub mod analyzer;
pub mod detector;
pub mod fixer;
