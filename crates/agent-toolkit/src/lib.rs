//! # agent-toolkit
//!
//! The built-in tool set for the agent service: a calculator for
//! arithmetic expressions and a text analyzer for word/character
//! statistics. Each tool implements `agent_core::Tool` and is wired
//! into the registry at startup.

pub mod calculator;
pub mod text_analyzer;

pub use calculator::CalculatorTool;
pub use text_analyzer::TextAnalyzerTool;
