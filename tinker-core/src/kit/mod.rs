//! Reusable building blocks shared by the compiler and runtime

pub mod lexer;
pub mod number;
pub mod stack;
