pub use run::run;

pub mod args;
pub mod parse;
mod run;
pub mod style;
pub mod validate;
