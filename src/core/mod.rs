pub mod audit;
pub mod decision;
pub mod error;
pub mod io;
pub mod mutator;
pub mod params;
pub mod read;
pub mod regions;
pub mod run;
pub mod stats;
