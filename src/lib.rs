pub mod cli;
pub mod count;
pub mod error;
pub mod filter;
pub mod model;
pub mod output;
pub mod provider;
pub mod repos;
pub mod scan;
pub mod util;
