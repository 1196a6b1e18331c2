mod main;
mod run;

pub use main::*;
pub use run::{Outcome, run, run_checked, run_clean, run_leaky, run_or_abort};
