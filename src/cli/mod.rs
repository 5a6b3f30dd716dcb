//! Terminal front end for the pipeline commands

pub mod export;
pub mod load;
pub mod report;
pub mod run;
pub mod setup;
pub mod sync;
pub mod ui;
