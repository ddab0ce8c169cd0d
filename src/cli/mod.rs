//! Command line front end

pub mod convert;
pub mod favorites;
pub mod history;
pub mod rates;
pub mod setup;
pub mod ui;
