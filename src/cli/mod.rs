pub mod fetch;
pub mod history;
pub mod serve;
pub mod setup;
pub mod ui;
