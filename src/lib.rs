pub mod cli;
pub mod engine;
pub mod ledger;
pub mod model;
pub mod query;
pub mod run;
pub mod schema;
pub mod validate;
