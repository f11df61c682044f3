pub mod clock;
pub mod dashboard;
pub mod filters;
pub mod policy;
pub mod transaction;
pub mod validation;
