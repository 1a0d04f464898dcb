pub mod callback;
pub mod dashboard;
pub mod login;
