//! Data models for the lender's backend resources.
//!
//! - `Loan`, `Payment`: lending records
//! - `Customer`: borrowers
//! - `Admin`: back-office users
//!
//! Field names follow the backend's JSON (`loanID`, `customerID`, ...). IDs
//! are assigned by the backend and left out when creating a record.

pub mod admin;
pub mod customer;
pub mod loan;

pub use admin::Admin;
pub use customer::Customer;
pub use loan::{Loan, Payment};
