//! Australian tax calculations for RSU vesting events and share sales.

pub mod core;
