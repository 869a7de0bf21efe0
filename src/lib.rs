#![cfg_attr(not(test), no_std)]

pub mod ble;
pub mod config;
pub mod console;
pub mod diagnostics;
pub mod features;

// Host implementation of the critical section used by the diagnostics buffer
#[cfg(test)]
use critical_section as _;
