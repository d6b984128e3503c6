//! Shared test harness modules for the atlas CLI.

use super::*;

mod helpers;
mod steps;
mod unit;
