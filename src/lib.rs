//! OKR cascade - objective hierarchy, metric progress and filter evaluation
//!
//! The core in [`okr`] is a set of pure functions over caller-owned
//! snapshots: metric progress, cascade depth and ancestor chains, and filter
//! matching. The [`cli`] and [`config`] modules wrap it in a small preview
//! harness that renders a JSON snapshot from disk.

pub mod cli;
pub mod config;
pub mod okr;
