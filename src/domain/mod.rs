//! Domain types: money, contracts, overdue rollups and dispatch bookkeeping,
//! plus the ports the application layer talks to.

pub mod contract;
pub mod dispatch;
pub mod money;
pub mod overdue;
pub mod ports;
