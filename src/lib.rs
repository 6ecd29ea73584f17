//! Closed-loop autoscaling simulator.
//!
//! See the module tree for the component breakdown: [`worker`] and
//! [`manager`] are the request-dispatch core, [`sampler`] and [`controller`]
//! close the feedback loop, [`collector`] records the series the loop
//! produces, and [`client`] is the synthetic/replayed workload source.

pub mod client;
pub mod collector;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod manager;
pub mod request;
pub mod sampler;
pub mod worker;
