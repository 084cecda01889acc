//! Observability setup for Autostep: tracing subscriber, log file and
//! optional OpenTelemetry export.

pub mod tracing_setup;
