// Market data primitives
pub mod market;

// Indicator bundle and session tags
pub mod indicators;

// Signal labels
pub mod signal;

// Scan request / result model
pub mod scan;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
