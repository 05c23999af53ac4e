// Domain layer: record models and the transport port. No HTTP code here.

pub mod model;
pub mod ports;
