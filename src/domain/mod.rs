// Domain layer: models and the seams (ports) the adapters plug into.

pub mod model;
pub mod ports;
