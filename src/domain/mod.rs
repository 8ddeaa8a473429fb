// Domain layer: models and ports (interfaces) shared by the client, the
// projector and the pipeline.

pub mod model;
pub mod ports;
