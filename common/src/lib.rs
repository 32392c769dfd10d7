pub mod model;
pub mod normalize;
pub mod req;
pub mod snapshot;
pub mod status;

pub use model::{Normalized, SensorData, SensorLog};
pub use normalize::{normalize, normalize_value};
pub use snapshot::{DecodeError, RawSnapshot};
