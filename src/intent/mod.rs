pub mod fingerprint;
pub mod model;
pub mod normalize;

pub use fingerprint::{fingerprint, fingerprint_value};
pub use model::*;
pub use normalize::{normalize_as, DEFAULT_EXTRACTION_VERSION};
