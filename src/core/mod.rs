// Domain-layer modules and shared errors/models
pub mod metrics {
    pub use crate::metrics::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod services {
    pub use crate::services::*;
}

pub mod errors {
    pub use crate::errors::*;
}

pub mod validation {
    pub use crate::validation::*;
}

pub mod tags {
    pub use crate::tags::*;
}
