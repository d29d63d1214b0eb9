mod endpoint;
mod manifest_endpoint;
mod memory_endpoint;
mod transport_registry;

pub use endpoint::{Endpoint, EndpointError};
pub use manifest_endpoint::ManifestEndpoint;
pub use memory_endpoint::MemoryEndpoint;
pub use transport_registry::{DialContext, RegistryError, TransportHandler, TransportRegistry};
