mod registry_store;

pub use registry_store::RegistryStore;
