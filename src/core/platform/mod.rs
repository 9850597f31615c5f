pub mod target;

pub use target::{default_arch_names, ArchMapping, OperatingSystem, TargetDescriptor};
