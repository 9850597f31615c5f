mod artifact;

pub use artifact::{library_path, MavenCoordinate};
