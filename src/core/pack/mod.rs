mod container;

pub use container::{
    ChecksumManifest, ContainerTranscoder, ExternalUnpack200, Pack200Unpacker, CHECKSUMS_ENTRY,
};
