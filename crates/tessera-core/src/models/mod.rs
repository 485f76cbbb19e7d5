pub mod descriptor;
pub mod upload;

pub use descriptor::{ArchiveStats, DescriptorFilter, NewDescriptor, StoredObjectDescriptor};
pub use upload::{AdmissionRejection, Bucket, BucketKind, RawFile, UploadCandidate};
