mod bucket_name;
mod object_key;
mod repository_prefix;

pub use bucket_name::BucketName;
pub use object_key::ObjectKey;
pub use repository_prefix::{repositories_root, RepositoryPrefix, REPOSITORIES_PATH};
