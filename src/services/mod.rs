mod multipart_upload_reaper;
mod repository_scanner;
mod upload_folder_reaper;

pub use multipart_upload_reaper::MultipartUploadReaper;
pub use repository_scanner::RepositoryScanner;
pub use upload_folder_reaper::UploadFolderReaper;
