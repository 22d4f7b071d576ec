mod backend_factory;
pub mod codec;
mod engine;
pub mod handler;
pub mod upload;

pub use codec::{decode_image, encode_png, remove_background_to_png};
pub use engine::{BackgroundRemover, ImglyRemover, RemovalError};
pub use handler::{RemoveBgUpload, create_removal_router};
pub use upload::{FILE_FIELD, UploadedFile};
