pub mod image_file_source;
pub mod synthetic_camera;
