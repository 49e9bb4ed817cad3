pub mod collection;
pub mod distance;
pub mod landmark;
pub mod landmark_image;
pub mod repository;
pub mod selection;
pub mod snapshot;
pub mod triangulation;
pub mod virtual_camera;

pub use collection::*;
pub use distance::*;
pub use landmark::*;
pub use landmark_image::*;
pub use repository::*;
pub use selection::*;
pub use triangulation::*;
pub use virtual_camera::*;
