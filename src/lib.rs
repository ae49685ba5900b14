pub mod cmaf;
pub mod dvr;
pub mod error;
pub mod key_manager;
pub mod model;
pub mod playlist;
pub mod pusher;
pub mod segmenter;
