pub mod decoder;
pub mod encoder;
pub mod reducer;
pub mod throttle;

pub use decoder::FrameDecoder;
pub use encoder::{encode_frame, fallback_done_frame, normalize_text, FrameSender};
pub use reducer::{ItemUpdate, StreamReducer};
pub use throttle::PersistThrottle;
