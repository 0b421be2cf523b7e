pub mod frame_sampler;
pub mod media_scanner;
