pub mod ffmpeg_backend;
