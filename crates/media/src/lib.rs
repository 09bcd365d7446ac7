//! External decoding tools for the ambry indexing core.
//!
//! Everything in here wraps a decoder that is known to hang or crash on
//! malformed input: the in-process `image` codecs run behind
//! `spawn_blocking`, while ffmpeg, ffprobe and the vector rasterizer run as
//! child processes that are killed when their wall-clock budget elapses.
//! Temporary output files are handles that delete themselves on every exit
//! path.

mod error;
pub mod image_ops;
mod probe;
mod svg;
mod video;

pub use error::MediaError;
pub use image_ops::{generate_thumbnail, ThumbnailParams};
pub use probe::{FfprobeProbe, MediaInfo, MediaProbe};
pub use svg::{CommandRasterizer, VectorRasterizer};
pub use video::{FfmpegFrameExtractor, FrameExtractor};
