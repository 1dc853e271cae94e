//! Encode job description and the capsule's fixed encoder arguments.

use crate::staging::{FRAME_PATTERN, OUTPUT_FILE_NAME};
use capsule_core::capsule::{FPS, TOTAL_FRAMES};

/// Arguments for one engine run plus what the driver needs to track it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    /// Full argument list, inputs and output named relative to engine storage.
    pub args: Vec<String>,
    /// Name of the file the run produces.
    pub output: String,
    /// Frames the run will encode, used to turn frame counts into ratios.
    pub expected_frames: u32,
}

/// Builder for the capsule encode: a numbered PNG sequence in, H.264 MP4
/// with fast-start out.
#[derive(Debug, Clone)]
pub struct CapsuleEncodeArgs {
    pub fps: u32,
    pub frames: u32,
    pub input_pattern: String,
    pub output: String,
    pub codec: String,
    pub pixel_format: String,
}

impl Default for CapsuleEncodeArgs {
    fn default() -> Self {
        Self {
            fps: FPS,
            frames: TOTAL_FRAMES,
            input_pattern: FRAME_PATTERN.into(),
            output: OUTPUT_FILE_NAME.into(),
            codec: "libx264".into(),
            pixel_format: "yuv420p".into(),
        }
    }
}

impl CapsuleEncodeArgs {
    pub fn build(&self) -> EncodeRequest {
        let args = vec![
            "-y".into(),
            "-framerate".into(),
            self.fps.to_string(),
            "-start_number".into(),
            "0".into(),
            "-i".into(),
            self.input_pattern.clone(),
            "-frames:v".into(),
            self.frames.to_string(),
            "-c:v".into(),
            self.codec.clone(),
            "-pix_fmt".into(),
            self.pixel_format.clone(),
            "-movflags".into(),
            "+faststart".into(),
            // yuv420p needs even dimensions.
            "-vf".into(),
            "pad=ceil(iw/2)*2:ceil(ih/2)*2".into(),
            self.output.clone(),
        ];
        EncodeRequest {
            args,
            output: self.output.clone(),
            expected_frames: self.frames,
        }
    }
}
