/// Sample encoding of an audio frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum AudioSampleType {
    #[default]
    Pcm16,
}

/// One block of interleaved PCM handed over by the engine.
///
/// The sample buffer is borrowed from the engine for the callback's duration.
#[derive(Debug)]
pub struct AudioFrame<'a> {
    pub sample_type: AudioSampleType,
    pub samples_per_channel: u32,
    pub bytes_per_sample: u32,
    pub channels: u32,
    pub samples_per_sec: u32,
    pub buffer: &'a mut [u8],
    pub render_time_ms: i64,
    pub avsync_type: i32,
}

impl AudioFrame<'_> {
    /// Byte length implied by the frame header.
    pub fn expected_len(&self) -> usize {
        self.samples_per_channel as usize * self.channels as usize * self.bytes_per_sample as usize
    }
}

/// Audio format an observer asks the engine to deliver.
///
/// All-zero means "engine default".
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct AudioParams {
    pub sample_rate: u32,
    pub channels: u32,
    pub samples_per_call: u32,
}
