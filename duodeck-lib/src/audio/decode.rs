//! Decoder boundary and the symphonia-backed implementation.

use std::fs::File;
use std::path::Path;

use log::{debug, warn};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::DecodeError;

use super::convert::append_stereo;
use super::source::PcmSource;

/// Turns an input file into a [`PcmSource`].
///
/// Decks call this from the control domain only.
pub trait AudioDecoder: Send + Sync {
    /// Decode the whole input into memory.
    fn decode(&self, path: &Path) -> Result<PcmSource, DecodeError>;

    /// Length of the input in seconds.
    ///
    /// Implementations may answer from container metadata; the default
    /// decodes the file.
    fn probe_length(&self, path: &Path) -> Result<f64, DecodeError> {
        Ok(self.decode(path)?.length_in_seconds())
    }
}

/// Decoder using symphonia's default codec and format registries.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<PcmSource, DecodeError> {
        let mut format = open_reader(path)?;
        let (track_id, mut decoder, sample_rate) = open_decoder(format.as_ref())?;

        let mut samples = Vec::new();
        let mut sample_rate = sample_rate;
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(Error::ResetRequired) => break,
                Err(err) => return Err(err.into()),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    if sample_rate == 0 {
                        sample_rate = decoded.spec().rate;
                    }
                    append_stereo(&decoded, &mut samples);
                }
                Err(Error::DecodeError(err)) => {
                    warn!("decode error in {}: {}", path.display(), err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        if samples.is_empty() || sample_rate == 0 {
            return Err(DecodeError::Empty);
        }

        let source = PcmSource::from_interleaved(samples, sample_rate);
        debug!(
            "decoded {} ({} frames @ {} Hz)",
            path.display(),
            source.frames(),
            source.sample_rate()
        );
        Ok(source)
    }

    fn probe_length(&self, path: &Path) -> Result<f64, DecodeError> {
        let format = open_reader(path)?;
        let track = default_track(format.as_ref())?;
        let params = &track.codec_params;
        match (params.n_frames, params.sample_rate) {
            (Some(frames), Some(rate)) if rate > 0 => Ok(frames as f64 / rate as f64),
            _ => Ok(self.decode(path)?.length_in_seconds()),
        }
    }
}

/// Build a symphonia `FormatReader` for the given file path.
fn open_reader(path: &Path) -> Result<Box<dyn FormatReader>, DecodeError> {
    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    Ok(probed.format)
}

fn default_track(format: &dyn FormatReader) -> Result<&symphonia::core::formats::Track, DecodeError> {
    format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)
}

/// Build a decoder for the first decodable track.
fn open_decoder(format: &dyn FormatReader) -> Result<(u32, Box<dyn Decoder>, u32), DecodeError> {
    let track = default_track(format)?;
    let dec_opts: DecoderOptions = Default::default();
    let decoder = symphonia::default::get_codecs().make(&track.codec_params, &dec_opts)?;
    Ok((
        track.id,
        decoder,
        track.codec_params.sample_rate.unwrap_or(0),
    ))
}
