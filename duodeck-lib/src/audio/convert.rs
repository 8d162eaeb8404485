//! Sample format conversion helpers for decoded packets.

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::conv::FromSample;
use symphonia::core::sample::Sample;

/// Append a decoded packet to `out` as interleaved stereo `f32`.
///
/// Mono input is duplicated to both channels; channels beyond the second are
/// dropped.
pub fn append_stereo(decoded: &AudioBufferRef<'_>, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::U8(buf) => interleave(buf, out),
        AudioBufferRef::U16(buf) => interleave(buf, out),
        AudioBufferRef::U24(buf) => interleave(buf, out),
        AudioBufferRef::U32(buf) => interleave(buf, out),
        AudioBufferRef::S8(buf) => interleave(buf, out),
        AudioBufferRef::S16(buf) => interleave(buf, out),
        AudioBufferRef::S24(buf) => interleave(buf, out),
        AudioBufferRef::S32(buf) => interleave(buf, out),
        AudioBufferRef::F32(buf) => interleave(buf, out),
        AudioBufferRef::F64(buf) => interleave(buf, out),
    }
}

fn interleave<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample,
    f32: FromSample<S>,
{
    let channels = buf.spec().channels.count();
    if channels == 0 || buf.frames() == 0 {
        return;
    }

    let left = buf.chan(0);
    let right = if channels > 1 { buf.chan(1) } else { buf.chan(0) };

    out.reserve(left.len() * 2);
    for (&l, &r) in left.iter().zip(right.iter()) {
        out.push(f32::from_sample(l));
        out.push(f32::from_sample(r));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::audio::{Channels, SignalSpec};

    #[test]
    fn mono_is_duplicated_to_both_channels() {
        let spec = SignalSpec::new(8_000, Channels::FRONT_LEFT);
        let mut buf = AudioBuffer::<i16>::new(4, spec);
        buf.render_reserved(Some(2));
        buf.chan_mut(0).copy_from_slice(&[i16::MAX, i16::MIN]);

        let mut out = Vec::new();
        append_stereo(&AudioBufferRef::S16(std::borrow::Cow::Borrowed(&buf)), &mut out);

        assert_eq!(out.len(), 4);
        assert_eq!(out[0], out[1]);
        assert_eq!(out[2], out[3]);
        assert!(out[0] > 0.99);
        assert!(out[2] <= -1.0);
    }

    #[test]
    fn stereo_keeps_channel_order() {
        let spec = SignalSpec::new(8_000, Channels::FRONT_LEFT | Channels::FRONT_RIGHT);
        let mut buf = AudioBuffer::<f32>::new(4, spec);
        buf.render_reserved(Some(1));
        buf.chan_mut(0)[0] = 0.25;
        buf.chan_mut(1)[0] = -0.5;

        let mut out = Vec::new();
        append_stereo(&AudioBufferRef::F32(std::borrow::Cow::Borrowed(&buf)), &mut out);

        assert_eq!(out, vec![0.25, -0.5]);
    }
}
