//! MPEG-4 AudioSpecificConfig marshaling

use bytes::Bytes;

/// MPEG-4 audio object types this adapter understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioObjectType {
    /// AAC main profile
    AacMain,
    /// AAC low complexity
    AacLc,
    /// AAC scalable sample rate
    AacSsr,
    /// AAC long term prediction
    AacLtp,
    /// Spectral band replication (HE-AAC)
    Sbr,
}

impl AudioObjectType {
    /// Wire value of this object type
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::AacMain => 1,
            Self::AacLc => 2,
            Self::AacSsr => 3,
            Self::AacLtp => 4,
            Self::Sbr => 5,
        }
    }
}

/// Sampling frequency index table (ISO/IEC 14496-3)
const SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// Index value signalling an explicit 24-bit frequency follows
const FREQUENCY_ESCAPE: u64 = 0x0F;

/// Out-of-band audio configuration for an MPEG-4 audio stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSpecificConfig {
    /// Audio object type
    pub object_type: AudioObjectType,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channel_count: u8,
}

impl AudioSpecificConfig {
    /// Marshal to the wire bit layout
    ///
    /// 5-bit object type, 4-bit frequency index (escape value followed by a
    /// 24-bit explicit rate for non-table rates), 4-bit channel
    /// configuration, zero GA-specific trailer bits.
    #[must_use]
    pub fn marshal(&self) -> Bytes {
        let mut writer = BitWriter::default();

        writer.push(u64::from(self.object_type.as_u8()), 5);

        match SAMPLE_RATES.iter().position(|&r| r == self.sample_rate) {
            Some(index) => writer.push(index as u64, 4),
            None => {
                writer.push(FREQUENCY_ESCAPE, 4);
                writer.push(u64::from(self.sample_rate), 24);
            }
        }

        writer.push(u64::from(self.channel_count), 4);

        // GASpecificConfig: frame length flag, core coder dependency,
        // extension flag, all zero
        writer.push(0, 3);

        writer.finish()
    }
}

/// MSB-first bit accumulator for the ASC layout (fits in 64 bits)
#[derive(Default)]
struct BitWriter {
    bits: u64,
    len: u32,
}

impl BitWriter {
    fn push(&mut self, value: u64, width: u32) {
        self.bits = (self.bits << width) | (value & ((1u64 << width) - 1));
        self.len += width;
    }

    fn finish(mut self) -> Bytes {
        if self.len % 8 != 0 {
            let pad = 8 - self.len % 8;
            self.push(0, pad);
        }

        let mut out = Vec::with_capacity((self.len / 8) as usize);
        let mut remaining = self.len;
        while remaining > 0 {
            remaining -= 8;
            out.push(((self.bits >> remaining) & 0xFF) as u8);
        }

        Bytes::from(out)
    }
}
