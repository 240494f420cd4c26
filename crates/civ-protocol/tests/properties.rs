//! Property tests for the CI-V codecs

use civ_protocol::bcd;
use civ_protocol::frame::{Frame, FrameBuffer, MULTI_BYTE_COMMANDS, PREAMBLE, TERMINATOR};
use civ_protocol::memory::{MemoryChannel, MAX_CHANNEL};
use civ_protocol::Mode;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Any byte that is not a framing byte
fn data_byte() -> impl Strategy<Value = u8> {
    any::<u8>().prop_filter("framing byte", |b| *b != PREAMBLE && *b != TERMINATOR)
}

/// Frames that survive the sub-command heuristic unchanged
fn well_formed_frame() -> impl Strategy<Value = Frame> {
    (
        data_byte(),
        data_byte(),
        data_byte(),
        data_byte(),
        prop::collection::vec(data_byte(), 0..24),
    )
        .prop_map(|(destination, source, command, sub, payload)| {
            let sub_command = MULTI_BYTE_COMMANDS.contains(&command).then_some(sub);
            Frame {
                destination,
                source,
                command,
                sub_command,
                payload,
            }
        })
}

fn mode() -> impl Strategy<Value = Mode> {
    prop_oneof![
        Just(Mode::Lsb),
        Just(Mode::Usb),
        Just(Mode::Am),
        Just(Mode::Cw),
        Just(Mode::Rtty),
        Just(Mode::Fm),
        Just(Mode::Wfm),
        Just(Mode::CwR),
        Just(Mode::RttyR),
        Just(Mode::Dv),
    ]
}

fn memory_channel() -> impl Strategy<Value = MemoryChannel> {
    (
        0..=MAX_CHANNEL,
        0u64..=9_999_999_999,
        mode(),
        prop::option::of(0u8..=0xFE),
        prop::option::of(any::<bool>()),
        prop::option::of((-99_999i64..=99_999).prop_filter("zero", |u| *u != 0)),
        prop::option::of(1u32..=9999),
        prop::option::of("[A-Z0-9 -]{0,9}[A-Z0-9]"),
    )
        .prop_map(
            |(number, frequency_hz, mode, filter, data_mode, offset_units, tone_tenths, name)| {
                MemoryChannel {
                    number,
                    frequency_hz,
                    mode,
                    filter,
                    data_mode,
                    duplex_offset_hz: offset_units.map(|u| u * 100),
                    tone_hz: tone_tenths.map(|t| t as f64 / 10.0),
                    name,
                }
            },
        )
}

// ============================================================================
// BCD
// ============================================================================

proptest! {
    #[test]
    fn frequency_round_trip(hz in 0u64..=9_999_999_999) {
        let encoded = bcd::encode_frequency(hz);
        prop_assert_eq!(bcd::decode_frequency(&encoded).unwrap(), hz);
    }

    #[test]
    fn frequency_bytes_are_valid_bcd(hz in 0u64..=9_999_999_999) {
        prop_assert!(bcd::encode_frequency(hz).iter().all(|b| b >> 4 <= 9 && b & 0x0F <= 9));
    }

    #[test]
    fn four_byte_frequency_round_trip(hz in 0u64..=99_999_999) {
        let encoded = bcd::encode_frequency_width(hz, 4);
        prop_assert_eq!(bcd::decode_frequency(&encoded).unwrap(), hz);
    }

    #[test]
    fn level_round_trip(level: u8) {
        prop_assert_eq!(bcd::decode_level(&bcd::encode_level(level)).unwrap(), level);
    }

    #[test]
    fn signed_offset_round_trip(offset in -9999i64..=9999) {
        let encoded = bcd::encode_signed_offset(offset, 4);
        prop_assert_eq!(encoded.len(), 3);
        prop_assert_eq!(bcd::decode_signed_offset(&encoded).unwrap(), offset);
    }

    #[test]
    fn signed_offset_sign_bit_iff_negative(offset in -9999i64..=9999) {
        let encoded = bcd::encode_signed_offset(offset, 4);
        let sign_set = encoded[2] & bcd::OFFSET_SIGN_BIT != 0;
        prop_assert_eq!(sign_set, offset < 0);
    }

    #[test]
    fn big_endian_round_trip(value in 0u32..=9999) {
        prop_assert_eq!(bcd::decode_bcd_be(&bcd::encode_bcd_be(value, 4)).unwrap(), value);
    }
}

// ============================================================================
// Frames
// ============================================================================

proptest! {
    #[test]
    fn frame_round_trip(frame in well_formed_frame()) {
        let parsed = Frame::parse(&frame.to_bytes()).unwrap();
        prop_assert_eq!(parsed, frame);
    }

    #[test]
    fn frame_buffer_reassembles_split_writes(
        frames in prop::collection::vec(well_formed_frame(), 1..5),
        split in 1usize..8,
    ) {
        let stream: Vec<u8> = frames.iter().flat_map(|f| f.to_bytes()).collect();
        let mut buffer = FrameBuffer::new();
        let mut decoded = Vec::new();

        for chunk in stream.chunks(split) {
            buffer.push_bytes(chunk);
            while let Some(frame) = buffer.next_frame() {
                decoded.push(frame);
            }
        }

        prop_assert_eq!(decoded, frames);
    }

    #[test]
    fn parse_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..40)) {
        let _ = Frame::parse(&bytes);
    }
}

// ============================================================================
// Memory channels
// ============================================================================

proptest! {
    #[test]
    fn memory_channel_round_trip(channel in memory_channel()) {
        prop_assert!(channel.validate().is_ok());
        let decoded = MemoryChannel::decode(&channel.encode()).unwrap();
        prop_assert_eq!(decoded, channel);
    }
}
