use approx::assert_abs_diff_eq;
use ntd_codec::test_utils::{be, NcdFileBuilder, NtdFileBuilder};
use ntd_codec::{
    decode, decode_ncd_bars, decode_ncd_ticks, decode_ntd_ticks, decode_prefix, Format,
    NCD_HEADER_LEN,
};
use ntd_core::{Error, Record, Tick, TICKS_PER_SECOND};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const NCD_T0: i64 = 637_284_708_000_000_000;
const NTD_T0: i64 = 633_979_008_000_000_000;

fn ncd_tick_fixture() -> NcdFileBuilder {
    NcdFileBuilder::new(0.25, 100.25, NCD_T0)
        // unchanged, volume 5
        .record(0x00, 0b0010_0000, &[5])
        // +10 ticks, inline +3, volume 2
        .record(0b0100_0001, 0b0011_0011, &[10, 2])
        // +3 s, -8, bid one below, volume 400
        .record(0b1000_1101, 0b0100_0000, &[3, 120, 4])
        // +500 ticks, +6, packed spread, volume 1234
        .record(
            0b1111_0010,
            0b1010_0000,
            &[be(500, 2), be((1 << 31) + 6, 4), vec![0x13], be(1234, 2)].concat(),
        )
        // +1 min, separate spread bytes, 8-byte volume
        .record(
            0b0011_1100,
            0b1110_0000,
            &[be(60 * TICKS_PER_SECOND as u64, 8), vec![2, 3], be(1 << 35, 8)].concat(),
        )
}

fn ncd_minute_fixture() -> NcdFileBuilder {
    NcdFileBuilder::new(0.25, 9950.0, NCD_T0)
        .record(0b0010_0000, 0b0001_0000, &[1, 12])
        .record(0b0100_0101, 0b0101_0101, &[5, 130, 4, 2, 1, 3])
        .record(
            0b1010_1010,
            0b0000_0010,
            &[be((1 << 15) + 30, 2), be((1 << 15) - 4, 2), be(3, 2), be(777, 2)].concat(),
        )
}

fn ntd_fixture() -> NtdFileBuilder {
    NtdFileBuilder::new(0.01, 25.37, NTD_T0, 300)
        .record(0b0001_0001, &[30, 9])
        .record(0b0011_0110, &[be(90, 2), vec![127, 5]].concat())
        .record(
            0b0110_1011,
            &[be(3600, 3), be((1 << 15) + 250, 2), be(4000, 2)].concat(),
        )
        .record(0b0111_1100, &[be((1 << 31) - 1000, 4), be(70_000, 4)].concat())
}

fn fixtures() -> Vec<(Format, NcdOrNtd)> {
    vec![
        (Format::NcdTick, NcdOrNtd::Ncd(ncd_tick_fixture())),
        (Format::NcdMinute, NcdOrNtd::Ncd(ncd_minute_fixture())),
        (Format::NtdTick, NcdOrNtd::Ntd(ntd_fixture())),
    ]
}

enum NcdOrNtd {
    Ncd(NcdFileBuilder),
    Ntd(NtdFileBuilder),
}

impl NcdOrNtd {
    fn record_ends(&self) -> Vec<usize> {
        match self {
            NcdOrNtd::Ncd(b) => b.record_ends().to_vec(),
            NcdOrNtd::Ntd(b) => b.record_ends().to_vec(),
        }
    }

    fn build(self) -> Vec<u8> {
        match self {
            NcdOrNtd::Ncd(b) => b.build(),
            NcdOrNtd::Ntd(b) => b.build(),
        }
    }
}

fn decode_ok(format: Format, bytes: &[u8]) -> Vec<Record> {
    let (records, err) = decode_prefix(decode(format, bytes).unwrap());
    assert!(err.is_none(), "{format} fixture failed: {err:?}");
    records
}

#[test]
fn test_decoding_is_deterministic() {
    for (format, fixture) in fixtures() {
        let bytes = fixture.build();
        let first = decode_ok(format, &bytes);
        let second = decode_ok(format, &bytes);
        assert!(!first.is_empty());
        assert_eq!(first, second, "{format}");
    }
}

#[test]
fn test_timestamps_never_decrease() {
    for (format, fixture) in fixtures() {
        let records = decode_ok(format, &fixture.build());
        for pair in records.windows(2) {
            assert!(
                pair[1].timestamp() >= pair[0].timestamp(),
                "{format}: {:?} before {:?}",
                pair[1].timestamp(),
                pair[0].timestamp()
            );
        }
    }
}

#[test]
fn test_ncd_prices_stay_on_increment_grid() {
    let increment = 0.25;
    let ticks: Vec<Tick> = decode_ncd_ticks(&ncd_tick_fixture().build())
        .unwrap()
        .collect::<ntd_core::Result<_>>()
        .unwrap();

    for tick in &ticks {
        for price in [Some(tick.price), tick.bid, tick.ask].into_iter().flatten() {
            let steps = (price.into_inner() - 100.25) / increment;
            assert_abs_diff_eq!(steps, steps.round(), epsilon = 1e-9);
        }
    }

    let minute_bytes = ncd_minute_fixture().build();
    let bars = decode_ncd_bars(&minute_bytes).unwrap();
    for bar in bars {
        let bar = bar.unwrap();
        for price in [bar.open, bar.high, bar.low, bar.close] {
            let steps = (price.into_inner() - 9950.0) / increment;
            assert_abs_diff_eq!(steps, steps.round(), epsilon = 1e-9);
        }
    }
}

#[test]
fn test_ten_thousand_tick_steps_do_not_drift() {
    // Inline price delta +1 on an increment with no exact binary form.
    let bytes = NcdFileBuilder::new(0.1, 100.0, NCD_T0)
        .repeat(10_000, 0b0100_0000, 0b0011_0001, &[1])
        .build();
    let ticks: Vec<Tick> = decode_ncd_ticks(&bytes)
        .unwrap()
        .collect::<ntd_core::Result<_>>()
        .unwrap();

    assert_eq!(ticks.len(), 10_000);
    for (i, tick) in ticks.iter().enumerate() {
        let expected = 100.0 + 0.1 * (i as f64 + 1.0);
        assert_abs_diff_eq!(tick.price.into_inner(), expected, epsilon = 1e-9);
    }
    assert_eq!(ticks[9_999].price.into_inner(), 1100.0);
}

#[test]
fn test_ten_thousand_alternating_steps_return_home() {
    let bytes = NcdFileBuilder::new(0.1, 100.0, NCD_T0)
        .repeat(5_000, 0b0100_0000, 0b0010_0000 | (16 + 7), &[1])
        .repeat(5_000, 0b0100_0000, 0b0010_0000 | (16 - 7), &[1])
        .build();
    let last = decode_ncd_ticks(&bytes).unwrap().last().unwrap().unwrap();

    assert_eq!(last.price.into_inner(), 100.0);
}

#[test]
fn test_ten_thousand_bar_opens_do_not_drift() {
    // +1 minute, open +1 increment, no legs, volume code 000.
    let bytes = NcdFileBuilder::new(0.25, 9950.0, NCD_T0)
        .repeat(10_000, 0b0000_0100, 0x00, &[129])
        .build();
    let bars: Vec<_> = decode_ncd_bars(&bytes)
        .unwrap()
        .collect::<ntd_core::Result<Vec<_>>>()
        .unwrap();

    assert_eq!(bars.len(), 10_000);
    assert_eq!(bars[9_999].open.into_inner(), 12_450.0);
    assert_eq!(bars[9_999].close, bars[9_999].open);
}

#[test]
fn test_ntd_decimal_prices_are_exact() {
    // Alternate +7 and -3 cents: 5,000 pairs end 200.00 above the start.
    let mut builder = NtdFileBuilder::new(0.01, 25.37, NTD_T0, 1);
    for i in 0..10_000 {
        let raw = if i % 2 == 0 { 128 + 7 } else { 128 - 3 };
        builder = builder.record(0b0001_0101, &[1, raw, 1]);
    }
    let bytes = builder.build();

    let mut reader = decode_ntd_ticks(&bytes).unwrap();
    let mut reference = dec!(25.37);
    let mut index = 0usize;
    while let Some(tick) = reader.next() {
        let tick = tick.unwrap();
        if index > 0 {
            reference += if index % 2 == 1 { dec!(0.07) } else { dec!(-0.03) };
        }
        assert_eq!(reader.state().price, reference);
        assert_eq!(tick.price.into_inner(), reference.to_f64().unwrap());
        index += 1;
    }

    assert_eq!(index, 10_001);
    assert_eq!(reference, dec!(225.37));
    assert_eq!(reader.state().price * Decimal::ONE_HUNDRED, dec!(22537));
}

#[test]
fn test_volumes_decode_as_unsigned() {
    let bytes = NcdFileBuilder::new(0.25, 100.0, NCD_T0)
        .record(0x00, 0b1110_0000, &be(u64::MAX, 8))
        .record(0x00, 0b1100_0000, &be(u32::MAX as u64, 4))
        .build();
    let volumes: Vec<u64> = decode_ncd_ticks(&bytes)
        .unwrap()
        .map(|t| t.unwrap().volume)
        .collect();
    assert_eq!(volumes, vec![u64::MAX, u32::MAX as u64]);

    let bytes = NtdFileBuilder::new(0.01, 10.0, NTD_T0, u64::MAX)
        .record(0b0111_0000, &be(u32::MAX as u64, 4))
        .build();
    let volumes: Vec<u64> = decode_ntd_ticks(&bytes)
        .unwrap()
        .map(|t| t.unwrap().volume)
        .collect();
    assert_eq!(volumes, vec![u64::MAX, u32::MAX as u64]);
}

#[test]
fn test_truncation_yields_prefix_then_fails() {
    for (format, fixture) in fixtures() {
        let ends = fixture.record_ends();
        let is_ntd = format == Format::NtdTick;
        let header_len = if is_ntd { 0x40 } else { NCD_HEADER_LEN };
        let bytes = fixture.build();

        for cut in header_len..bytes.len() {
            let complete = ends.iter().filter(|&&end| end <= cut).count();
            let (records, err) = decode_prefix(decode(format, &bytes[..cut]).unwrap());

            // The legacy header record is always yielded, and the record count
            // makes every cut short of the full file an error.
            let expected = if is_ntd { complete + 1 } else { complete };
            assert_eq!(records.len(), expected, "{format} cut at {cut}");

            let clean_cut = !is_ntd && (cut == header_len || ends.contains(&cut));
            if clean_cut {
                assert!(err.is_none(), "{format} cut at {cut}: {err:?}");
            } else {
                assert!(
                    matches!(err, Some(Error::TruncatedInput { .. })),
                    "{format} cut at {cut}: {err:?}"
                );
            }
        }
    }
}

#[test]
fn test_truncated_record_is_never_yielded() {
    let full = decode_ok(Format::NcdTick, &ncd_tick_fixture().build());
    let fixture = ncd_tick_fixture();
    let ends = fixture.record_ends().to_vec();
    let bytes = fixture.build();

    let (records, _) = decode_prefix(decode(Format::NcdTick, &bytes[..ends[3] - 1]).unwrap());
    assert_eq!(records, full[..3].to_vec());
}
