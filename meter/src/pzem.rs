use crc::{Crc, CRC_16_MODBUS};
use thiserror::Error;

use energymon_common::SensorSample;

// PZEM-004T v3.0 speaks Modbus-RTU at 9600 8N1. All six metrics live in
// one 10-register input block, read with function 0x04.
pub const DEFAULT_ADDR: u8 = 0xF8;

const READ_INPUT_REGISTERS: u8 = 0x04;
const MEASUREMENT_REG_COUNT: u16 = 10;
const DATA_LEN: usize = 2 * MEASUREMENT_REG_COUNT as usize;
pub const RESPONSE_LEN: usize = 3 + DATA_LEN + 2;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PzemError {
    #[error("no response from meter")]
    Timeout,
    #[error("short frame ({0} bytes)")]
    ShortFrame(usize),
    #[error("crc mismatch")]
    Crc,
    #[error("meter exception code {0:#04x}")]
    Exception(u8),
    #[error("unexpected frame header")]
    Header,
    #[error("serial transfer failed: {0}")]
    Serial(String),
}

pub fn read_request(addr: u8) -> [u8; 8] {
    let mut frame = [
        addr,
        READ_INPUT_REGISTERS,
        0x00,
        0x00,
        (MEASUREMENT_REG_COUNT >> 8) as u8,
        (MEASUREMENT_REG_COUNT & 0xFF) as u8,
        0x00,
        0x00,
    ];
    let crc = CRC16.checksum(&frame[..6]);
    frame[6] = (crc & 0xFF) as u8;
    frame[7] = (crc >> 8) as u8;
    frame
}

pub fn decode_response(addr: u8, frame: &[u8]) -> Result<SensorSample, PzemError> {
    if frame.is_empty() {
        return Err(PzemError::Timeout);
    }
    if frame.len() >= 5 && frame[0] == addr && frame[1] == READ_INPUT_REGISTERS | 0x80 {
        return Err(PzemError::Exception(frame[2]));
    }
    if frame.len() < RESPONSE_LEN {
        return Err(PzemError::ShortFrame(frame.len()));
    }

    let frame = &frame[..RESPONSE_LEN];
    let received = u16::from(frame[RESPONSE_LEN - 2]) | u16::from(frame[RESPONSE_LEN - 1]) << 8;
    if CRC16.checksum(&frame[..RESPONSE_LEN - 2]) != received {
        return Err(PzemError::Crc);
    }
    if frame[0] != addr || frame[1] != READ_INPUT_REGISTERS || frame[2] as usize != DATA_LEN {
        return Err(PzemError::Header);
    }

    let reg = |index: usize| -> u32 {
        u32::from(frame[3 + 2 * index]) << 8 | u32::from(frame[4 + 2 * index])
    };
    // 32-bit quantities arrive low word first.
    let reg32 = |index: usize| -> u32 { reg(index) | reg(index + 1) << 16 };

    Ok(SensorSample {
        voltage: Some(reg(0) as f32 / 10.0),
        current: Some(reg32(1) as f32 / 1000.0),
        power: Some(reg32(3) as f32 / 10.0),
        energy: Some(reg32(5) as f32 / 1000.0),
        frequency: Some(reg(7) as f32 / 10.0),
        power_factor: Some(reg(8) as f32 / 100.0),
    })
}

#[cfg(feature = "esp32")]
mod transport {
    use std::time::{Duration, Instant};

    use esp_idf_hal::{delay::TickType, uart::UartDriver};
    use log::warn;

    use energymon_common::SensorSample;

    use super::{decode_response, read_request, PzemError, DEFAULT_ADDR, RESPONSE_LEN};

    const READ_TIMEOUT_MS: u64 = 200;
    const READ_SLICE_MS: u64 = 20;

    pub struct Pzem<'d> {
        uart: UartDriver<'d>,
        addr: u8,
    }

    impl<'d> Pzem<'d> {
        pub fn new(uart: UartDriver<'d>) -> Self {
            Self {
                uart,
                addr: DEFAULT_ADDR,
            }
        }

        // Never fails: a frame-level problem is logged and surfaces as an
        // all-invalid sample, which the reading model coerces to zeroes.
        pub fn read_sample(&mut self) -> SensorSample {
            match self.transact() {
                Ok(sample) => sample,
                Err(err) => {
                    warn!("pzem read failed: {err}");
                    SensorSample::default()
                }
            }
        }

        fn transact(&mut self) -> Result<SensorSample, PzemError> {
            let serial = |err: esp_idf_sys::EspError| PzemError::Serial(err.to_string());

            self.uart.clear_rx().map_err(serial)?;
            self.uart.write(&read_request(self.addr)).map_err(serial)?;
            self.uart
                .wait_tx_done(TickType::new_millis(READ_TIMEOUT_MS).ticks())
                .map_err(serial)?;

            let mut frame = [0_u8; RESPONSE_LEN];
            let mut filled = 0;
            let deadline = Instant::now() + Duration::from_millis(READ_TIMEOUT_MS);

            while filled < RESPONSE_LEN && Instant::now() < deadline {
                let read = self
                    .uart
                    .read(
                        &mut frame[filled..],
                        TickType::new_millis(READ_SLICE_MS).ticks(),
                    )
                    .map_err(serial)?;
                filled += read;
            }

            if filled == 0 {
                return Err(PzemError::Timeout);
            }
            decode_response(self.addr, &frame[..filled])
        }
    }
}

#[cfg(feature = "esp32")]
pub use transport::Pzem;

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    // Builds a well-formed response frame from raw register values.
    fn response(addr: u8, regs: [u16; 10]) -> Vec<u8> {
        let mut frame = vec![addr, READ_INPUT_REGISTERS, DATA_LEN as u8];
        for reg in regs {
            frame.push((reg >> 8) as u8);
            frame.push((reg & 0xFF) as u8);
        }
        let crc = CRC16.checksum(&frame);
        frame.push((crc & 0xFF) as u8);
        frame.push((crc >> 8) as u8);
        frame
    }

    // 230.5 V, 1.2 A, 276.6 W, 3417 Wh, 50.0 Hz, pf 0.95.
    fn measurement_regs() -> [u16; 10] {
        [2305, 1200, 0, 2766, 0, 3417, 0, 500, 95, 0]
    }

    #[test]
    fn request_frame_matches_protocol() {
        let frame = read_request(DEFAULT_ADDR);

        assert_eq!(&frame[..6], &[0xF8, 0x04, 0x00, 0x00, 0x00, 0x0A]);

        let crc = u16::from(frame[6]) | u16::from(frame[7]) << 8;
        assert_eq!(crc, CRC16.checksum(&frame[..6]));
    }

    #[test]
    fn decodes_scaled_measurements() {
        let sample = decode_response(DEFAULT_ADDR, &response(DEFAULT_ADDR, measurement_regs()))
            .unwrap();

        assert_eq!(sample.voltage, Some(230.5));
        assert_eq!(sample.current, Some(1.2));
        assert_eq!(sample.power, Some(276.6));
        assert_eq!(sample.energy, Some(3.417));
        assert_eq!(sample.frequency, Some(50.0));
        assert_eq!(sample.power_factor, Some(0.95));
    }

    #[test]
    fn decodes_high_word_of_wide_registers() {
        let mut regs = measurement_regs();
        // 0x0001_0000 Wh = 65536 Wh.
        regs[5] = 0;
        regs[6] = 1;

        let sample = decode_response(DEFAULT_ADDR, &response(DEFAULT_ADDR, regs)).unwrap();

        assert_eq!(sample.energy, Some(65.536));
    }

    #[test]
    fn corrupted_crc_is_rejected() {
        let mut frame = response(DEFAULT_ADDR, measurement_regs());
        frame[4] ^= 0xFF;

        assert_eq!(
            decode_response(DEFAULT_ADDR, &frame),
            Err(PzemError::Crc)
        );
    }

    #[test]
    fn short_frame_is_rejected() {
        let frame = response(DEFAULT_ADDR, measurement_regs());

        assert_eq!(
            decode_response(DEFAULT_ADDR, &frame[..10]),
            Err(PzemError::ShortFrame(10))
        );
    }

    #[test]
    fn exception_frame_surfaces_code() {
        let mut frame = vec![DEFAULT_ADDR, READ_INPUT_REGISTERS | 0x80, 0x02];
        let crc = CRC16.checksum(&frame);
        frame.push((crc & 0xFF) as u8);
        frame.push((crc >> 8) as u8);

        assert_eq!(
            decode_response(DEFAULT_ADDR, &frame),
            Err(PzemError::Exception(0x02))
        );
    }

    #[test]
    fn empty_frame_is_a_timeout() {
        assert_eq!(decode_response(DEFAULT_ADDR, &[]), Err(PzemError::Timeout));
    }

    #[test]
    fn wrong_address_is_rejected() {
        let frame = response(0x01, measurement_regs());

        assert_eq!(
            decode_response(DEFAULT_ADDR, &frame),
            Err(PzemError::Header)
        );
    }
}
