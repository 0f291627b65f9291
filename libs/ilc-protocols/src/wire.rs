//! Bit-packed wire buffer for the FPGA serial FIFOs.
//!
//! Every byte on the wire travels inside a 16-bit FIFO word: the byte sits in
//! bits 1..=8 and the upper nibble tags the word as outbound data, inbound
//! data, a timestamp byte or a control word. `WireBuffer` owns a fixed word
//! array and a cursor and exposes typed read/write primitives on top of the
//! tagged encoding.
//!
//! Multi-byte integers are big-endian on the wire. Floats use the inverted
//! order: least significant byte first, sign/exponent byte last.

use crate::constants::*;
use crate::error::{IlcError, Result};
use crate::timestamp;

/// Modbus CRC16 (polynomial 0xA001, init 0xFFFF) over raw bytes.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc >>= 1;
                crc ^= 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Decodes a 32-bit float from its wire byte order (LSB first).
pub fn sgl_from_wire(bytes: [u8; 4]) -> f32 {
    f32::from_le_bytes(bytes)
}

/// Encodes a 32-bit float into its wire byte order (LSB first).
pub fn sgl_to_wire(value: f32) -> [u8; 4] {
    value.to_le_bytes()
}

/// Fixed-capacity word buffer with a read/write cursor.
///
/// A buffer is created for one direction: `tx()` tags written bytes as
/// outbound instructions, `rx()` tags them as inbound data (used by
/// simulations and tests to synthesize responses).
pub struct WireBuffer {
    buffer: [u16; WIRE_BUFFER_SIZE],
    index: usize,
    length: usize,
    data_tag: u16,
}

impl WireBuffer {
    /// Creates an empty buffer for outbound commands.
    pub fn tx() -> Self {
        Self::with_tag(TX_DATA_TAG)
    }

    /// Creates an empty buffer for inbound responses.
    pub fn rx() -> Self {
        Self::with_tag(RX_DATA_TAG)
    }

    fn with_tag(data_tag: u16) -> Self {
        WireBuffer {
            buffer: [0; WIRE_BUFFER_SIZE],
            index: 0,
            length: 0,
            data_tag,
        }
    }

    /// Wraps words read from a response FIFO, cursor at the start.
    pub fn from_words(words: &[u16]) -> Result<Self> {
        if words.len() > WIRE_BUFFER_SIZE {
            return Err(IlcError::buffer_full(format!(
                "response of {} words exceeds buffer capacity {}",
                words.len(),
                WIRE_BUFFER_SIZE
            )));
        }
        let mut buf = Self::with_tag(RX_DATA_TAG);
        buf.buffer[..words.len()].copy_from_slice(words);
        buf.length = words.len();
        Ok(buf)
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Words written so far (the command image to hand to the FIFO).
    pub fn words(&self) -> &[u16] {
        &self.buffer[..self.length]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn inc_index(&mut self, count: usize) {
        self.index += count;
    }

    /// Resets cursor and length, keeping the direction tag.
    pub fn reset(&mut self) {
        self.index = 0;
        self.length = 0;
    }

    /// Overwrites a previously written word (length back-patching).
    pub fn set_word(&mut self, index: usize, word: u16) {
        self.buffer[index] = word;
    }

    // ------------------------------------------------------------------
    // Raw word access
    // ------------------------------------------------------------------

    /// Appends a raw word, enforcing capacity.
    pub fn push_raw(&mut self, word: u16) -> Result<()> {
        if self.length >= WIRE_BUFFER_SIZE {
            return Err(IlcError::buffer_full(format!(
                "wire buffer capacity {WIRE_BUFFER_SIZE} exceeded"
            )));
        }
        self.buffer[self.length] = word;
        self.length += 1;
        self.index = self.length;
        Ok(())
    }

    /// Next word without advancing. Returns 0 past the end.
    pub fn peek_raw(&self) -> u16 {
        if self.index < self.length {
            self.buffer[self.index]
        } else {
            0
        }
    }

    /// Reads the next word. Past the end returns 0 and does not advance.
    pub fn read_raw(&mut self) -> u16 {
        if self.index < self.length {
            let word = self.buffer[self.index];
            self.index += 1;
            word
        } else {
            0
        }
    }

    // ------------------------------------------------------------------
    // Byte-level reads (strip the tag, keep bits 1..=8)
    // ------------------------------------------------------------------

    fn read_byte(&mut self) -> u8 {
        ((self.read_raw() >> 1) & 0xFF) as u8
    }

    pub fn read_u8(&mut self) -> u8 {
        self.read_byte()
    }

    pub fn read_u16(&mut self) -> u16 {
        (u16::from(self.read_byte()) << 8) | u16::from(self.read_byte())
    }

    pub fn read_u32(&mut self) -> u32 {
        (u32::from(self.read_u16()) << 16) | u32::from(self.read_u16())
    }

    pub fn read_u48(&mut self) -> u64 {
        (u64::from(self.read_u16()) << 32) | u64::from(self.read_u32())
    }

    pub fn read_i8(&mut self) -> i8 {
        self.read_byte() as i8
    }

    pub fn read_i16(&mut self) -> i16 {
        self.read_u16() as i16
    }

    pub fn read_i24(&mut self) -> i32 {
        let raw = (i32::from(self.read_byte()) << 16)
            | (i32::from(self.read_byte()) << 8)
            | i32::from(self.read_byte());
        // sign-extend bit 23
        (raw << 8) >> 8
    }

    pub fn read_i32(&mut self) -> i32 {
        self.read_u32() as i32
    }

    pub fn read_sgl(&mut self) -> f32 {
        sgl_from_wire([
            self.read_byte(),
            self.read_byte(),
            self.read_byte(),
            self.read_byte(),
        ])
    }

    /// Reads the two CRC bytes trailing a frame (low byte first).
    pub fn read_crc(&mut self) -> u16 {
        u16::from(self.read_byte()) | (u16::from(self.read_byte()) << 8)
    }

    /// Reads the four timestamp words trailing a frame, low byte first,
    /// returning seconds.
    pub fn read_timestamp(&mut self) -> f64 {
        let mut raw: u64 = 0;
        for shift in 0..FRAME_TIMESTAMP_WORDS {
            raw |= u64::from(self.read_raw() & 0x00FF) << (shift * 8);
        }
        timestamp::raw_to_seconds(raw)
    }

    // ------------------------------------------------------------------
    // Byte-level writes
    // ------------------------------------------------------------------

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.push_raw((u16::from(byte) << 1) | self.data_tag)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_byte(value)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_byte((value >> 8) as u8)?;
        self.write_byte(value as u8)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_u16((value >> 16) as u16)?;
        self.write_u16(value as u16)
    }

    pub fn write_u48(&mut self, value: u64) -> Result<()> {
        self.write_u16((value >> 32) as u16)?;
        self.write_u32(value as u32)
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_byte(value as u8)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_u16(value as u16)
    }

    pub fn write_i24(&mut self, value: i32) -> Result<()> {
        self.write_byte((value >> 16) as u8)?;
        self.write_byte((value >> 8) as u8)?;
        self.write_byte(value as u8)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_u32(value as u32)
    }

    pub fn write_sgl(&mut self, value: f32) -> Result<()> {
        for byte in sgl_to_wire(value) {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // CRC
    // ------------------------------------------------------------------

    /// CRC16 over the `length` data words ending at the cursor.
    pub fn calculate_crc(&self, length: usize) -> u16 {
        let start = self.index - length;
        let mut crc: u16 = 0xFFFF;
        for word in &self.buffer[start..self.index] {
            crc ^= (word >> 1) & 0xFF;
            for _ in 0..8 {
                if crc & 0x0001 != 0 {
                    crc >>= 1;
                    crc ^= 0xA001;
                } else {
                    crc >>= 1;
                }
            }
        }
        crc
    }

    /// Appends the CRC of the preceding `length` data words, low byte first.
    pub fn write_crc(&mut self, length: usize) -> Result<()> {
        let crc = self.calculate_crc(length);
        self.write_byte(crc as u8)?;
        self.write_byte((crc >> 8) as u8)
    }

    // ------------------------------------------------------------------
    // Control and framing words
    // ------------------------------------------------------------------

    pub fn write_software_trigger(&mut self) -> Result<()> {
        self.push_raw(SOFTWARE_TRIGGER)
    }

    pub fn write_trigger_irq(&mut self) -> Result<()> {
        self.push_raw(TRIGGER_IRQ)
    }

    pub fn write_timestamp_request(&mut self) -> Result<()> {
        self.push_raw(TIMESTAMP_REQUEST)
    }

    pub fn write_delay(&mut self, microseconds: u16) -> Result<()> {
        self.push_raw(DELAY_TAG | microseconds.min(CONTROL_WORD_MAX_US))
    }

    pub fn write_wait_for_rx(&mut self, microseconds: u16) -> Result<()> {
        self.push_raw(WAIT_FOR_RX_TAG | microseconds.min(CONTROL_WORD_MAX_US))
    }

    pub fn write_end_of_frame(&mut self) -> Result<()> {
        self.push_raw(END_OF_FRAME)
    }

    /// Appends the four tagged timestamp words of a response frame, low
    /// byte first. Response direction only.
    pub fn write_rx_timestamp(&mut self, raw: u32) -> Result<()> {
        for shift in 0..FRAME_TIMESTAMP_WORDS {
            self.push_raw(TIMESTAMP_TAG | (((raw >> (shift * 8)) & 0xFF) as u16))?;
        }
        Ok(())
    }

    /// True when the cursor sits past the last word.
    pub fn end_of_buffer(&self) -> bool {
        self.index >= self.length
    }

    /// True when the cursor sits on an end-of-frame marker.
    pub fn end_of_frame(&self) -> bool {
        !self.end_of_buffer() && (self.buffer[self.index] & TAG_MASK) == END_OF_FRAME
    }

    /// Consumes the end-of-frame marker if the cursor sits on one.
    pub fn read_end_of_frame(&mut self) {
        if self.end_of_frame() {
            self.index += 1;
        }
    }

    /// Advances past the next end-of-frame marker, leaving the cursor on the
    /// first word of the following frame.
    pub fn skip_to_next_frame(&mut self) {
        while !self.end_of_buffer() && !self.end_of_frame() {
            self.index += 1;
        }
        self.read_end_of_frame();
    }
}

impl std::fmt::Debug for WireBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireBuffer")
            .field("index", &self.index)
            .field("length", &self.length)
            .field("data_tag", &format_args!("{:#06x}", self.data_tag))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_known_vector() {
        // CRC-16/MODBUS check value for the ASCII string "123456789"
        assert_eq!(crc16(b"123456789"), 0x4B37);
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_crc16_detects_single_byte_change() {
        let frame = [0x11u8, 0x42, 0x01, 0x02, 0x03];
        let base = crc16(&frame);
        for i in 0..frame.len() {
            let mut corrupted = frame;
            corrupted[i] ^= 0x01;
            assert_ne!(crc16(&corrupted), base, "flip at byte {i} undetected");
        }
    }

    #[test]
    fn test_data_word_tagging() {
        let mut tx = WireBuffer::tx();
        tx.write_u8(0x42).unwrap();
        assert_eq!(tx.words()[0], (0x42 << 1) | TX_DATA_TAG);

        let mut rx = WireBuffer::rx();
        rx.write_u8(0x42).unwrap();
        assert_eq!(rx.words()[0], (0x42 << 1) | RX_DATA_TAG);

        rx.set_index(0);
        assert_eq!(rx.read_u8(), 0x42);
    }

    #[test]
    fn test_integer_round_trips() {
        let mut buf = WireBuffer::rx();
        buf.write_u16(0xBEEF).unwrap();
        buf.write_u32(0xDEAD_BEEF).unwrap();
        buf.write_u48(0x0000_1234_5678_9ABC).unwrap();
        buf.write_i8(-5).unwrap();
        buf.write_i16(-12345).unwrap();
        buf.write_i32(-7_654_321).unwrap();

        buf.set_index(0);
        assert_eq!(buf.read_u16(), 0xBEEF);
        assert_eq!(buf.read_u32(), 0xDEAD_BEEF);
        assert_eq!(buf.read_u48(), 0x0000_1234_5678_9ABC);
        assert_eq!(buf.read_i8(), -5);
        assert_eq!(buf.read_i16(), -12345);
        assert_eq!(buf.read_i32(), -7_654_321);
    }

    #[test]
    fn test_i24_sign_extension() {
        let mut buf = WireBuffer::rx();
        buf.write_i24(-1).unwrap();
        buf.write_i24(8_388_607).unwrap();
        buf.write_i24(-8_388_608).unwrap();
        buf.set_index(0);
        assert_eq!(buf.read_i24(), -1);
        assert_eq!(buf.read_i24(), 8_388_607);
        assert_eq!(buf.read_i24(), -8_388_608);
    }

    #[test]
    fn test_integer_is_big_endian_on_wire() {
        let mut buf = WireBuffer::rx();
        buf.write_i32(0x0102_0304).unwrap();
        buf.set_index(0);
        assert_eq!(buf.read_u8(), 0x01);
        assert_eq!(buf.read_u8(), 0x02);
        assert_eq!(buf.read_u8(), 0x03);
        assert_eq!(buf.read_u8(), 0x04);
    }

    #[test]
    fn test_sgl_wire_order_lsb_first() {
        let bytes = sgl_to_wire(1.0f32);
        // 1.0f32 = 0x3F800000, sign/exponent byte travels last
        assert_eq!(bytes, [0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(sgl_from_wire(bytes), 1.0f32);

        let mut buf = WireBuffer::rx();
        buf.write_sgl(-2.5).unwrap();
        buf.set_index(0);
        assert_eq!(buf.read_sgl(), -2.5);
    }

    #[test]
    fn test_crc_write_and_read_back() {
        let mut buf = WireBuffer::rx();
        buf.write_u8(0x11).unwrap();
        buf.write_u8(0x12).unwrap();
        buf.write_u16(0x0304).unwrap();
        let expected = crc16(&[0x11, 0x12, 0x03, 0x04]);
        buf.write_crc(4).unwrap();

        buf.set_index(4);
        assert_eq!(buf.read_crc(), expected);
        // recompute over the data words with the cursor on the CRC position
        buf.set_index(4);
        assert_eq!(buf.calculate_crc(4), expected);
    }

    #[test]
    fn test_frame_timestamp_round_trip() {
        let mut buf = WireBuffer::rx();
        buf.write_rx_timestamp(500_000_000).unwrap();
        for word in buf.words() {
            assert_eq!(word & TAG_MASK, TIMESTAMP_TAG);
        }
        buf.set_index(0);
        assert!((buf.read_timestamp() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_frame_navigation() {
        let mut buf = WireBuffer::rx();
        buf.write_u8(1).unwrap();
        buf.write_end_of_frame().unwrap();
        buf.write_u8(2).unwrap();
        buf.write_end_of_frame().unwrap();

        buf.set_index(0);
        buf.skip_to_next_frame();
        assert_eq!(buf.read_u8(), 2);
        buf.read_end_of_frame();
        assert!(buf.end_of_buffer());
    }

    #[test]
    fn test_read_past_end_is_inert() {
        let mut buf = WireBuffer::rx();
        buf.write_u8(7).unwrap();
        buf.set_index(5);
        assert!(buf.end_of_buffer());
        assert_eq!(buf.read_raw(), 0);
        assert_eq!(buf.index(), 5);
    }

    #[test]
    fn test_capacity_enforced() {
        let mut buf = WireBuffer::tx();
        for _ in 0..WIRE_BUFFER_SIZE {
            buf.push_raw(0).unwrap();
        }
        assert!(buf.push_raw(0).is_err());
    }

    #[test]
    fn test_control_words() {
        let mut buf = WireBuffer::tx();
        buf.write_software_trigger().unwrap();
        buf.write_delay(120).unwrap();
        buf.write_wait_for_rx(9999).unwrap();
        buf.write_trigger_irq().unwrap();

        let words = buf.words();
        assert_eq!(words[0], SOFTWARE_TRIGGER);
        assert_eq!(words[1], DELAY_TAG | 120);
        // timeout clamps to the 12-bit field
        assert_eq!(words[2], WAIT_FOR_RX_TAG | CONTROL_WORD_MAX_US);
        assert_eq!(words[3], TRIGGER_IRQ);
    }
}
