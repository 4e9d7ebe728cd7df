use crate::{EncodeTruncated, Reading};
use core::fmt::{self, Write};

/// Hard size of one payload buffer, terminator included.
pub const PAYLOAD_CAPACITY: usize = 256;

/// Fixed-capacity text buffer with write-and-truncate semantics.
///
/// Holds at most `PAYLOAD_CAPACITY - 1` bytes of content; the byte after the content is
/// always NUL. Writes past capacity are dropped but still counted, so the length the
/// rendering would have had is known afterwards.
#[derive(Clone)]
pub struct PayloadBuffer {
    buf: [u8; PAYLOAD_CAPACITY],
    len: usize,
    natural_len: usize,
}

impl Default for PayloadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadBuffer {
    pub const fn new() -> Self {
        Self {
            buf: [0u8; PAYLOAD_CAPACITY],
            len: 0,
            natural_len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Content plus its NUL terminator.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf[..=self.len]
    }

    /// Bytes the writes would have produced without a capacity limit.
    pub fn natural_len(&self) -> usize {
        self.natural_len
    }

    pub fn is_truncated(&self) -> bool {
        self.natural_len > self.len
    }
}

impl Write for PayloadBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.natural_len += s.len();
        let room = PAYLOAD_CAPACITY - 1 - self.len;
        let n = room.min(s.len());
        self.buf[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        self.buf[self.len] = 0;
        Ok(())
    }
}

impl fmt::Debug for PayloadBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadBuffer")
            .field("content", &String::from_utf8_lossy(self.as_bytes()))
            .field("natural_len", &self.natural_len)
            .finish()
    }
}

/// One rendered channel record, possibly truncated.
#[derive(Clone, Debug, Default)]
pub struct TelemetryMessage {
    payload: PayloadBuffer,
}

impl TelemetryMessage {
    pub fn payload(&self) -> &PayloadBuffer {
        &self.payload
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.payload.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Lossy text view for logging; a cut may land inside a multi-byte character.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }

    pub fn truncation(&self) -> Option<EncodeTruncated> {
        self.payload.is_truncated().then(|| EncodeTruncated {
            natural_len: self.payload.natural_len(),
            capacity: PAYLOAD_CAPACITY,
        })
    }
}

/// Escape `s` as the body of a JSON string.
fn write_json_str(w: &mut impl Write, s: &str) -> fmt::Result {
    let mut start = 0;
    for (i, c) in s.char_indices() {
        let esc: Option<&str> = match c {
            '"' => Some("\\\""),
            '\\' => Some("\\\\"),
            '\n' => Some("\\n"),
            '\r' => Some("\\r"),
            '\t' => Some("\\t"),
            c if (c as u32) < 0x20 => None,
            _ => continue,
        };
        w.write_str(&s[start..i])?;
        match esc {
            Some(e) => w.write_str(e)?,
            None => write!(w, "\\u{:04x}", c as u32)?,
        }
        start = i + c.len_utf8();
    }
    w.write_str(&s[start..])
}

/// Render one channel's reading as a compact JSON-like record.
///
/// Output never exceeds `PAYLOAD_CAPACITY - 1` bytes; longer renderings are cut, so
/// consumers must tolerate records that fail to parse.
pub fn encode(tag: &str, channel_number: u16, reading: &Reading) -> TelemetryMessage {
    let mut payload = PayloadBuffer::new();
    // PayloadBuffer never reports a write error
    let _ = render(&mut payload, tag, channel_number, reading);
    TelemetryMessage { payload }
}

fn render(w: &mut PayloadBuffer, tag: &str, channel_number: u16, reading: &Reading) -> fmt::Result {
    w.write_str("{\"tag\":\"")?;
    write_json_str(w, tag)?;
    write!(
        w,
        "\",\"channel\":{},\"v_bus_mv\":{},\"i_bus_ma\":{}}}",
        channel_number, reading.bus_voltage_milli, reading.bus_current_milli
    )
}
