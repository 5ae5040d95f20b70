//! Direct LCD daemon socket surface.
//!
//! Connects to the daemon, consumes its 16-byte greeting, selects pixel
//! buffer mode with `GBUF`, then streams whole frames (one byte per pixel).
//! A reader thread decodes the daemon's 4-byte key-state reports into
//! `BUTTON <NAME>` lines on the shared command queue.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread::JoinHandle;

use g15_types::error::{G15Error, Result};
use g15_types::geometry::{Alignment, FontSize, Point, ProgressBarStyle};
use g15_types::input::ButtonEvent;
use g15_types::queue::CommandQueue;
use g15_types::surface::DrawingSurface;

use crate::font::FontTable;
use crate::pixels::PixelBuffer;

/// Bytes in the daemon's connection greeting.
pub const HANDSHAKE_LEN: usize = 16;

/// Screen mode request for a raw pixel buffer client.
pub const PIXEL_MODE: &[u8] = b"GBUF";

/// Key-state bits reported by the daemon.
pub const KEY_MASKS: &[(u32, &str)] = &[
    (1 << 24, "G1"),
    (1 << 25, "G2"),
    (1 << 26, "G3"),
    (1 << 27, "G4"),
    (1 << 28, "G5"),
    (1 << 29, "G6"),
    (1 << 30, "G7"),
    (1 << 31, "G8"),
    (1 << 16, "G9"),
    (1 << 17, "G10"),
    (1 << 18, "G11"),
    (1 << 19, "G12"),
    (1 << 20, "G13"),
    (1 << 21, "G14"),
    (1 << 22, "G15"),
    (1 << 23, "G16"),
    (1 << 8, "G17"),
    (1 << 9, "G18"),
    (1 << 10, "M1"),
    (1 << 11, "M2"),
    (1 << 12, "M3"),
    (1 << 14, "CHG"),
    (1 << 15, "LCD1"),
    (1 << 0, "LCD2"),
    (1 << 1, "LCD3"),
    (1 << 2, "LCD4"),
];

/// Turns successive key-state masks into key-press names.
#[derive(Debug, Default, Clone)]
pub struct KeyDecoder {
    last: u32,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of keys that went down since the previous report.
    pub fn decode(&mut self, state: u32) -> Vec<&'static str> {
        let pressed = KEY_MASKS
            .iter()
            .filter(|(mask, _)| state & mask != 0 && self.last & mask == 0)
            .map(|(_, name)| *name)
            .collect();
        self.last = state;
        pressed
    }
}

/// One frame in wire format: a 0/1 byte per pixel, row-major.
pub fn encode_frame(buffer: &PixelBuffer) -> Vec<u8> {
    buffer.pixels().iter().map(|&b| u8::from(b)).collect()
}

/// Read key reports until the stream closes, queueing each press.
pub fn pump_keys<R: Read>(mut reader: R, queue: &CommandQueue) {
    let mut decoder = KeyDecoder::new();
    let mut word = [0u8; 4];
    loop {
        if let Err(e) = reader.read_exact(&mut word) {
            log::debug!("daemon key stream closed: {e}");
            return;
        }
        for name in decoder.decode(u32::from_be_bytes(word)) {
            queue.push(ButtonEvent::command_line(name));
        }
    }
}

/// Surface streaming frames to the LCD daemon.
pub struct DaemonSurface<W: Write> {
    writer: W,
    buffer: PixelBuffer,
    fonts: FontTable,
    sent_first: bool,
    socket: Option<TcpStream>,
    key_reader: Option<JoinHandle<()>>,
}

impl DaemonSurface<TcpStream> {
    /// Connect, negotiate pixel mode, and start the key reader.
    pub fn connect(host: &str, port: u16, queue: Arc<CommandQueue>) -> Result<Self> {
        let mut stream = TcpStream::connect((host, port))
            .map_err(|e| G15Error::Transport(format!("cannot reach daemon {host}:{port}: {e}")))?;
        let mut greeting = [0u8; HANDSHAKE_LEN];
        stream
            .read_exact(&mut greeting)
            .map_err(|e| G15Error::Transport(format!("daemon handshake failed: {e}")))?;
        log::debug!("daemon greeting: {}", String::from_utf8_lossy(&greeting).trim_end());
        stream.write_all(PIXEL_MODE)?;

        let reader = stream.try_clone()?;
        let key_reader = std::thread::Builder::new()
            .name("g15-keys".into())
            .spawn(move || pump_keys(reader, &queue))?;
        let control = stream.try_clone()?;
        log::info!("connected to LCD daemon at {host}:{port}");

        let mut surface = Self::new(stream);
        surface.socket = Some(control);
        surface.key_reader = Some(key_reader);
        Ok(surface)
    }
}

impl<W: Write> DaemonSurface<W> {
    /// Wrap an already negotiated frame writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: PixelBuffer::new(),
            fonts: FontTable::builtin(),
            sent_first: false,
            socket: None,
            key_reader: None,
        }
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }
}

impl<W: Write> Drop for DaemonSurface<W> {
    fn drop(&mut self) {
        if let Some(socket) = self.socket.take() {
            let _ = socket.shutdown(Shutdown::Both);
        }
        if let Some(handle) = self.key_reader.take() {
            let _ = handle.join();
        }
    }
}

impl<W: Write> DrawingSurface for DaemonSurface<W> {
    fn clear(&mut self, black: bool) {
        self.buffer.clear(black);
    }

    fn fill_rect(&mut self, p1: Point, p2: Point, black: bool) {
        self.buffer.fill_rect(p1, p2, black);
    }

    fn draw_line(&mut self, p1: Point, p2: Point, black: bool) {
        self.buffer.line(p1, p2, black);
    }

    fn draw_box(&mut self, p1: Point, p2: Point, black: bool, thickness: u32) {
        self.buffer.draw_box(p1, p2, black, thickness);
    }

    fn draw_rounded_rect(&mut self, p1: Point, p2: Point, black: bool, filled: bool) {
        self.buffer.rounded_rect(p1, p2, black, filled);
    }

    fn draw_circle(&mut self, center: Point, radius: i32, black: bool, filled: bool) {
        self.buffer.circle(center, radius, black, filled);
    }

    fn draw_progress_bar(
        &mut self,
        p1: Point,
        p2: Point,
        black: bool,
        pos: i32,
        max: i32,
        style: ProgressBarStyle,
    ) {
        self.buffer.progress_bar(p1, p2, black, pos, max, style);
    }

    fn set_pixel(&mut self, at: Point, black: bool) {
        self.buffer.set(at, black);
    }

    fn reverse_region(&mut self, p1: Point, p2: Point) {
        self.buffer.reverse(p1, p2);
    }

    fn draw_bitmap(&mut self, at: Point, width: u32, height: u32, bits: &[bool]) {
        self.buffer.blit(at, width, height, bits);
    }

    fn draw_text(&mut self, size: FontSize, at: Point, align: Alignment, text: &str) {
        self.fonts.draw(&mut self.buffer, size, at, align, text);
    }

    fn line_height(&self, size: FontSize) -> Option<i32> {
        self.fonts.line_height(size)
    }

    fn commit(&mut self) -> Result<()> {
        if self.sent_first && !self.buffer.is_dirty() {
            return Ok(());
        }
        self.writer
            .write_all(&encode_frame(&self.buffer))
            .and_then(|()| self.writer.flush())
            .map_err(|e| G15Error::Transport(format!("daemon frame write failed: {e}")))?;
        self.sent_first = true;
        self.buffer.mark_committed();
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "daemon"
    }
}
