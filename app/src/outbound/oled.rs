use std::sync::Mutex;

use anyhow::{Result, anyhow, bail};
use display_interface_i2c::I2CInterface;
use embedded_graphics::{
    mono_font::{MonoTextStyle, ascii::FONT_6X10},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use embedded_hal::i2c::I2c;
use internal::port::display::DisplayDrivenPort;
use log::{debug, info};
use ssd1306::{I2CDisplayInterface, Ssd1306, mode::BufferedGraphicsMode, prelude::*};

const WIDTH_PX: u32 = 128;
const HEIGHT_PX: u32 = 64;
const GLYPH_WIDTH: u32 = 6;
const GLYPH_HEIGHT: u32 = 10;

pub const COLUMNS: usize = (WIDTH_PX / GLYPH_WIDTH) as usize;
pub const ROWS: usize = (HEIGHT_PX / GLYPH_HEIGHT) as usize;

type Panel<I2C> = Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// Text placed on the character grid: `(row, column, line)` triples plus
/// whether anything fell off the edge.
#[derive(Debug, PartialEq)]
pub struct Layout {
    pub lines: Vec<(usize, usize, String)>,
    pub truncated: bool,
}

/// Wraps `text` onto the grid starting at (`column`, `row`). Explicit newlines
/// start a new row at column 0; rows past the bottom are dropped.
pub fn layout(text: &str, column: usize, row: usize) -> Layout {
    let mut lines = Vec::new();
    let mut truncated = false;
    let mut current_row = row;
    let mut current_column = column.min(COLUMNS - 1);

    'segments: for segment in text.split('\n') {
        let mut remaining: Vec<char> = segment.chars().collect();
        loop {
            if current_row >= ROWS {
                if remaining.is_empty() {
                    break;
                }
                truncated = true;
                break 'segments;
            }
            let width = COLUMNS - current_column;
            let taken: String = remaining.drain(..remaining.len().min(width)).collect();
            if !taken.is_empty() {
                lines.push((current_row, current_column, taken));
            }
            current_row += 1;
            current_column = 0;
            if remaining.is_empty() {
                break;
            }
        }
    }
    Layout { lines, truncated }
}

struct Screen<I2C> {
    panel: Panel<I2C>,
    cursor: (u8, u8),
}

/// Display gateway backed by a 128x64 SSD1306 on I2C.
pub struct OledDisplay<I2C> {
    screen: Mutex<Screen<I2C>>,
}

impl<I2C: I2c> OledDisplay<I2C> {
    pub fn init(i2c: I2C, address: u8) -> Result<Self> {
        let interface = I2CDisplayInterface::new_custom_address(i2c, address);
        let mut panel =
            Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0).into_buffered_graphics_mode();
        panel
            .init()
            .map_err(|e| anyhow!("SSD1306 init at 0x{address:02X} failed: {e:?}"))?;
        info!("SSD1306 {WIDTH_PX}x{HEIGHT_PX} ready at 0x{address:02X} ({COLUMNS}x{ROWS} characters)");
        Ok(OledDisplay {
            screen: Mutex::new(Screen { panel, cursor: (0, 0) }),
        })
    }
}

impl<I2C> OledDisplay<I2C> {
    fn with_screen<T>(&self, action: impl FnOnce(&mut Screen<I2C>) -> Result<T>) -> Result<T> {
        let mut screen = self.screen.lock().map_err(|_| anyhow!("SSD1306 lock poisoned"))?;
        action(&mut screen)
    }
}

impl<I2C> DisplayDrivenPort for OledDisplay<I2C>
where
    I2C: I2c + Send,
{
    fn clear(&self) -> Result<()> {
        self.with_screen(|screen| {
            screen.panel.clear_buffer();
            screen.cursor = (0, 0);
            screen.panel.flush().map_err(|e| anyhow!("SSD1306 flush failed: {e:?}"))
        })
    }

    fn set_cursor(&self, x: u8, y: u8) -> Result<()> {
        if usize::from(x) >= COLUMNS || usize::from(y) >= ROWS {
            bail!("Cursor ({x}, {y}) is outside the {COLUMNS}x{ROWS} grid");
        }
        self.with_screen(|screen| {
            screen.cursor = (x, y);
            Ok(())
        })
    }

    fn write(&self, row: u8, text: &str) -> Result<()> {
        self.with_screen(|screen| {
            let placed = layout(text, usize::from(screen.cursor.0), usize::from(row));
            if placed.truncated {
                debug!("Text does not fit the display, showing {} line(s)", placed.lines.len());
            }
            let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
            for (line_row, line_column, line) in &placed.lines {
                let origin = Point::new(
                    (*line_column as u32 * GLYPH_WIDTH) as i32,
                    (*line_row as u32 * GLYPH_HEIGHT) as i32,
                );
                Text::with_baseline(line, origin, style, Baseline::Top)
                    .draw(&mut screen.panel)
                    .map_err(|e| anyhow!("SSD1306 draw failed: {e:?}"))?;
            }
            screen.panel.flush().map_err(|e| anyhow!("SSD1306 flush failed: {e:?}"))
        })
    }

    fn power(&self, on: bool) -> Result<()> {
        self.with_screen(|screen| {
            screen
                .panel
                .set_display_on(on)
                .map_err(|e| anyhow!("SSD1306 power {} failed: {e:?}", if on { "on" } else { "off" }))
        })
    }
}
