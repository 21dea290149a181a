use anyhow::{anyhow, Result};
use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle, MonoTextStyleBuilder},
    pixelcolor::BinaryColor,
    prelude::*,
    text::Text,
};
use esp_idf_hal::i2c::I2cDriver;
use profont::{PROFONT_14_POINT, PROFONT_24_POINT, PROFONT_9_POINT};
use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};

use energymon_common::PageView;

type Display<'d> = Ssd1306<
    I2CInterface<I2cDriver<'d>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

// 128x64 SSD1306 at address 0x3C. Every screen is a full-frame replace:
// clear the buffer, draw, flush.
pub struct Oled<'d> {
    display: Display<'d>,
}

impl<'d> Oled<'d> {
    pub fn new(i2c: I2cDriver<'d>) -> Result<Self> {
        let interface = I2CDisplayInterface::new(i2c);
        let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        display
            .init()
            .map_err(|err| anyhow!("display init failed: {err:?}"))?;

        Ok(Self { display })
    }

    pub fn boot_banner(&mut self) -> Result<()> {
        self.clear()?;
        self.text("ENERGY", 16, 22, &PROFONT_14_POINT)?;
        self.text("MONITOR", 12, 42, &PROFONT_14_POINT)?;
        self.text("Booting...", 34, 60, &PROFONT_9_POINT)?;
        self.flush()
    }

    pub fn connecting(&mut self, ssid: &str) -> Result<()> {
        self.clear()?;
        self.text("Connecting WiFi...", 0, 12, &PROFONT_9_POINT)?;
        self.text(ssid, 0, 26, &PROFONT_9_POINT)?;
        self.flush()
    }

    pub fn connected(&mut self, ip: &str) -> Result<()> {
        self.clear()?;
        self.text("WiFi Connected!", 0, 12, &PROFONT_9_POINT)?;
        self.text(&format!("IP: {ip}"), 0, 26, &PROFONT_9_POINT)?;
        self.flush()
    }

    pub fn render_page(&mut self, view: &PageView) -> Result<()> {
        self.clear()?;

        let mut baseline = 16;
        for label in view.labels {
            self.text(label, 0, baseline, &PROFONT_14_POINT)?;
            baseline += 18;
        }

        let value_baseline = baseline + 28;
        self.text(&view.value, 4, value_baseline, &PROFONT_24_POINT)?;

        if let Some(unit) = view.unit {
            let value_width = 4 + view.value.len() as i32 * 16;
            // "kWh" is the one unit too wide for the heading font.
            let unit_font = if unit.len() > 2 {
                &PROFONT_9_POINT
            } else {
                &PROFONT_14_POINT
            };
            self.text(unit, value_width + 4, value_baseline, unit_font)?;
        }

        self.flush()
    }

    // Boot-path notifications only; the steady-state loop never comes here.
    pub fn show_error(&mut self, message: &str) -> Result<()> {
        self.clear()?;
        self.text("ERROR:", 0, 24, &PROFONT_14_POINT)?;
        self.text(message, 0, 48, &PROFONT_9_POINT)?;
        self.flush()
    }

    fn text(&mut self, text: &str, x: i32, y: i32, font: &'static MonoFont<'static>) -> Result<()> {
        let style: MonoTextStyle<'static, BinaryColor> = MonoTextStyleBuilder::new()
            .font(font)
            .text_color(BinaryColor::On)
            .build();
        Text::new(text, Point::new(x, y), style)
            .draw(&mut self.display)
            .map_err(|err| anyhow!("draw failed: {err:?}"))?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.display
            .clear(BinaryColor::Off)
            .map_err(|err| anyhow!("clear failed: {err:?}"))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.display
            .flush()
            .map_err(|err| anyhow!("flush failed: {err:?}"))?;
        Ok(())
    }
}
