//! # Display Sink
//!
//! What the device shows: status light, short messages and the current tap with
//! its keg level bar. The runtime only notifies the sink; how it renders is up to
//! the implementation.

use std::sync::Arc;

use lib_kegtap::core::{LedColor, StatusColor};
use lib_kegtap::models::TapInfo;
use tokio::sync::Mutex;
use tracing::info;

/// A display the monitor renders to.
pub trait DisplaySink: Send {
    /// Brings the hardware up. A failure here aborts startup.
    fn init(&mut self) -> anyhow::Result<()>;
    /// Sets the status light.
    fn show_status(&mut self, status: StatusColor);
    /// Shows a short user-facing message.
    fn show_message(&mut self, message: &str);
    /// Shows the tap's beer with its remaining percentage and level bar.
    fn show_tap(&mut self, info: &TapInfo, percent: u8, level: &[LedColor]);
    /// Shows the beer image, as downloaded (JPEG or PNG bytes).
    fn show_image(&mut self, image: &[u8]);
}

/// A display shared between the poller and the reporter.
pub type SharedDisplay = Arc<Mutex<Box<dyn DisplaySink>>>;

/// Wraps a sink for sharing.
pub fn shared(sink: impl DisplaySink + 'static) -> SharedDisplay {
    Arc::new(Mutex::new(Box::new(sink)))
}

/// Renders to the log. Stands in for the LCD and LED strip on a host.
#[derive(Debug)]
pub struct ConsoleDisplay {
    width: u32,
    height: u32,
    last_frame: Option<String>,
    last_image_len: Option<usize>,
}

impl ConsoleDisplay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            last_frame: None,
            last_image_len: None,
        }
    }
}

/// One character per LED: `R`ed, `Y`ellow, `G`reen or `.` for off.
pub fn render_bar(level: &[LedColor]) -> String {
    level
        .iter()
        .map(|led| match led {
            LedColor::Off => '.',
            LedColor::Low => 'R',
            LedColor::Medium => 'Y',
            LedColor::Full => 'G',
        })
        .collect()
}

/// One-line summary of a tap, as the console display prints it.
pub fn render_tap(info: &TapInfo, percent: u8, level: &[LedColor]) -> String {
    let beer = match (&info.beer_name, info.beer_abv) {
        (Some(name), Some(abv)) => format!("{name} {abv:.1}%"),
        (Some(name), None) => name.clone(),
        _ => "No beer on tap".to_string(),
    };
    format!(
        "{} | {} | {:.0}/{:.0} mL | {}% [{}]",
        info.tap_id,
        beer,
        info.volume,
        info.full_volume,
        percent,
        render_bar(level)
    )
}

impl DisplaySink for ConsoleDisplay {
    fn init(&mut self) -> anyhow::Result<()> {
        if self.width == 0 || self.height == 0 {
            anyhow::bail!("display has no pixels ({}x{})", self.width, self.height);
        }
        info!(width = self.width, height = self.height, "Display initialized");
        Ok(())
    }

    fn show_status(&mut self, status: StatusColor) {
        let (r, g, b) = status.rgb();
        tracing::debug!(?status, r, g, b, "Status light");
    }

    fn show_message(&mut self, message: &str) {
        info!(target: "display", "{}", message);
        self.last_frame = None;
    }

    fn show_tap(&mut self, info: &TapInfo, percent: u8, level: &[LedColor]) {
        let frame = render_tap(info, percent, level);
        // Unchanged frames are not re-drawn.
        if self.last_frame.as_deref() != Some(frame.as_str()) {
            info!(target: "display", "{}", frame);
            self.last_frame = Some(frame);
        }
    }

    fn show_image(&mut self, image: &[u8]) {
        if self.last_image_len != Some(image.len()) {
            info!(target: "display", bytes = image.len(), "Beer image updated");
            self.last_image_len = Some(image.len());
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use lib_kegtap::core::keg_level::level_bar;

    fn info(beer: Option<(&str, f64)>) -> TapInfo {
        TapInfo {
            tap_id: "tap_1".into(),
            beer_name: beer.map(|(n, _)| n.to_string()),
            beer_abv: beer.map(|(_, a)| a),
            volume: 4800.0,
            full_volume: 5000.0,
            flow_rate: 20.0,
            image_path: None,
        }
    }

    #[test]
    fn test_render_tap_line() {
        let line = render_tap(&info(Some(("Kolsch", 4.8))), 96, &level_bar(96, 8));
        assert_eq!(line, "tap_1 | Kolsch 4.8% | 4800/5000 mL | 96% [RRYYYYG.]");
        let empty = render_tap(&info(None), 96, &[]);
        assert!(empty.contains("No beer on tap"));
    }

    #[test]
    fn test_console_init_requires_pixels() {
        assert!(ConsoleDisplay::new(240, 240).init().is_ok());
        assert!(ConsoleDisplay::new(0, 240).init().is_err());
    }

    #[test]
    fn test_console_skips_identical_frames() {
        let mut display = ConsoleDisplay::new(240, 240);
        let tap = info(Some(("Kolsch", 4.8)));
        display.show_tap(&tap, 96, &[]);
        let first = display.last_frame.clone();
        display.show_tap(&tap, 96, &[]);
        assert_eq!(display.last_frame, first);
        display.show_message("Pour report failed");
        assert!(display.last_frame.is_none());
    }
}
