//! Runs the watch loop headless against a capture link and dumps the wire
//! traffic a real display would have received.
//!
//! ```sh
//! RUST_LOG=debug cargo run -p vfd-watch --example status_demo
//! ```

use std::time::Duration;

use vfd_device::testing::{decode_commands, CaptureLink};
use vfd_device::{Display, DisplayError};
use vfd_font::testing::BoxGlyphs;
use vfd_font::VfdFont;
use vfd_watch::{Settings, Watch};

fn main() -> Result<(), DisplayError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let link = CaptureLink::new();
    let mut display = Display::new();
    display.use_font(VfdFont::with_source(Box::new(BoxGlyphs::default()), 12));
    display.open_with_font(link.clone(), 96, 16)?;

    let watch = Watch::start(display, Settings::default());
    watch.channel(Some("Demo TV"));
    watch.program(Some("Evening News"), None);
    watch.volume(180, true);
    std::thread::sleep(Duration::from_millis(400));
    watch.shutdown(None);

    for (opcode, data) in decode_commands(&link.payload()) {
        println!("1b {opcode:02x} {data:02x?}");
    }
    println!("{} physical frames", link.frames().len());
    Ok(())
}
