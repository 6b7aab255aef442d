//! Inline image preview through `viu`

use std::io;
use std::path::Path;
use std::process::Command;

use tracing::debug;

const WIDE_COLUMNS: &str = "80";
const TALL_ROWS: &str = "25";

/// Preview `path` in the terminal, sized by its aspect ratio.
///
/// Missing viewer or unreadable image only skips the preview.
pub fn show(path: &Path) {
    let (width, height) = match image::image_dimensions(path) {
        Ok(dimensions) => dimensions,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Cannot read image dimensions");
            return;
        }
    };

    let mut viewer = Command::new("viu");
    viewer.args(viewer_size(width, height)).arg(path);

    match viewer.status() {
        Ok(status) if !status.success() => {
            debug!(path = %path.display(), %status, "viu exited with an error");
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("viu not found on PATH, skipping preview");
        }
        Err(e) => debug!(error = %e, "Failed to run viu"),
    }
}

/// Landscape images are bounded by width, everything else by height
fn viewer_size(width: u32, height: u32) -> [&'static str; 2] {
    if width > height {
        ["--width", WIDE_COLUMNS]
    } else {
        ["--height", TALL_ROWS]
    }
}
