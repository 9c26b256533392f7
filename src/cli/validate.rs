//! Validate command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::geometry::validate_grid;

use super::{EXIT_ERROR, EXIT_SUCCESS};

/// Execute the validate command
pub fn run_validate(image: &Path, columns: u32, rows: u32) -> ExitCode {
    let (width, height) = match image::image_dimensions(image) {
        Ok(dims) => dims,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", image.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match validate_grid(width, height, columns, rows) {
        Ok(frame) => {
            println!(
                "OK: {}x{} sheet divides into {}x{} frames of {}x{}px",
                width, height, columns, rows, frame.width, frame.height
            );
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
