//! Grid geometry validation - the gate in front of the processing pipeline.

use thiserror::Error;

/// Error type for grid validation failures.
///
/// Geometry violations are terminal: they are reported to the author naming
/// the mismatched dimension and are never silently coerced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// Grid counts must both be at least 1
    #[error("grid must have at least one column and one row (got {columns}x{rows})")]
    EmptyGrid { columns: u32, rows: u32 },
    /// Sheet width is not a multiple of the column count
    #[error("sheet width {width}px does not divide into {columns} columns (width must be a multiple of {columns})")]
    WidthNotDivisible { width: u32, columns: u32 },
    /// Sheet height is not a multiple of the row count
    #[error("sheet height {height}px does not divide into {rows} rows (height must be a multiple of {rows})")]
    HeightNotDivisible { height: u32, rows: u32 },
    /// Sheet has no pixels
    #[error("sheet has zero area ({width}x{height})")]
    EmptySheet { width: u32, height: u32 },
}

/// Pixel dimensions of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Check that a sheet divides evenly into the declared grid.
///
/// Succeeds iff `width % columns == 0 && height % rows == 0`, returning the
/// per-frame dimensions. Pure function; callers use it to gate the expensive
/// pixel pass (and to enable/disable a "process" action in authoring UIs).
///
/// # Examples
///
/// ```
/// use muyu::geometry::validate_grid;
///
/// let frame = validate_grid(1024, 896, 8, 7).unwrap();
/// assert_eq!((frame.width, frame.height), (128, 128));
///
/// assert!(validate_grid(1000, 896, 8, 7).is_err());
/// ```
pub fn validate_grid(
    width: u32,
    height: u32,
    columns: u32,
    rows: u32,
) -> Result<FrameSize, GeometryError> {
    if columns == 0 || rows == 0 {
        return Err(GeometryError::EmptyGrid { columns, rows });
    }
    if width == 0 || height == 0 {
        return Err(GeometryError::EmptySheet { width, height });
    }
    if width % columns != 0 {
        return Err(GeometryError::WidthNotDivisible { width, columns });
    }
    if height % rows != 0 {
        return Err(GeometryError::HeightNotDivisible { height, rows });
    }
    Ok(FrameSize { width: width / columns, height: height / rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_grid_passes() {
        let frame = validate_grid(1024, 896, 8, 7).unwrap();
        assert_eq!(frame, FrameSize { width: 128, height: 128 });
    }

    #[test]
    fn test_width_mismatch_cites_width() {
        let err = validate_grid(1000, 896, 8, 7).unwrap_err();
        assert_eq!(err, GeometryError::WidthNotDivisible { width: 1000, columns: 8 });
        let message = err.to_string();
        assert!(message.contains("width 1000px"));
        assert!(message.contains("8 columns"));
    }

    #[test]
    fn test_height_mismatch_cites_height() {
        let err = validate_grid(1024, 900, 8, 7).unwrap_err();
        assert_eq!(err, GeometryError::HeightNotDivisible { height: 900, rows: 7 });
        assert!(err.to_string().contains("height 900px"));
    }

    #[test]
    fn test_width_checked_before_height() {
        // Both dimensions wrong: the width mismatch is reported first
        let err = validate_grid(1000, 900, 8, 7).unwrap_err();
        assert!(matches!(err, GeometryError::WidthNotDivisible { .. }));
    }

    #[test]
    fn test_zero_grid_rejected() {
        assert!(matches!(
            validate_grid(100, 100, 0, 5),
            Err(GeometryError::EmptyGrid { .. })
        ));
        assert!(matches!(
            validate_grid(100, 100, 5, 0),
            Err(GeometryError::EmptyGrid { .. })
        ));
    }

    #[test]
    fn test_zero_area_rejected() {
        assert!(matches!(
            validate_grid(0, 100, 1, 1),
            Err(GeometryError::EmptySheet { .. })
        ));
    }

    #[test]
    fn test_single_cell_grid() {
        let frame = validate_grid(500, 350, 1, 1).unwrap();
        assert_eq!(frame, FrameSize { width: 500, height: 350 });
    }

    #[test]
    fn test_divisibility_exhaustive_small_range() {
        // validate succeeds iff w % c == 0 && h % r == 0
        for w in 1..=24u32 {
            for c in 1..=6u32 {
                let ok = validate_grid(w, 12, c, 3).is_ok();
                assert_eq!(ok, w % c == 0, "w={} c={}", w, c);
            }
        }
    }
}
