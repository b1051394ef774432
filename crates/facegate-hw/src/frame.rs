//! Grayscale frame type and pixel-format conversions.

/// A captured grayscale camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Row-major luma, `width * height` bytes.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence: u32,
}

impl Frame {
    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("short {format} buffer: expected {expected} bytes, got {actual}")]
    ShortBuffer {
        format: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Extract the Y channel from packed YUYV 4:2:2 (`[Y0, U, Y1, V]` per pixel pair).
pub fn yuyv_to_gray(buf: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let pixels = width as usize * height as usize;
    let bytes = checked(buf, "YUYV", pixels * 2)?;
    Ok(bytes.iter().step_by(2).copied().collect())
}

/// Native 8-bit grayscale, trimmed to the frame size.
pub fn grey_to_gray(buf: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let pixels = width as usize * height as usize;
    Ok(checked(buf, "GREY", pixels)?.to_vec())
}

/// 16-bit little-endian grayscale, keeping the high byte.
pub fn y16_to_gray(buf: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let pixels = width as usize * height as usize;
    let bytes = checked(buf, "Y16", pixels * 2)?;
    Ok(bytes.chunks_exact(2).map(|px| px[1]).collect())
}

fn checked<'a>(buf: &'a [u8], format: &'static str, expected: usize) -> Result<&'a [u8], FrameError> {
    buf.get(..expected).ok_or(FrameError::ShortBuffer {
        format,
        expected,
        actual: buf.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_keeps_luma() {
        let yuyv: Vec<u8> = (0..16).collect();
        assert_eq!(yuyv_to_gray(&yuyv, 4, 2).unwrap(), vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[test]
    fn test_yuyv_short_buffer() {
        assert_eq!(
            yuyv_to_gray(&[100, 128], 2, 1),
            Err(FrameError::ShortBuffer { format: "YUYV", expected: 4, actual: 2 })
        );
    }

    #[test]
    fn test_grey_trims_padding() {
        let buf = vec![7u8; 10];
        assert_eq!(grey_to_gray(&buf, 2, 2).unwrap(), vec![7; 4]);
    }

    #[test]
    fn test_y16_high_byte() {
        // 0x1234 and 0xff00, little-endian
        let buf = [0x34, 0x12, 0x00, 0xff];
        assert_eq!(y16_to_gray(&buf, 2, 1).unwrap(), vec![0x12, 0xff]);
    }

    #[test]
    fn test_y16_short_buffer() {
        assert!(y16_to_gray(&[0, 0, 0], 2, 1).is_err());
    }
}
