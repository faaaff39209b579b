use anyhow::{Context, Result};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Luma};
use qrcode::QrCode;

/// Render the share URL as a PNG suitable for the corner card on the
/// slideshow page and the upload form.
pub fn share_qr_png(url: &str) -> Result<Vec<u8>> {
    let code = QrCode::new(url.as_bytes()).context("failed to generate QR code")?;
    let image = code.render::<Luma<u8>>().min_dimensions(256, 256).build();

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::L8,
        )
        .context("failed to encode QR code as PNG")?;
    Ok(png)
}
