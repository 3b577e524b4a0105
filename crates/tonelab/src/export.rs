use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use renderer::RendererCore;
use scheduler::EditorSession;
use tracing::info;

use crate::cli::ExportArgs;
use crate::settings;

pub fn run_export(args: &ExportArgs) -> Result<()> {
    let config = settings::resolve(&args.edit)?;
    let image = load_image(&args.input)?;

    let renderer = RendererCore::headless(&settings::gpu_options(&config))
        .context("failed to initialise GPU renderer")?;
    let mut session = EditorSession::with_store(
        renderer,
        || {},
        settings::session_config(&config, 1.0),
        settings::store(&config),
    );
    session
        .set_image(&image)
        .with_context(|| format!("failed to upload {}", args.input.display()))?;

    let plan = session.render_export().context("failed to render export")?;
    let pixels = session
        .backend()
        .read_pixels()
        .context("failed to read back rendered image")?;
    save_image(pixels, &args.output)?;

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        size = %plan.output,
        "export complete"
    );
    Ok(())
}

pub fn load_image(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode image {}", path.display()))?
        .to_rgba8();
    info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "decoded image"
    );
    Ok(image)
}

/// Writes `pixels` in the format implied by `path`, dropping alpha for
/// formats that cannot store it.
fn save_image(pixels: RgbaImage, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)
        .with_context(|| format!("cannot infer an image format from {}", path.display()))?;
    let result = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgba8(pixels)
            .to_rgb8()
            .save_with_format(path, format),
        _ => pixels.save_with_format(path, format),
    };
    result.with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn jpeg_output_drops_alpha() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.jpg");
        save_image(RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 128])), &path).unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }

    #[test]
    fn png_output_round_trips_pixels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.png");
        let pixels = RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 128]));
        save_image(pixels.clone(), &path).unwrap();
        assert_eq!(load_image(&path).unwrap(), pixels);
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.unknown");
        assert!(save_image(RgbaImage::new(1, 1), &path).is_err());
    }
}
