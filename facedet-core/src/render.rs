use std::{fs, path::Path};

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};
use snafu::ResultExt;

use crate::{
    config::class_label,
    consts::{BOX_COLOR, BOX_THICKNESS, LABEL_FONT_SIZE, LABEL_TEXT_COLOR},
    detection::Detection,
    error::*,
};

/// Opens an image file, format guessed from its contents and extension.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage, DetectError> {
    let path = path.as_ref();
    image::open(path).context(ImageReadSnafu {
        path: path.to_string_lossy(),
    })
}

/// Loads a TrueType font used for detection labels.
pub fn load_font<P: AsRef<Path>>(path: P) -> Result<FontVec, DetectError> {
    let path = path.as_ref();
    let bytes = fs::read(path).context(IoReadSnafu {
        path: path.display().to_string(),
    })?;
    FontVec::try_from_vec(bytes).context(FontSnafu {})
}

/// Draws each detection as a box with a `name: confidence` label above it.
///
/// Without a font only the boxes are drawn.
pub fn draw_detections(
    image: &DynamicImage,
    detections: &[Detection],
    class_names: &[String],
    font: Option<&FontVec>,
) -> RgbImage {
    let mut output_img = image.to_rgb8();
    let box_color = Rgb(BOX_COLOR);
    let font_scale = PxScale::from(LABEL_FONT_SIZE);

    for detection in detections {
        let rect = detection.rect;
        if rect.width == 0 || rect.height == 0 {
            continue;
        }
        let x = rect.x as i32;
        let y = rect.y as i32;

        for offset in 0..BOX_THICKNESS {
            let thick_rect = Rect::at(x - offset, y - offset).of_size(
                rect.width + (offset * 2) as u32,
                rect.height + (offset * 2) as u32,
            );
            draw_hollow_rect_mut(&mut output_img, thick_rect, box_color);
        }

        let Some(font) = font else {
            continue;
        };

        let label = format!(
            "{}: {:.2}",
            class_label(class_names, detection.class_id),
            detection.confidence
        );
        let (text_w, text_h) = text_size(font_scale, font, &label);
        if text_w == 0 || text_h == 0 {
            continue;
        }

        // label sits above the box, pushed inside the image at the top edge
        let label_top = (y - text_h as i32 - 10).max(0);
        let label_h = ((y - label_top).max(text_h as i32)) as u32;
        draw_filled_rect_mut(
            &mut output_img,
            Rect::at(x, label_top).of_size(text_w, label_h),
            box_color,
        );
        draw_text_mut(
            &mut output_img,
            Rgb(LABEL_TEXT_COLOR),
            x,
            label_top + (label_h as i32 - text_h as i32) / 2,
            font_scale,
            font,
            &label,
        );
    }

    output_img
}

/// Writes an annotated image, format chosen from the file extension.
pub fn save_annotated<P: AsRef<Path>>(path: P, image: &RgbImage) -> Result<(), DetectError> {
    let path = path.as_ref();
    image.save(path).context(ImageWriteSnafu {
        path: path.to_string_lossy(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Rect as PixelRect;

    #[test]
    fn test_draws_box_outline() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let detections = [Detection {
            rect: PixelRect::new(20, 30, 40, 20),
            class_id: 0,
            confidence: 0.9,
        }];
        let output = draw_detections(&image, &detections, &[], None);

        assert_eq!(output.dimensions(), (100, 100));
        // outline pixels
        assert_eq!(output.get_pixel(20, 30), &Rgb(BOX_COLOR));
        assert_eq!(output.get_pixel(59, 49), &Rgb(BOX_COLOR));
        assert_eq!(output.get_pixel(19, 29), &Rgb(BOX_COLOR));
        // interior untouched
        assert_eq!(output.get_pixel(40, 40), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_box_at_border_and_empty_rect() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(50, 50));
        let detections = [
            Detection {
                rect: PixelRect::new(0, 0, 50, 50),
                class_id: 0,
                confidence: 0.9,
            },
            Detection {
                rect: PixelRect::new(10, 10, 0, 5),
                class_id: 0,
                confidence: 0.8,
            },
        ];
        let output = draw_detections(&image, &detections, &["face".to_string()], None);
        assert_eq!(output.get_pixel(0, 0), &Rgb(BOX_COLOR));
        assert_eq!(output.get_pixel(10, 12), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("facedet-render-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("annotated.png");

        let image = DynamicImage::ImageRgb8(RgbImage::new(32, 16));
        let detections = [Detection {
            rect: PixelRect::new(4, 4, 8, 8),
            class_id: 0,
            confidence: 0.7,
        }];
        let output = draw_detections(&image, &detections, &[], None);
        save_annotated(&path, &output).unwrap();

        let loaded = load_image(&path).unwrap().to_rgb8();
        assert_eq!(loaded.dimensions(), (32, 16));
        assert_eq!(loaded.get_pixel(4, 4), &Rgb(BOX_COLOR));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_image_file() {
        assert!(matches!(
            load_image("images/missing.jpg"),
            Err(DetectError::ImageRead { .. })
        ));
    }

    #[test]
    fn test_missing_font_file() {
        assert!(matches!(
            load_font("fonts/missing.ttf"),
            Err(DetectError::IoRead { .. })
        ));
    }
}
