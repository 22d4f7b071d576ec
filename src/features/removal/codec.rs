use std::io::Cursor;

use image::{ColorType, DynamicImage, ImageFormat};

use super::engine::{BackgroundRemover, RemovalError};

/// 把上传的原始字节解码为图片（格式按内容嗅探，不依赖文件名扩展名）
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, RemovalError> {
    image::load_from_memory(bytes).map_err(RemovalError::Decode)
}

/// 将图片编码为 PNG 字节
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, RemovalError> {
    // PNG 编码器不支持浮点像素
    let converted;
    let image = match image.color() {
        ColorType::Rgb32F | ColorType::Rgba32F => {
            converted = DynamicImage::ImageRgba8(image.to_rgba8());
            &converted
        }
        _ => image,
    };

    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(RemovalError::Encode)?;
    Ok(buf)
}

/// 完整处理链路：解码 → 背景移除 → PNG 编码。阻塞执行。
pub fn remove_background_to_png(
    remover: &dyn BackgroundRemover,
    bytes: &[u8],
) -> Result<Vec<u8>, RemovalError> {
    let input = decode_image(bytes)?;
    tracing::debug!(
        width = input.width(),
        height = input.height(),
        color = ?input.color(),
        remover = remover.name(),
        "图片解码完成"
    );
    let output = remover.remove(input)?;
    encode_png(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba32FImage};

    struct AlphaOnly;

    impl BackgroundRemover for AlphaOnly {
        fn name(&self) -> &str {
            "alpha-only"
        }

        fn remove(&self, image: DynamicImage) -> Result<DynamicImage, RemovalError> {
            Ok(DynamicImage::ImageRgba8(image.to_rgba8()))
        }
    }

    fn red_png() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 0, 0])));
        encode_png(&img).expect("encode fixture")
    }

    #[test]
    fn pipeline_outputs_png_with_same_dimensions() {
        let out = remove_background_to_png(&AlphaOnly, &red_png()).expect("pipeline");
        assert_eq!(image::guess_format(&out).expect("guess"), ImageFormat::Png);
        let decoded = image::load_from_memory(&out).expect("decode output");
        assert_eq!((decoded.width(), decoded.height()), (10, 10));
        assert!(decoded.color().has_alpha());
    }

    #[test]
    fn text_bytes_fail_to_decode() {
        let err = decode_image(b"definitely not an image").expect_err("should fail");
        assert!(matches!(err, RemovalError::Decode(_)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn float_images_are_converted_before_png_encoding() {
        let img = DynamicImage::ImageRgba32F(Rgba32FImage::new(4, 4));
        let out = encode_png(&img).expect("encode float image");
        let decoded = image::load_from_memory(&out).expect("decode output");
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }
}
