mod common;

use common::{init_logging, synthetic_images};
use layerfe::io::{SaveFormat, read_image, read_ppm, write_image, write_ppm};
use layerfe::{Channel, ErrorKind};

#[test]
fn ppm_round_trip_is_exact() {
    init_logging();
    for image in synthetic_images() {
        let mut bytes = Vec::new();
        write_ppm(&image, &mut bytes).unwrap();
        let back = read_ppm(bytes.as_slice()).unwrap();
        assert_eq!(back, image);
    }
}

#[test]
fn lossless_raster_round_trips() {
    init_logging();
    for format in [SaveFormat::Png, SaveFormat::Bmp, SaveFormat::Ppm] {
        for image in synthetic_images() {
            let mut bytes = Vec::new();
            write_image(&image, &mut bytes, format, 90).unwrap();
            let back = read_image(bytes.as_slice(), format).unwrap();
            assert_eq!(back, image, "{:?} round trip", format);
        }
    }
}

#[test]
fn jpeg_round_trip_is_close() {
    init_logging();
    let image = common::solid(16, 16, layerfe::Pixel::from_rgb(120, 60, 200));
    let mut bytes = Vec::new();
    write_image(&image, &mut bytes, SaveFormat::Jpeg, 95).unwrap();
    let back = read_image(bytes.as_slice(), SaveFormat::Jpeg).unwrap();
    assert_eq!(back.dimensions(), image.dimensions());
    for ch in Channel::all() {
        let got = back.value_at(8, 8, *ch).unwrap() as i32;
        let want = image.value_at(8, 8, *ch).unwrap() as i32;
        assert!((got - want).abs() <= 8, "{:?}: {} vs {}", ch, got, want);
    }
}

#[test]
fn corrupt_png_is_invalid_argument() {
    let err = read_image(&b"\x89PNG\r\n\x1a\nnot really"[..], SaveFormat::Png).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn hand_written_ppm_matches_generator() {
    let text = "P3\n# 2x2 checkerboard\n2 2\n255\n255 0 0\n0 0 255\n0 0 255\n255 0 0\n";
    let parsed = read_ppm(text.as_bytes()).unwrap();
    assert_eq!(parsed, synthetic_images()[0]);

    let mut out = Vec::new();
    write_ppm(&parsed, &mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "P3\n2 2\n255\n255 0 0\n0 0 255\n0 0 255\n255 0 0\n"
    );
}
