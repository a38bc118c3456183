//! Drives the frame source the way a reconstruction loop would: pre-allocate
//! the output pair from the advertised sizes, poll repeatedly, report how
//! many polls actually delivered fresh data per stream.
//!
//! With `--features camera-nokhwa` the default webcam supplies color frames;
//! otherwise a replay device serves a scripted sequence (optionally seeded
//! from an image file passed as the second argument).

use anyhow::Result;
use rgbd_source::{ColorImage, DepthImage, ImageSource, SensorSource};
#[cfg(not(feature = "camera-nokhwa"))]
use rgbd_source::{
    DEPTH_IMAGE_SIZE, ImageSize, NATIVE_COLOR_SIZE, NativeColorFrame, NativeDepthFrame,
    PixelEncoding, ReplayDevice,
};

const POLLS: usize = 60;

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let calib = args.next().unwrap_or_else(|| "calib.txt".to_string());

    #[cfg(feature = "camera-nokhwa")]
    let mut source = SensorSource::open(&calib);
    #[cfg(not(feature = "camera-nokhwa"))]
    let mut source = SensorSource::new(&calib, Box::new(replay_device(args.next())?));

    println!(
        "color {}x{} ({}), depth {}x{} ({})",
        source.rgb_image_size().width,
        source.rgb_image_size().height,
        if source.color_available() { "open" } else { "unavailable" },
        source.depth_image_size().width,
        source.depth_image_size().height,
        if source.depth_available() { "open" } else { "unavailable" },
    );

    let mut color = ColorImage::new(source.rgb_image_size());
    let mut depth = DepthImage::new(source.depth_image_size());

    let mut color_updates = 0usize;
    let mut depth_updates = 0usize;
    let mut color_sum = checksum(color.data());
    let mut depth_sum = depth.data().iter().map(|&d| d as u64).sum::<u64>();

    for _ in 0..POLLS {
        if !source.has_more_images() {
            break;
        }
        source.get_images(&mut color, &mut depth);

        let c = checksum(color.data());
        if c != color_sum {
            color_sum = c;
            color_updates += 1;
        }
        let d = depth.data().iter().map(|&v| v as u64).sum::<u64>();
        if d != depth_sum {
            depth_sum = d;
            depth_updates += 1;
        }
    }

    println!("{POLLS} polls: {color_updates} color updates, {depth_updates} depth updates");
    Ok(())
}

fn checksum(data: &[u8]) -> u64 {
    data.iter().map(|&b| b as u64).sum()
}

/// Scripted device: frames interleaved with dropped-frame gaps, color from
/// an image file when one is given, otherwise a synthetic gradient.
#[cfg(not(feature = "camera-nokhwa"))]
fn replay_device(image_path: Option<String>) -> Result<ReplayDevice> {
    let color_native = NATIVE_COLOR_SIZE;
    let mut dev = ReplayDevice::new(color_native, DEPTH_IMAGE_SIZE);

    let rgba = match image_path {
        Some(path) => {
            let img = image::open(&path)?.resize_exact(
                color_native.width,
                color_native.height,
                image::imageops::FilterType::Triangle,
            );
            img.to_rgba8().into_raw()
        }
        None => gradient(color_native),
    };

    for step in 0..POLLS {
        if step % 3 == 2 {
            // Every third poll drops both frames.
            dev.push_color_gap();
            dev.push_depth_gap();
            continue;
        }
        let mut data = rgba.clone();
        // Perturb one channel so successive frames are distinguishable.
        data[0] = data[0].wrapping_add(step as u8);
        dev.push_color(NativeColorFrame {
            size: color_native,
            encoding: PixelEncoding::Rgba,
            data,
        });
        dev.push_depth(NativeDepthFrame {
            size: DEPTH_IMAGE_SIZE,
            data: vec![500 + step as u16; DEPTH_IMAGE_SIZE.pixel_count()],
        });
    }

    Ok(dev)
}

#[cfg(not(feature = "camera-nokhwa"))]
fn gradient(size: ImageSize) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(size.pixel_count() * 4);
    for r in 0..size.height {
        for c in 0..size.width {
            rgba.extend_from_slice(&[
                (c * 255 / size.width) as u8,
                (r * 255 / size.height) as u8,
                128,
                255,
            ]);
        }
    }
    rgba
}
