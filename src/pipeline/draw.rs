//! Anti-aliased circle rasterization on packed BGRA buffers.

use crate::types::Bgr;

pub fn fill_circle(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    center: (i32, i32),
    radius: i32,
    color: Bgr,
) {
    let r = radius.max(0) as f32;
    for_each_in_box(center, radius + 1, |x, y, distance| {
        let coverage = (r + 0.5 - distance).clamp(0.0, 1.0);
        blend_pixel_safe(buffer, width, height, x, y, color, coverage);
    });
}

pub fn stroke_circle(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    center: (i32, i32),
    radius: i32,
    thickness: i32,
    color: Bgr,
) {
    let r = radius.max(0) as f32;
    let half = thickness.max(1) as f32 / 2.0;
    let reach = radius + thickness.max(1) / 2 + 1;
    for_each_in_box(center, reach, |x, y, distance| {
        let coverage = (half + 0.5 - (distance - r).abs()).clamp(0.0, 1.0);
        blend_pixel_safe(buffer, width, height, x, y, color, coverage);
    });
}

fn for_each_in_box(center: (i32, i32), reach: i32, mut f: impl FnMut(i32, i32, f32)) {
    let (cx, cy) = center;
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let distance = ((dx * dx + dy * dy) as f32).sqrt();
            f(cx + dx, cy + dy, distance);
        }
    }
}

fn blend_pixel_safe(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    color: Bgr,
    coverage: f32,
) {
    if coverage <= 0.0 || x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= width || uy >= height {
        return;
    }
    let idx = ((uy * width + ux) as usize) * 4;
    let Some(px) = buffer.get_mut(idx..idx + 4) else {
        return;
    };

    if coverage >= 1.0 {
        px.copy_from_slice(&[color.b, color.g, color.r, 255]);
        return;
    }
    let mix = |dst: u8, src: u8| (dst as f32 + (src as f32 - dst as f32) * coverage).round() as u8;
    px[0] = mix(px[0], color.b);
    px[1] = mix(px[1], color.g);
    px[2] = mix(px[2], color.r);
    px[3] = 255;
}
