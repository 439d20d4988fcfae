use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::{DrawList, ScreenRect};

use super::Viewport;

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render(&mut self, draw_list: &DrawList) -> Result<(), Error> {
        let width = self.viewport.width;
        let height = self.viewport.height;
        let frame = self.pixels.frame_mut();
        rasterize(frame, width, height, draw_list);
        self.pixels.render()
    }
}

pub(crate) fn rasterize(frame: &mut [u8], width: u32, height: u32, draw_list: &DrawList) {
    for pixel in frame.chunks_exact_mut(4) {
        pixel.copy_from_slice(&draw_list.clear_color);
    }
    for command in draw_list.commands() {
        fill_rect_blended(frame, width, height, command.rect, command.color);
    }
}

fn fill_rect_blended(frame: &mut [u8], width: u32, height: u32, rect: ScreenRect, color: [u8; 4]) {
    let left = rect.x.max(0);
    let top = rect.y.max(0);
    let right = (rect.x + rect.width).min(width as i32);
    let bottom = (rect.y + rect.height).min(height as i32);
    if left >= right || top >= bottom {
        return;
    }
    let alpha = color[3] as u32;
    for y in top..bottom {
        let row = y as usize * width as usize;
        for x in left..right {
            let offset = (row + x as usize) * 4;
            let Some(pixel) = frame.get_mut(offset..offset + 4) else {
                continue;
            };
            if alpha == 255 {
                pixel.copy_from_slice(&color);
                continue;
            }
            for channel in 0..3 {
                let src = color[channel] as u32;
                let dst = pixel[channel] as u32;
                pixel[channel] = ((src * alpha + dst * (255 - alpha)) / 255) as u8;
            }
            pixel[3] = 255;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel_at(frame: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * width + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn rasterize_clears_then_fills_clipped_rects() {
        let (width, height) = (8u32, 8u32);
        let mut frame = vec![0u8; (width * height * 4) as usize];
        let mut list = DrawList::default();
        list.clear([10, 20, 30, 255]);
        list.push_rect(ScreenRect::new(-4, -4, 6, 6), [200, 0, 0, 255]);

        rasterize(&mut frame, width, height, &list);

        assert_eq!(pixel_at(&frame, width, 0, 0), [200, 0, 0, 255]);
        assert_eq!(pixel_at(&frame, width, 1, 1), [200, 0, 0, 255]);
        assert_eq!(pixel_at(&frame, width, 2, 2), [10, 20, 30, 255]);
    }

    #[test]
    fn rasterize_blends_translucent_rects() {
        let (width, height) = (2u32, 2u32);
        let mut frame = vec![0u8; (width * height * 4) as usize];
        let mut list = DrawList::default();
        list.clear([0, 0, 0, 255]);
        list.push_rect(ScreenRect::new(0, 0, 2, 2), [255, 255, 255, 51]);

        rasterize(&mut frame, width, height, &list);

        assert_eq!(pixel_at(&frame, width, 1, 1), [51, 51, 51, 255]);
    }
}
