// Synthetic screens for unit tests: flat backgrounds with noise-textured markers
use image::{GrayImage, Luma, imageops};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::capture::{Frame, Raster};
use crate::template_matching::Template;

/// Deterministic per-pixel noise, decorrelated between seeds
pub fn noise(x: u32, y: u32, seed: u32) -> u8 {
    let mut n = x
        .wrapping_mul(374_761_393)
        .wrapping_add(y.wrapping_mul(668_265_263))
        .wrapping_add(seed.wrapping_mul(2_246_822_519));
    n = (n ^ (n >> 13)).wrapping_mul(1_274_126_177);
    ((n ^ (n >> 16)) & 0xff) as u8
}

pub fn patterned(width: u32, height: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| Luma([noise(x, y, seed)]))
}

pub fn canvas(width: u32, height: u32, fill: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([fill]))
}

pub fn paste(target: &mut GrayImage, patch: &GrayImage, x: u32, y: u32) {
    imageops::replace(target, patch, i64::from(x), i64::from(y));
}

pub fn gray_frame(image: GrayImage) -> Frame {
    Frame::new(Raster::Gray(image))
}

pub fn gray_template(name: &str, image: GrayImage) -> Template {
    Template::new(name, Raster::Gray(image))
}

/// Marker images used by the scene builder
pub struct Markers {
    pub corner: GrayImage,
    pub player: GrayImage,
    pub rune: GrayImage,
    pub rune_buff: GrayImage,
    pub elite: GrayImage,
}

impl Markers {
    pub fn new() -> Self {
        Self {
            corner: patterned(12, 12, 1),
            player: patterned(8, 8, 2),
            rune: patterned(7, 7, 3),
            rune_buff: patterned(8, 8, 4),
            elite: patterned(10, 10, 5),
        }
    }
}

pub const SCENE_WIDTH: u32 = 320;
pub const SCENE_HEIGHT: u32 = 240;

/// Corner template placement used by most scenes: the match's bottom-right is
/// (202, 142), so the minimap interior spans x 8..194 and y 21..134.
pub const CORNER_AT: (u32, u32) = (190, 130);
pub const INTERIOR: (u32, u32, u32, u32) = (8, 21, 186, 113);

/// Builds a game screen with a minimap panel in the top-left corner
pub struct SceneBuilder {
    image: GrayImage,
    markers: Markers,
}

impl SceneBuilder {
    pub fn new() -> Self {
        let mut image = canvas(SCENE_WIDTH, SCENE_HEIGHT, 40);
        draw_filled_rect_mut(&mut image, Rect::at(0, 0).of_size(202, 142), Luma([90u8]));
        Self {
            image,
            markers: Markers::new(),
        }
    }

    pub fn corner_at(mut self, x: u32, y: u32) -> Self {
        paste(&mut self.image, &self.markers.corner, x, y);
        self
    }

    pub fn with_corner(self) -> Self {
        self.corner_at(CORNER_AT.0, CORNER_AT.1)
    }

    pub fn player_at(mut self, x: u32, y: u32) -> Self {
        paste(&mut self.image, &self.markers.player, x, y);
        self
    }

    pub fn rune_at(mut self, x: u32, y: u32) -> Self {
        paste(&mut self.image, &self.markers.rune, x, y);
        self
    }

    pub fn rune_buff_at(mut self, x: u32, y: u32) -> Self {
        paste(&mut self.image, &self.markers.rune_buff, x, y);
        self
    }

    pub fn elite_at(mut self, x: u32, y: u32) -> Self {
        paste(&mut self.image, &self.markers.elite, x, y);
        self
    }

    pub fn image(self) -> GrayImage {
        self.image
    }

    pub fn raster(self) -> Raster {
        Raster::Gray(self.image)
    }

    pub fn frame(self) -> Frame {
        gray_frame(self.image)
    }
}
