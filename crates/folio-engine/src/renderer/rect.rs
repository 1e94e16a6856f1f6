use glam::IVec2;

/// RGBA color, each channel 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// CSS color string for Canvas 2D `fillStyle`.
    pub fn to_css(self) -> String {
        format!(
            "rgba({}, {}, {}, {})",
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
            self.a
        )
    }
}

/// One filled rectangle for the page's Canvas 2D renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RectInstance {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl RectInstance {
    pub fn new(x: f32, y: f32, w: f32, h: f32, color: Color) -> Self {
        Self { x, y, w, h, r: color.r, g: color.g, b: color.b, a: color.a }
    }

    pub fn color(&self) -> Color {
        Color { r: self.r, g: self.g, b: self.b, a: self.a }
    }
}

/// Rectangles drawn this frame, in paint order.
pub struct RectBuffer {
    pub rects: Vec<RectInstance>,
    capacity: usize,
}

impl RectBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rects: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Push a rectangle. Rectangles past capacity are dropped.
    pub fn push(&mut self, rect: RectInstance) {
        if self.rects.len() < self.capacity {
            self.rects.push(rect);
        }
    }

    /// Fill one grid cell whose top-left corner is `pos`, leaving a 1-pixel gap
    /// on the right and bottom edges.
    pub fn fill_cell(&mut self, pos: IVec2, cell_size: i32, color: Color) {
        let side = (cell_size - 1).max(1) as f32;
        self.push(RectInstance::new(pos.x as f32, pos.y as f32, side, side, color));
    }

    pub fn rect_count(&self) -> u32 {
        self.rects.len() as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = &RectInstance> {
        self.rects.iter()
    }
}

impl Default for RectBuffer {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_cell_leaves_one_pixel_gap() {
        let mut buf = RectBuffer::with_capacity(4);
        buf.fill_cell(IVec2::new(32, 48), 16, Color::GREEN);
        let rect = buf.rects[0];
        assert_eq!((rect.x, rect.y, rect.w, rect.h), (32.0, 48.0, 15.0, 15.0));
        assert_eq!(rect.color(), Color::GREEN);
    }

    #[test]
    fn push_respects_capacity() {
        let mut buf = RectBuffer::with_capacity(2);
        for _ in 0..5 {
            buf.push(RectInstance::default());
        }
        assert_eq!(buf.rect_count(), 2);
    }

    #[test]
    fn css_color() {
        assert_eq!(Color::WHITE.to_css(), "rgba(255, 255, 255, 1)");
    }
}
