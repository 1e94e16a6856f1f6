use folio_engine::RectBuffer;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

const BACKGROUND: &str = "#000";
const OVERLAY_SHADE: &str = "rgba(0, 0, 0, 0.6)";
const OVERLAY_TEXT: &str = "#fff";
const OVERLAY_FONT: &str = "bold 20px sans-serif";

/// Canvas 2D target for a game's rect buffer.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn from_id(canvas_id: &str) -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element #{canvas_id}")))?
            .dyn_into()?;
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into()?;
        Ok(Self { canvas, ctx })
    }

    pub fn resize(&self, width: f32, height: f32) {
        self.canvas.set_width(width as u32);
        self.canvas.set_height(height as u32);
    }

    pub fn width(&self) -> f64 {
        self.canvas.width() as f64
    }

    pub fn height(&self) -> f64 {
        self.canvas.height() as f64
    }

    /// Clear, paint the rects in order, then the status overlay if any.
    pub fn draw(&self, rects: &RectBuffer, status: Option<&str>) -> Result<(), JsValue> {
        self.ctx.set_fill_style_str(BACKGROUND);
        self.ctx.fill_rect(0.0, 0.0, self.width(), self.height());

        for rect in rects.iter() {
            self.ctx.set_fill_style_str(&rect.color().to_css());
            self.ctx
                .fill_rect(rect.x as f64, rect.y as f64, rect.w as f64, rect.h as f64);
        }

        if let Some(text) = status {
            self.draw_overlay(text)?;
        }
        Ok(())
    }

    fn draw_overlay(&self, text: &str) -> Result<(), JsValue> {
        let (w, h) = (self.width(), self.height());
        self.ctx.set_fill_style_str(OVERLAY_SHADE);
        self.ctx.fill_rect(0.0, 0.0, w, h);
        self.ctx.set_fill_style_str(OVERLAY_TEXT);
        self.ctx.set_font(OVERLAY_FONT);
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        self.ctx.fill_text(text, w / 2.0, h / 2.0)
    }
}
