use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// Bookkeeping for one outstanding `requestAnimationFrame`.
#[derive(Debug, Default)]
struct Schedule {
    pending: Option<i32>,
    stopped: bool,
}

impl Schedule {
    fn armed(&mut self, id: i32) {
        if !self.stopped {
            self.pending = Some(id);
        }
    }

    /// A frame arrived. False if it was cancelled before delivery.
    fn deliver(&mut self) -> bool {
        self.pending.take().is_some() && !self.stopped
    }

    /// Stop for good. Returns the request still to cancel, if any.
    fn stop(&mut self) -> Option<i32> {
        self.stopped = true;
        self.pending.take()
    }

    fn is_running(&self) -> bool {
        !self.stopped && self.pending.is_some()
    }
}

/// `requestAnimationFrame` subscription. Each repaint calls the callback with
/// the frame timestamp; dropping the loop cancels the pending request.
///
/// The loop may be dropped from inside its own callback (a page handler
/// calling `game_unmount` during a frame): no further frame is requested and
/// the closure is released after the frame returns.
pub struct FrameLoop {
    callback: FrameCallback,
    schedule: Rc<RefCell<Schedule>>,
}

impl FrameLoop {
    pub fn start(mut on_frame: impl FnMut(f64) + 'static) -> Result<Self, JsValue> {
        let callback: FrameCallback = Rc::new(RefCell::new(None));
        let schedule = Rc::new(RefCell::new(Schedule::default()));

        let next = callback.clone();
        let frames = schedule.clone();
        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
            if !frames.borrow_mut().deliver() {
                return;
            }
            on_frame(ts);
            // on_frame may have stopped the loop
            if frames.borrow().stopped {
                return;
            }
            if let Some(cb) = next.borrow().as_ref() {
                match request_frame(cb) {
                    Ok(id) => frames.borrow_mut().armed(id),
                    Err(err) => log::warn!("requestAnimationFrame failed: {:?}", err),
                }
            }
        }) as Box<dyn FnMut(f64)>));

        if let Some(cb) = callback.borrow().as_ref() {
            schedule.borrow_mut().armed(request_frame(cb)?);
        }
        Ok(Self { callback, schedule })
    }

    pub fn is_running(&self) -> bool {
        self.schedule.borrow().is_running()
    }

    pub fn stop(&self) {
        let pending = self.schedule.borrow_mut().stop();
        if let Some(id) = pending {
            if let Some(window) = web_sys::window() {
                let _ = window.cancel_animation_frame(id);
            }
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.stop();
        // The closure may be on the stack right now. Break the
        // closure -> callback cell cycle once the current task is done.
        let callback = self.callback.clone();
        wasm_bindgen_futures::spawn_local(async move {
            callback.borrow_mut().take();
        });
    }
}

fn request_frame(cb: &Closure<dyn FnMut(f64)>) -> Result<i32, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    window.request_animation_frame(cb.as_ref().unchecked_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_delivered_while_armed() {
        let mut schedule = Schedule::default();
        assert!(!schedule.deliver());
        schedule.armed(1);
        assert!(schedule.is_running());
        assert!(schedule.deliver());
        assert!(!schedule.is_running());
    }

    #[test]
    fn stop_cancels_the_pending_request() {
        let mut schedule = Schedule::default();
        schedule.armed(7);
        assert_eq!(schedule.stop(), Some(7));
        assert!(!schedule.deliver());
    }

    #[test]
    fn stop_during_a_frame_prevents_rearming() {
        let mut schedule = Schedule::default();
        schedule.armed(3);
        assert!(schedule.deliver());
        // handler unmounts mid-frame: nothing pending to cancel
        assert_eq!(schedule.stop(), None);
        schedule.armed(4);
        assert!(!schedule.is_running());
        assert!(!schedule.deliver());
    }
}
