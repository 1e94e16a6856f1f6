use std::cell::RefCell;

use wasm_bindgen::prelude::*;

use folio_web::{Theme, ThemeStore};

pub mod widget;

pub use widget::ChatWidget;

thread_local! {
    static THEME: RefCell<Option<ThemeStore>> = RefCell::new(None);
}

fn with_theme<R>(f: impl FnOnce(&mut ThemeStore) -> R) -> R {
    THEME.with(|cell| {
        let mut borrow = cell.borrow_mut();
        let store = borrow.get_or_insert_with(ThemeStore::load);
        f(store)
    })
}

/// Page startup: logging, then the stored theme is applied before first paint.
#[wasm_bindgen]
pub fn portfolio_init() -> String {
    folio_web::init_logging(log::Level::Info);
    let theme = with_theme(|store| store.current());
    log::info!("portfolio: initialized ({} theme)", theme);
    theme.to_string()
}

#[wasm_bindgen]
pub fn theme_current() -> String {
    with_theme(|store| store.current()).to_string()
}

/// Flip the theme. The page is restyled even if the choice cannot be saved.
#[wasm_bindgen]
pub fn theme_toggle() -> String {
    with_theme(|store| {
        if let Err(err) = store.toggle() {
            log::warn!("Theme not saved: {}", err);
        }
        store.current()
    })
    .to_string()
}

#[wasm_bindgen]
pub fn theme_set(value: &str) -> Result<String, JsValue> {
    let theme = Theme::parse(value).ok_or_else(|| JsValue::from_str(&format!("unknown theme '{value}'")))?;
    with_theme(|store| {
        if let Err(err) = store.set(theme) {
            log::warn!("Theme not saved: {}", err);
        }
    });
    Ok(theme.to_string())
}
