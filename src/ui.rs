//! Selection controls.
//!
//! In the browser the texture is picked with a `<select>` element whose option
//! values are catalog names or [`ORIGINAL_SELECTION`]. Native windows have no
//! such element, there the number keys pick a catalog entry and `0` restores
//! the original textures.

use winit::keyboard::KeyCode;

use crate::{config::ORIGINAL_SELECTION, selector::TextureCatalog};

/// Map a key press to a selection value, `None` for keys without a meaning.
pub fn selection_for_key(key: KeyCode, catalog: &TextureCatalog) -> Option<String> {
    let slot = match key {
        KeyCode::Digit0 | KeyCode::Numpad0 | KeyCode::Backquote => {
            return Some(ORIGINAL_SELECTION.to_string());
        }
        KeyCode::Digit1 | KeyCode::Numpad1 => 1,
        KeyCode::Digit2 | KeyCode::Numpad2 => 2,
        KeyCode::Digit3 | KeyCode::Numpad3 => 3,
        KeyCode::Digit4 | KeyCode::Numpad4 => 4,
        KeyCode::Digit5 | KeyCode::Numpad5 => 5,
        KeyCode::Digit6 | KeyCode::Numpad6 => 6,
        KeyCode::Digit7 | KeyCode::Numpad7 => 7,
        KeyCode::Digit8 | KeyCode::Numpad8 => 8,
        KeyCode::Digit9 | KeyCode::Numpad9 => 9,
        _ => return None,
    };
    catalog.names().nth(slot - 1).map(str::to_string)
}

/// Forward every `change` of the `<select>` element with id `element_id` as a
/// [`ViewerEvent::Select`](crate::flow::ViewerEvent::Select).
///
/// A page without the element is logged, the viewer then simply has no control.
#[cfg(target_arch = "wasm32")]
pub fn bind_select_element(
    element_id: &str,
    proxy: winit::event_loop::EventLoopProxy<crate::flow::ViewerEvent>,
) {
    use wasm_bindgen::{JsCast, closure::Closure};

    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        log::error!("no document to look up #{element_id} in");
        return;
    };
    let Some(select) = document
        .get_element_by_id(element_id)
        .and_then(|element| element.dyn_into::<web_sys::HtmlSelectElement>().ok())
    else {
        log::warn!("no <select id=\"{element_id}\"> on the page, texture selection is unavailable");
        return;
    };

    let target = select.clone();
    let on_change = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
        if proxy
            .send_event(crate::flow::ViewerEvent::Select(target.value()))
            .is_err()
        {
            log::warn!("event loop closed, dropping texture selection");
        }
    });
    if let Err(e) =
        select.add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref())
    {
        log::error!("cannot listen to #{element_id}: {e:?}");
        return;
    }
    // The listener lives as long as the page
    on_change.forget();
    log::info!("texture selection bound to #{element_id}");
}
