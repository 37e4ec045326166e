use gloo_timers::callback::Timeout;
use web_sys::{ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition};
use yew::prelude::*;

/// Emit `on_expire(seq)` once the current flash has been visible for its
/// duration. A newer flash drops the pending timeout, which cancels it.
#[hook]
pub fn use_flash_expiry(current: Option<(u64, u32)>, on_expire: Callback<u64>) {
    let timer = use_mut_ref(|| None::<Timeout>);
    use_effect_with(current, move |current| {
        *timer.borrow_mut() = current.map(|(seq, duration_ms)| {
            Timeout::new(duration_ms, move || on_expire.emit(seq))
        });
        || ()
    });
}

/// Smoothly scroll the element with this id into view whenever it changes.
#[hook]
pub fn use_scroll_into_view(element_id: Option<String>) {
    use_effect_with(element_id, |element_id| {
        let element = element_id
            .as_deref()
            .and_then(|id| gloo_utils::document().get_element_by_id(id));
        if let Some(element) = element {
            let options = ScrollIntoViewOptions::new();
            options.set_behavior(ScrollBehavior::Smooth);
            options.set_block(ScrollLogicalPosition::Nearest);
            element.scroll_into_view_with_scroll_into_view_options(&options);
        }
        || ()
    });
}
