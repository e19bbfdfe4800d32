//! Console output, serialization and settings parsing for the WASM API

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::converters::event_log_to_midi::ConversionSettings;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = log)]
    fn console_log(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = info)]
    fn console_info(s: &str);

    #[wasm_bindgen(js_namespace = console, js_name = error)]
    fn console_error(s: &str);
}

/// `console.log` with the module prefix
#[macro_export]
macro_rules! wasm_log {
    ($($arg:tt)*) => {
        $crate::api::helpers::log_debug(&format!($($arg)*))
    };
}

/// `console.info` with the module prefix
#[macro_export]
macro_rules! wasm_info {
    ($($arg:tt)*) => {
        $crate::api::helpers::log_info(&format!($($arg)*))
    };
}

const PREFIX: &str = "[midilog]";

pub fn log_debug(msg: &str) {
    console_log(&format!("{} {}", PREFIX, msg));
}

pub fn log_info(msg: &str) {
    console_info(&format!("{} {}", PREFIX, msg));
}

pub fn log_error(msg: &str) {
    console_error(&format!("{} {}", PREFIX, msg));
}

/// Report `msg` on the console and hand it back as a JS error value.
pub fn js_error(msg: String) -> JsValue {
    log_error(&msg);
    JsValue::from_str(&msg)
}

/// Serialize a value for JavaScript; `what` names it in the error message.
pub fn serialize<T: Serialize>(value: &T, what: &str) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| js_error(format!("{} serialization error: {}", what, e)))
}

/// Settings from an optional JSON document, defaults when absent
pub fn settings_from_json(settings_json: Option<String>) -> Result<ConversionSettings, JsValue> {
    match settings_json {
        Some(json) => ConversionSettings::from_json(&json)
            .map_err(|e| js_error(format!("Settings parse error: {}", e))),
        None => Ok(ConversionSettings::default()),
    }
}
