//! WebAssembly bindings for the `pathtopo` editing session.
//!
//! Results of fallible calls come back as `{ ok, value }` or
//! `{ ok: false, error: { code, message, data? } }` envelopes.

use wasm_bindgen::prelude::*;
mod api;
mod error;
mod interop;

pub use api::{init_logging, set_panic_hook};

#[wasm_bindgen]
pub struct Editor { pub(crate) inner: pathtopo::EditorSession }

impl Editor {
    pub fn rs_new(inner: pathtopo::EditorSession) -> Editor { Editor { inner } }
}
