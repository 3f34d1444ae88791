//! Reporters that capture notices instead of printing them

use douk_hooks::notice::{BuiltinCatalog, Locale, Localizer, MessageKey, NoticeParams, render};
use std::sync::Mutex;

/// Records every rendered notice in order
pub struct RecordingReporter {
    catalog: BuiltinCatalog,
    messages: Mutex<Vec<(MessageKey, String)>>,
}

impl RecordingReporter {
    /// Recorder rendering with the built-in catalog for `locale`
    pub fn new(locale: Locale) -> Self {
        Self {
            catalog: BuiltinCatalog::new(locale),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Rendered messages so far
    pub fn messages(&self) -> Vec<(MessageKey, String)> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl douk_hooks::Reporter for RecordingReporter {
    fn report(&self, key: MessageKey, params: &NoticeParams<'_>) {
        let text = render(&self.catalog.template(key), params);
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((key, text));
    }
}
