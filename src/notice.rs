//! User-visible notices
//!
//! The core never formats text on its own. It hands a [`MessageKey`] and named
//! parameters to a [`Reporter`]; reporters look the template up through a
//! [`Localizer`] and substitute `{name}` placeholders with [`render`].

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

/// Identifies a message template
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Batch boundary reached; parameters `batches` and `rest_time`
    BatchCoolDown,
    /// Operator prompt asked after a unit fails to fetch
    FailurePrompt,
}

impl MessageKey {
    /// Stable identifier of the template
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKey::BatchCoolDown => "batch_cool_down",
            MessageKey::FailurePrompt => "failure_prompt",
        }
    }
}

/// Named template parameters, in insertion order
pub type NoticeParams<'a> = [(&'static str, Cow<'a, str>)];

/// Language of the built-in catalog
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    /// Simplified Chinese
    #[default]
    #[serde(rename = "zh_CN")]
    ZhCn,
    /// English
    #[serde(rename = "en_US")]
    EnUs,
}

/// Source of message templates for the active locale
pub trait Localizer: Send + Sync {
    /// Template text for `key`
    fn template(&self, key: MessageKey) -> Cow<'_, str>;
}

/// Templates shipped with the crate
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinCatalog {
    locale: Locale,
}

impl BuiltinCatalog {
    /// Catalog for `locale`
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }
}

impl Localizer for BuiltinCatalog {
    fn template(&self, key: MessageKey) -> Cow<'_, str> {
        let text = match (self.locale, key) {
            (Locale::ZhCn, MessageKey::BatchCoolDown) => {
                "程序连续处理了 {batches} 个数据，为了避免请求频率过高导致账号或 IP 被风控，\
                 程序已经暂停运行，将在 {rest_time} 秒后恢复运行！"
            }
            (Locale::EnUs, MessageKey::BatchCoolDown) => {
                "Processed {batches} items in a row. To avoid the account or IP being \
                 flagged for excessive requests, the program is paused and will resume \
                 in {rest_time} seconds!"
            }
            (Locale::ZhCn, MessageKey::FailurePrompt) => {
                "输入任意字符继续处理账号/合集，直接回车停止处理账号/合集: "
            }
            (Locale::EnUs, MessageKey::FailurePrompt) => {
                "Enter any character to continue processing accounts/collections, \
                 or press Enter to stop: "
            }
        };
        Cow::Borrowed(text)
    }
}

/// Substitute `{name}` placeholders in `template`
///
/// Placeholders without a matching parameter are left untouched.
pub fn render(template: &str, params: &NoticeParams<'_>) -> String {
    let mut out = template.to_string();
    for (name, value) in params {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

/// Receives user-visible notices from the core
///
/// Implementations must tolerate concurrent calls; the core does not
/// serialize access.
pub trait Reporter: Send + Sync {
    /// Emit the notice identified by `key`
    fn report(&self, key: MessageKey, params: &NoticeParams<'_>);
}

/// Prints localized notices to stdout and mirrors them to the log
pub struct ConsoleReporter {
    localizer: Arc<dyn Localizer>,
}

impl ConsoleReporter {
    /// Reporter backed by `localizer`
    pub fn new(localizer: Arc<dyn Localizer>) -> Self {
        Self { localizer }
    }

    /// Reporter backed by the built-in catalog for `locale`
    pub fn for_locale(locale: Locale) -> Self {
        Self::new(Arc::new(BuiltinCatalog::new(locale)))
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, key: MessageKey, params: &NoticeParams<'_>) {
        let message = render(&self.localizer.template(key), params);
        tracing::info!(key = key.as_str(), "{message}");
        println!("{message}");
    }
}

/// Sends notices to the log only
pub struct TracingReporter {
    localizer: Arc<dyn Localizer>,
}

impl TracingReporter {
    /// Reporter backed by `localizer`
    pub fn new(localizer: Arc<dyn Localizer>) -> Self {
        Self { localizer }
    }
}

impl Reporter for TracingReporter {
    fn report(&self, key: MessageKey, params: &NoticeParams<'_>) {
        let message = render(&self.localizer.template(key), params);
        tracing::warn!(key = key.as_str(), "{message}");
    }
}
